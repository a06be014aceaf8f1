//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /get)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub data: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Serialized size of the stored value in bytes
    pub size: usize,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, size: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            size,
        }
    }
}

/// Response body for the cache-first lookup (GET /fetch)
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub key: String,
    pub data: Value,
    /// True when served from the cache without a retrieval
    pub cached: bool,
}

impl FetchResponse {
    pub fn new(key: impl Into<String>, data: Value, cached: bool) -> Self {
        Self {
            key: key.into(),
            data,
            cached,
        }
    }
}

/// Response body for the preload operation (POST /preload)
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub message: String,
    pub key: String,
}

impl PreloadResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' preloaded successfully", key),
            key,
        }
    }
}

/// Response body for the import operation (POST /import)
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub message: String,
    /// Number of entries in the new cache
    pub entries: usize,
}

impl ImportResponse {
    pub fn new(entries: usize) -> Self {
        Self {
            message: format!("Imported {} entries", entries),
            entries,
        }
    }
}

/// Response body for the clear operation (DELETE /clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub coalesced: u64,
    pub fetch_failures: u64,
    pub suppressed_writes: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Sum of recorded entry sizes in bytes
    pub total_bytes: usize,
    /// Configured size budget in bytes
    pub max_size_bytes: usize,
    /// Retrievals currently in flight
    pub in_flight: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, max_size_bytes: usize, in_flight: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            fetches: stats.fetches,
            coalesced: stats.coalesced,
            fetch_failures: stats.fetch_failures,
            suppressed_writes: stats.suppressed_writes,
            total_entries: stats.total_entries,
            total_bytes: stats.total_bytes,
            max_size_bytes,
            in_flight,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
