//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their size metric.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Field names are part of the snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Byte length of the compact JSON form of `data`
    pub size: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `data` - The value to store
    pub fn new(data: Value) -> Result<Self> {
        let size = serialized_size(&data)?;

        Ok(Self {
            data,
            timestamp: current_timestamp_ms(),
            size,
        })
    }
}

// == Utility Functions ==
/// Returns the byte length of the compact JSON serialization of `value`.
pub fn serialized_size(value: &Value) -> Result<usize> {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
