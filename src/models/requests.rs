//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Query string carrying a cache key (`?key=...`)
///
/// Keys are usually URLs, so they travel in the query rather than the path.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    /// The cache key
    pub key: String,
}

impl KeyQuery {
    /// Returns an error message if the key is empty, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store, any JSON
    pub value: Value,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for the preload operation (POST /preload)
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    /// The key (URL) to retrieve and store
    pub key: String,
}

impl PreloadRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    None
}
