//! Snapshot Module
//!
//! Text form of the cache contents: a JSON array of `[key, entry]` pairs.

use std::collections::HashMap;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Encode ==
/// Serializes every entry as `[key, {data, timestamp, size}]`, sorted by key.
pub fn encode(entries: &HashMap<String, CacheEntry>) -> Result<String> {
    let mut pairs: Vec<(&String, &CacheEntry)> = entries.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    serde_json::to_string(&pairs).map_err(|e| CacheError::Snapshot(e.to_string()))
}

// == Decode ==
/// Parses snapshot text back into entries.
///
/// Either every pair parses or nothing is returned. A key repeated in the
/// snapshot keeps its last entry.
pub fn decode(snapshot: &str) -> Result<HashMap<String, CacheEntry>> {
    let pairs: Vec<(String, CacheEntry)> =
        serde_json::from_str(snapshot).map_err(|e| CacheError::Snapshot(e.to_string()))?;

    Ok(pairs.into_iter().collect())
}
