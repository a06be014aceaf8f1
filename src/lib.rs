//! Fetch Cache - An in-process cache in front of network reads
//!
//! Stores retrieval results keyed by request identity, coalesces concurrent
//! retrievals of the same key, and snapshots its contents for restore.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{CacheEntry, CacheManager, CacheStats, HttpTransport, Transport};
pub use config::Config;
pub use error::{CacheError, FetchError};
