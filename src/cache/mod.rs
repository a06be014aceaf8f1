//! Cache Module
//!
//! Provides an in-process cache of retrieval results with in-flight request
//! coalescing and snapshot export/import.

mod entry;
mod manager;
mod snapshot;
mod stats;
mod transport;


// Re-export public types
pub use entry::CacheEntry;
pub use manager::CacheManager;
pub use stats::CacheStats;
pub use transport::{HttpTransport, Transport};

// == Public Constants ==
/// Default size budget in bytes (50 MiB)
pub const DEFAULT_MAX_SIZE: usize = 50 * 1024 * 1024;
