//! Cache Manager Module
//!
//! Keyed result cache in front of a transport, with in-flight request
//! coalescing and snapshot export/import.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{snapshot, CacheEntry, CacheStats, HttpTransport, Transport, DEFAULT_MAX_SIZE};
use crate::config::Config;
use crate::error::{CacheError, FetchError, Result};

type Outcome = std::result::Result<Value, FetchError>;
type PendingRetrieval = Shared<BoxFuture<'static, Outcome>>;

// == In-Flight Retrieval ==
struct InFlight {
    /// Distinguishes this retrieval from a later one for the same key
    id: u64,
    pending: PendingRetrieval,
}

// == Cache State ==
/// Everything guarded by the manager's lock.
#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    /// Bumped by every clear; retrievals compare it at settlement
    epoch: u64,
    next_flight_id: u64,
    total_size: usize,
    stats: CacheStats,
}

impl CacheState {
    fn insert(&mut self, key: String, entry: CacheEntry) {
        let size = entry.size;
        if let Some(previous) = self.entries.insert(key, entry) {
            self.total_size = self.total_size.saturating_sub(previous.size);
        }
        self.total_size = self.total_size.saturating_add(size);
        self.refresh_totals();
    }

    fn unregister(&mut self, key: &str, flight_id: u64) {
        if self.in_flight.get(key).is_some_and(|flight| flight.id == flight_id) {
            self.in_flight.remove(key);
        }
    }

    /// Applies the outcome of a finished retrieval.
    fn settle(&mut self, key: &str, flight_id: u64, epoch: u64, outcome: &Outcome) {
        self.unregister(key, flight_id);

        match outcome {
            Ok(_) if self.epoch != epoch => {
                self.stats.record_suppressed_write();
                warn!("Cache cleared during retrieval of {}, result not stored", key);
            }
            Ok(data) => match CacheEntry::new(data.clone()) {
                Ok(entry) => {
                    debug!("Stored {} ({} bytes)", key, entry.size);
                    self.insert(key.to_string(), entry);
                }
                Err(e) => warn!("Retrieved value for {} not stored: {}", key, e),
            },
            Err(e) => {
                self.stats.record_fetch_failure();
                debug!("Retrieval of {} failed: {}", key, e);
            }
        }
    }

    fn refresh_totals(&mut self) {
        let entries = self.entries.len();
        let bytes = self.total_size;
        self.stats.set_totals(entries, bytes);
    }
}

// == Cache Manager ==
/// In-process cache of retrieval results keyed by request identity.
///
/// `fetch` coalesces concurrent retrievals of one key into a single
/// transport call. It does not read the cache; callers wanting cache-first
/// behavior call [`CacheManager::get`] first.
pub struct CacheManager {
    state: Arc<Mutex<CacheState>>,
    transport: Arc<dyn Transport>,
    /// Size budget in bytes. Reported, not enforced.
    max_size: usize,
}

impl CacheManager {
    // == Constructors ==
    /// Creates an empty manager with the default 50 MiB budget.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_max_size(transport, DEFAULT_MAX_SIZE)
    }

    /// Creates an empty manager with an explicit budget in bytes.
    pub fn with_max_size(transport: Arc<dyn Transport>, max_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            transport,
            max_size,
        }
    }

    /// Creates an empty manager backed by an HTTP transport built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout))?;
        Ok(Self::with_max_size(Arc::new(transport), config.max_size_bytes()))
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let data = state.entries.get(key).map(|entry| entry.data.clone());

        if data.is_some() {
            state.stats.record_hit();
            debug!("Cache hit: {}", key);
        } else {
            state.stats.record_miss();
            debug!("Cache miss: {}", key);
        }

        data
    }

    /// Returns the value stored under `key` decoded as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|data| {
                serde_json::from_value(data).map_err(|e| CacheError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Returns a copy of the entry stored under `key`, metadata included.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.state.lock().entries.get(key).cloned()
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry, and returns
    /// the recorded size in bytes.
    ///
    /// Fails with [`CacheError::Serialization`] if the value has no JSON
    /// form; nothing is stored in that case.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<usize> {
        let data =
            serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store(key.into(), data)
    }

    fn store(&self, key: String, data: Value) -> Result<usize> {
        let entry = CacheEntry::new(data)?;
        let size = entry.size;
        debug!("Stored {} ({} bytes)", key, size);
        self.state.lock().insert(key, entry);
        Ok(size)
    }

    // == Fetch ==
    /// Retrieves `key` through the transport, sharing one call among all
    /// concurrent callers for the same key.
    ///
    /// Every waiter receives the same value or the same error. The value is
    /// written to the cache unless [`CacheManager::clear`] ran after the
    /// retrieval started. Dropping the returned future does not cancel the
    /// retrieval.
    pub async fn fetch(&self, key: &str) -> std::result::Result<Value, FetchError> {
        let pending = self.register(key);
        pending.await
    }

    fn register(&self, key: &str) -> PendingRetrieval {
        let mut state = self.state.lock();

        if let Some(flight) = state.in_flight.get(key) {
            let pending = flight.pending.clone();
            state.stats.record_coalesced();
            debug!("Joining in-flight retrieval for {}", key);
            return pending;
        }

        state.next_flight_id += 1;
        let flight_id = state.next_flight_id;
        let epoch = state.epoch;
        state.stats.record_fetch();

        // Spawned under the lock so settlement always sees the registration
        let pending = self.spawn_retrieval(key.to_string(), flight_id, epoch);
        state.in_flight.insert(
            key.to_string(),
            InFlight {
                id: flight_id,
                pending: pending.clone(),
            },
        );
        debug!("Started retrieval {} for {}", flight_id, key);

        pending
    }

    fn spawn_retrieval(&self, key: String, flight_id: u64, epoch: u64) -> PendingRetrieval {
        let state = Arc::clone(&self.state);
        let transport = Arc::clone(&self.transport);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            // A panicking transport still settles, even with no waiter left
            let outcome = AssertUnwindSafe(transport.retrieve(&task_key))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    error!("Transport panicked retrieving {}", task_key);
                    Err(FetchError::Aborted(panic_message(&*panic)))
                });
            state.lock().settle(&task_key, flight_id, epoch, &outcome);
            outcome
        });

        let state = Arc::clone(&self.state);
        handle
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Retrieval task for {} ended abnormally: {}", key, e);
                    let mut state = state.lock();
                    state.unregister(&key, flight_id);
                    state.stats.record_fetch_failure();
                    Err(FetchError::Aborted(e.to_string()))
                }
            })
            .boxed()
            .shared()
    }

    // == Preload ==
    /// Retrieves `key` directly, bypassing coalescing, and stores the result.
    pub async fn preload(&self, key: &str) -> Result<Value> {
        self.state.lock().stats.record_fetch();

        match self.transport.retrieve(key).await {
            Ok(data) => {
                let size = self.store(key.to_string(), data.clone())?;
                info!("Preloaded {} ({} bytes)", key, size);
                Ok(data)
            }
            Err(e) => {
                self.state.lock().stats.record_fetch_failure();
                error!("Error preloading cache for {}: {}", key, e);
                Err(e.into())
            }
        }
    }

    // == Export ==
    /// Serializes every cached entry. In-flight retrievals are not included.
    pub fn export(&self) -> Result<String> {
        let state = self.state.lock();
        snapshot::encode(&state.entries)
    }

    // == Import ==
    /// Builds a new manager holding the entries of `snapshot`, using the
    /// default HTTP transport and budget.
    pub fn import(snapshot: &str) -> Result<Self> {
        Self::import_with(snapshot, Arc::new(HttpTransport::default()), DEFAULT_MAX_SIZE)
    }

    /// Builds a new manager holding the entries of `snapshot`.
    ///
    /// Fails with [`CacheError::Snapshot`] without building anything if the
    /// text does not parse.
    pub fn import_with(
        snapshot: &str,
        transport: Arc<dyn Transport>,
        max_size: usize,
    ) -> Result<Self> {
        let entries = snapshot::decode(snapshot)?;
        entries
            .values()
            .try_fold(0usize, |total, entry| total.checked_add(entry.size))
            .ok_or_else(|| CacheError::Snapshot("entry sizes overflow".to_string()))?;

        let manager = Self::with_max_size(transport, max_size);

        {
            let mut state = manager.state.lock();
            for (key, entry) in entries {
                state.insert(key, entry);
            }
        }

        info!("Imported {} cache entries", manager.len());
        Ok(manager)
    }

    // == Clear ==
    /// Empties the cache and the in-flight registry.
    ///
    /// Outstanding retrievals keep running and still resolve for their
    /// waiters, but their results are not written back.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;

        let dropped = state.entries.len();
        let detached = state.in_flight.len();
        state.entries.clear();
        state.in_flight.clear();
        state.total_size = 0;
        state.refresh_totals();

        info!(
            "Cache cleared: {} entries dropped, {} retrievals detached",
            dropped, detached
        );
    }

    // == Introspection ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Returns the number of registered in-flight retrievals.
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the transport, for building a replacement manager.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Returns the sum of recorded entry sizes in bytes.
    pub fn total_size(&self) -> usize {
        self.state.lock().total_size
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "transport panicked".to_string()
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CacheManager")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("total_size", &state.total_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}
