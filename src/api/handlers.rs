//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, FetchResponse, GetResponse, HealthResponse, ImportResponse, KeyQuery,
    PreloadRequest, PreloadResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Holds the current cache manager in a swappable slot. Handlers clone the
/// `Arc` out of the slot and work on that instance; import replaces the
/// slot's contents instead of mutating a live manager.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<RwLock<Arc<CacheManager>>>,
}

impl AppState {
    /// Creates a new AppState holding the given manager.
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Arc::new(RwLock::new(Arc::new(cache))),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Initializes an HTTP-backed manager with parameters from the Config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheManager::from_config(config)?))
    }

    /// Returns the manager currently in the slot.
    pub async fn manager(&self) -> Arc<CacheManager> {
        Arc::clone(&*self.cache.read().await)
    }

    /// Puts `cache` in the slot and returns the manager it replaced.
    pub async fn replace(&self, cache: CacheManager) -> Arc<CacheManager> {
        let mut slot = self.cache.write().await;
        std::mem::replace(&mut *slot, Arc::new(cache))
    }
}

fn require_key(problem: Option<String>) -> Result<()> {
    match problem {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for GET /get?key=...
///
/// Returns the cached value without issuing any retrieval.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<GetResponse>> {
    require_key(query.validate())?;

    let data = state
        .manager()
        .await
        .get(&query.key)
        .ok_or_else(|| CacheError::NotFound(query.key.clone()))?;

    Ok(Json(GetResponse::new(query.key, data)))
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key, replacing any previous entry.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    require_key(req.validate())?;

    let size = state.manager().await.set(req.key.clone(), &req.value)?;

    Ok(Json(SetResponse::new(req.key, size)))
}

/// Handler for GET /fetch?key=...
///
/// Cache-first lookup: serves a cached value when present, otherwise joins
/// or starts a deduplicated retrieval.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<FetchResponse>> {
    require_key(query.validate())?;
    let manager = state.manager().await;

    if let Some(data) = manager.get(&query.key) {
        return Ok(Json(FetchResponse::new(query.key, data, true)));
    }

    let data = manager.fetch(&query.key).await?;

    Ok(Json(FetchResponse::new(query.key, data, false)))
}

/// Handler for POST /preload
///
/// Retrieves a key directly and stores the result.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>> {
    require_key(req.validate())?;

    state.manager().await.preload(&req.key).await?;

    Ok(Json(PreloadResponse::new(req.key)))
}

/// Handler for GET /export
///
/// Returns the snapshot text of the current cache.
pub async fn export_handler(State(state): State<AppState>) -> Result<Response> {
    let snapshot = state.manager().await.export()?;

    Ok(([(header::CONTENT_TYPE, "application/json")], snapshot).into_response())
}

/// Handler for POST /import
///
/// Builds a manager from the snapshot in the body and swaps it into the
/// slot. The new manager keeps the current transport and budget.
pub async fn import_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportResponse>> {
    let snapshot = std::str::from_utf8(&body)
        .map_err(|e| CacheError::Snapshot(format!("body is not UTF-8: {}", e)))?;

    let current = state.manager().await;
    let imported = CacheManager::import_with(snapshot, current.transport(), current.max_size())?;
    let entries = imported.len();

    state.replace(imported).await;
    info!("Cache replaced from snapshot with {} entries", entries);

    Ok(Json(ImportResponse::new(entries)))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.manager().await.clear();
    Json(ClearResponse::new())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let manager = state.manager().await;
    let stats = manager.stats();

    Json(StatsResponse::new(
        &stats,
        manager.max_size(),
        manager.in_flight_len(),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Transport;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn retrieve(&self, _key: &str) -> std::result::Result<Value, FetchError> {
            Err(FetchError::Transport("offline".to_string()))
        }
    }

    fn offline_state() -> AppState {
        AppState::new(CacheManager::new(Arc::new(Offline)))
    }

    fn key_query(key: &str) -> Query<KeyQuery> {
        Query(KeyQuery {
            key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = offline_state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: json!({"x": 1}),
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state), key_query("test_key"))
            .await
            .unwrap();
        assert_eq!(response.data, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = offline_state();

        let result = get_handler(State(state), key_query("nonexistent")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_handler_serves_cached_value() {
        let state = offline_state();
        state.manager().await.set("k", &json!(0)).unwrap();

        let response = fetch_handler(State(state), key_query("k")).await.unwrap();
        assert_eq!(response.data, json!(0));
        assert!(response.cached);
    }

    #[tokio::test]
    async fn test_fetch_handler_propagates_transport_error() {
        let state = offline_state();

        let result = fetch_handler(State(state), key_query("k")).await;
        assert!(matches!(result, Err(CacheError::Fetch(FetchError::Transport(_)))));
    }

    #[tokio::test]
    async fn test_import_handler_swaps_manager() {
        let state = offline_state();
        let before = state.manager().await;
        before.set("old", &1).unwrap();

        let body = Bytes::from(r#"[["new",{"data":2,"timestamp":5,"size":1}]]"#);
        let response = import_handler(State(state.clone()), body).await.unwrap();
        assert_eq!(response.entries, 1);

        let after = state.manager().await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.get("new"), Some(json!(2)));
        assert_eq!(after.get("old"), None);
        // The replaced instance is untouched
        assert_eq!(before.get("old"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_import_handler_rejects_bad_snapshot() {
        let state = offline_state();
        state.manager().await.set("kept", &true).unwrap();

        let result = import_handler(State(state.clone()), Bytes::from("nope")).await;

        assert!(matches!(result, Err(CacheError::Snapshot(_))));
        assert_eq!(state.manager().await.get("kept"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = offline_state();
        state.manager().await.set("k", "v").unwrap();

        clear_handler(State(state.clone())).await;

        assert!(state.manager().await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = offline_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.max_size_bytes, crate::cache::DEFAULT_MAX_SIZE);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = offline_state();

        let req = SetRequest {
            key: "".to_string(), // Empty key is invalid
            value: json!("value"),
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
