//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, export_handler, fetch_handler, get_handler, health_handler, import_handler,
    preload_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /get?key=` - Read a cached value
/// - `PUT /set` - Store a JSON value
/// - `GET /fetch?key=` - Cache-first lookup with deduplicated retrieval
/// - `POST /preload` - Retrieve and store a key
/// - `GET /export` - Snapshot of the cache
/// - `POST /import` - Replace the cache from a snapshot
/// - `DELETE /clear` - Empty the cache
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get", get(get_handler))
        .route("/set", put(set_handler))
        .route("/fetch", get(fetch_handler))
        .route("/preload", post(preload_handler))
        .route("/export", get(export_handler))
        .route("/import", post(import_handler))
        .route("/clear", delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
