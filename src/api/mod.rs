//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET /get?key=` - Read a cached value
//! - `PUT /set` - Store a JSON value
//! - `GET /fetch?key=` - Cache-first lookup with deduplicated retrieval
//! - `POST /preload` - Retrieve and store a key
//! - `GET /export` / `POST /import` - Snapshot save and restore
//! - `DELETE /clear` - Empty the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
