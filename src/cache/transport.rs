//! Transport Module
//!
//! The retrieval seam between the cache manager and the network.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, FetchError, Result};

// == Transport Trait ==
/// Issues one retrieval for a key and decodes the body as JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn retrieve(&self, key: &str) -> std::result::Result<Value, FetchError>;
}

// == HTTP Transport ==
/// Transport that treats the key as a URL and issues a GET request.
///
/// The response status is not inspected: any body that decodes as JSON is
/// returned, error pages included.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    // == Constructor ==
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn retrieve(&self, key: &str) -> std::result::Result<Value, FetchError> {
        let response = self
            .client
            .get(key)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        debug!("GET {} -> {}", key, response.status());

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
