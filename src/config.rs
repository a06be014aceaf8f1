//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache size budget in megabytes
    pub max_size_mb: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Timeout in seconds for outgoing retrievals
    pub request_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE_MB` - Cache size budget in megabytes (default: 50)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REQUEST_TIMEOUT_SECS` - Retrieval timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_size_mb: parse_var("MAX_SIZE_MB").unwrap_or(defaults.max_size_mb),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            request_timeout: parse_var("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
        }
    }

    /// Returns the size budget in bytes, saturating at `usize::MAX`.
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size_mb: 50,
            server_port: 3000,
            request_timeout: 30,
        }
    }
}
