use serde::{Deserialize, Serialize};

use crate::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_SERVER_URL, REQUEST_TIMEOUT_SECS};
use crate::utils::env_utils::{read_env, read_env_u64};

/// Connection settings for a MiloMCP backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the backend, without a trailing slash.
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_url: normalize_url(&read_env("MILOMCP_SERVER_URL", DEFAULT_SERVER_URL)),
            request_timeout_secs: read_env_u64("MILOMCP_REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: read_env_u64("MILOMCP_CONNECT_TIMEOUT_SECS", CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ConsoleConfig {
    /// Config pointing at the given server with default timeouts.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: normalize_url(&server_url.into()),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
        }
    }
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
