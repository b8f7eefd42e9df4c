use reqwest::Client;
use std::time::Duration;

use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};

/// Build the shared HTTP client used for every REST and JSON-RPC call.
///
/// The request timeout is the only cancellation mechanism the console has;
/// a call that outlives it surfaces as a network error.
pub fn create_http_client(config: &ConsoleConfig) -> AppResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}
