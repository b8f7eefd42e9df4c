use log::debug;
use serde_json::Value;

use crate::error::AppError;

/// Map a non-2xx backend response to an AppError.
///
/// The taxonomy is uniform across the REST and JSON-RPC dialects:
/// 401 is an authentication failure, 403 a permission failure, 5xx a
/// server failure, anything else a validation failure. The message keeps
/// the caller-supplied context plus the best detail the response offers,
/// so failures stay diagnosable without a network inspector.
pub fn map_rest_error(status_code: u16, response_text: &str, context: &str) -> AppError {
    debug!(
        "Mapping backend error: status={}, context={}",
        status_code, context
    );

    let detail = best_error_detail(status_code, response_text);
    let message = format!("{}: {}", context, detail);

    match status_code {
        401 => AppError::AuthError(message),
        403 => AppError::AccessDenied(message),
        500..=599 => AppError::ServerError(message),
        _ => AppError::ValidationError(message),
    }
}

/// Map a transport-level failure (no response at all) to a network error.
pub fn map_transport_error(err: &reqwest::Error, context: &str) -> AppError {
    if err.is_timeout() {
        AppError::NetworkError(format!("{}: request timed out", context))
    } else {
        AppError::NetworkError(format!("{}: no response from server ({})", context, err))
    }
}

/// Pull the most specific error message out of a response body.
///
/// Preference order mirrors the backend's error shapes: a JSON-RPC style
/// `error.message`, a bare string `error`, a top-level `message`, then the
/// HTTP status text.
fn best_error_detail(status_code: u16, response_text: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(response_text) {
        let message = json["error"]["message"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .or_else(|| json["message"].as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    reqwest::StatusCode::from_u16(status_code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|reason| format!("HTTP {} {}", status_code, reason))
        .unwrap_or_else(|| format!("HTTP {}", status_code))
}
