use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum AppError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable lowercase tag for the error family. The CLI uses this to pick
    /// between "retry" style hints (network) and "re-login" hints (auth).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "network",
            Self::AuthError(_) => "auth",
            Self::AccessDenied(_) => "forbidden",
            Self::ServerError(_) => "server",
            Self::ValidationError(_) | Self::InvalidResponse(_) | Self::InvalidArgument(_) => {
                "validation"
            }
            Self::ConfigError(_) => "config",
            Self::StorageError(_) => "storage",
            Self::SerializationError(_) => "serialization",
            Self::InternalError(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_match_error_taxonomy() {
        assert_eq!(AppError::NetworkError("x".to_string()).kind(), "network");
        assert_eq!(AppError::AuthError("x".to_string()).kind(), "auth");
        assert_eq!(AppError::AccessDenied("x".to_string()).kind(), "forbidden");
        assert_eq!(AppError::ServerError("x".to_string()).kind(), "server");
        assert_eq!(
            AppError::ValidationError("x".to_string()).kind(),
            "validation"
        );
        assert_eq!(
            AppError::InvalidResponse("x".to_string()).kind(),
            "validation"
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AppError::AuthError("Invalid token or insufficient permissions".to_string());
        assert_eq!(
            err.to_string(),
            "Authentication error: Invalid token or insufficient permissions"
        );
    }
}
