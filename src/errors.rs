#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

/// Failure kinds a lookup can end in. Exactly one kind per failed lookup.
///
/// "Domain not found" is deliberately absent: it is a valid negative result,
/// reported as `Ok(None)` by the lookup invoker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unsupported TLD: {0}")]
    UnsupportedTld(String),

    #[error("Whois executable not found: {0}")]
    ResolverBinaryMissing(String),

    #[error("Whois resolver unavailable")]
    ResolverPackageMissing,

    #[error("Whois command failed: {0}")]
    CommandExecutionFailed(String),

    #[error("Unknown date format: {0}")]
    UnknownDateFormat(String),

    #[error("Whois lookup timed out")]
    Timeout,
}

impl LookupError {
    /// Short stable label, used for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::UnsupportedTld(_) => "unsupported_tld",
            LookupError::ResolverBinaryMissing(_) => "resolver_binary_missing",
            LookupError::ResolverPackageMissing => "resolver_package_missing",
            LookupError::CommandExecutionFailed(_) => "command_failed",
            LookupError::UnknownDateFormat(_) => "unknown_date_format",
            LookupError::Timeout => "timeout",
        }
    }
}

impl From<tokio::time::error::Elapsed> for LookupError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LookupError::Timeout
    }
}

/// Errors of the service surface. Lookup failures never end up here; they
/// are recorded as flags on the analysis record.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

#[cfg(feature = "server")]
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServiceError::InvalidDomain(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            LookupError::UnsupportedTld("zz".to_string()),
            LookupError::ResolverBinaryMissing("whois".to_string()),
            LookupError::ResolverPackageMissing,
            LookupError::CommandExecutionFailed("exit 2".to_string()),
            LookupError::UnknownDateFormat("soon".to_string()),
            LookupError::Timeout,
        ];

        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[tokio::test]
    async fn test_elapsed_maps_to_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();

        assert_eq!(LookupError::from(elapsed), LookupError::Timeout);
    }
}
