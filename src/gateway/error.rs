//! Errors produced by backend gateway operations

use thiserror::Error;

/// A failed gateway operation, classified well enough for the caller
/// to decide whether retrying makes sense
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unknown, message)
    }
}

/// Why a gateway operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// The backend was unreachable or the request timed out
    Network,
    /// The backend asked the widget to slow down (429)
    RateLimit,
    /// The backend failed internally (5xx)
    ServerError,
    /// The backend rejected the widget's credentials (401, 403)
    Auth,
    /// The request itself was malformed (400)
    InvalidRequest,
    /// The referenced resource does not exist (404)
    NotFound,
    /// Anything that could not be classified
    Unknown,
}

impl GatewayErrorKind {
    /// Transient failures worth presenting to the visitor as retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::ServerError
        )
    }
}
