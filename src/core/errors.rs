//! Custom error types for gateway operations

use thiserror::Error;

use crate::core::models::RateDecision;

/// Message returned to clients when translation fails for any upstream reason
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to translate the text.";

/// Request-scoped errors surfaced by the translation pipeline
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Missing or empty input
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// Client exhausted its quota for the current window
    #[error("Rate limit exceeded. Retry after {} seconds", .decision.reset_after_secs())]
    RateLimited {
        decision: RateDecision,
    },

    /// Upstream failure; the cause has already been logged
    #[error("{}", GENERIC_FAILURE_MESSAGE)]
    TranslationFailure,
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation {
            message: message.into(),
        }
    }
}

/// Errors raised by a text generation provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No API credential configured
    #[error("Provider credential is missing")]
    MissingCredential,

    /// Network error
    #[error("Network error: {message}")]
    Network {
        message: String,
    },

    /// API returned a non-success status
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponse {
        message: String,
    },

    /// Request timeout
    #[error("Provider request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            ProviderError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Errors raised by a cache backend
///
/// A miss is `Ok(None)`, never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not be reached or rejected the command
    #[error("Cache store unavailable: {message}")]
    Unavailable {
        message: String,
    },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable {
            message: err.to_string(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type for cache store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
