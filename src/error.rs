//! Error taxonomy for the provider boundary
//!
//! The poll actor is the outermost failure boundary: every variant here is
//! recoverable during steady-state polling. Only an `Auth` rejection during
//! initial setup aborts the subsystem.

use crate::RiderId;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to the telemetry provider or while
/// deriving state from a fetched snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Credentials invalid or session expired.
    ///
    /// Fatal at setup; during polling the scheduler drops the session and
    /// reconnects on the next cycle.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Rider or resource transiently missing upstream. The previous state
    /// for that rider is retained.
    #[error("not found upstream: {0}")]
    NotFound(String),

    /// A snapshot arrived without the mandatory profile record.
    #[error("snapshot for rider {0} is missing the profile record")]
    MissingProfile(RiderId),

    /// Any other provider-side failure (timeout, malformed payload,
    /// unexpected status). Retried on the next cycle.
    #[error("transient provider failure: {0}")]
    Transient(String),
}

impl ProviderError {
    /// Whether this error invalidates the current session.
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => {
                ProviderError::Auth(err.to_string())
            }
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                ProviderError::NotFound(err.to_string())
            }
            _ => ProviderError::Transient(err.to_string()),
        }
    }
}
