//! Error taxonomy for run control.
//!
//! Validation errors never reach the network; engine and transport errors are terminal
//! to the operation that raised them and are surfaced through the event log.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Target URL is missing, malformed, or not an absolute http(s) URL.
    #[error("Invalid URL format ({reason}). Please include http:// or https://")]
    InvalidUrl { input: String, reason: String },

    /// A numeric run parameter is missing, non-numeric, or out of range.
    #[error("Invalid {field}: `{value}` (expected {expected})")]
    InvalidParameter {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The engine answered but refused the operation.
    #[error("engine rejected request: {0}")]
    EngineRejected(String),

    /// Network error, timeout, non-2xx status, or an unreadable response body.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Polling gave up after too many consecutive transport failures.
    #[error("lost connection to engine after {failures} consecutive failures")]
    ConnectivityLost { failures: u32 },

    /// The requested operation needs a different run state.
    #[error("{0}")]
    InvalidState(&'static str),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ControllerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TransportFailure(format!("request timed out: {e}"))
        } else {
            Self::TransportFailure(e.to_string())
        }
    }
}

impl ControllerError {
    pub fn invalid_parameter(
        field: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            field,
            value: value.into(),
            expected,
        }
    }

    /// Local validation failures, raised before any request is issued.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. } | Self::InvalidParameter { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}
