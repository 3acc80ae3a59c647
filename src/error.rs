//! Error types for the batch client.
//!
//! Request-level failures never abort a run: they are captured as strings on
//! the [`ResultRecord`](crate::response::ResultRecord). `HttpError` only covers
//! misuse of the client facade itself.

use thiserror::Error;

/// Errors surfaced by the [`Client`](crate::Client) facade.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A run is already executing, or a previous run future was dropped
    /// before it finished.
    #[error("a run is already in progress on this client")]
    RunInProgress,

    #[error("Failed to serialize statistics: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single transfer, recorded on its result and never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("redirect error: {0}")]
    Redirect(String),

    /// The transport could not be constructed from the request configuration.
    #[error("invalid transport configuration: {0}")]
    Build(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("transfer aborted: {0}")]
    Aborted(String),
}

#[cfg(feature = "reqwest-transport")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_redirect() {
            TransportError::Redirect(message)
        } else if err.is_builder() {
            TransportError::Build(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// Joins an error and its sources, e.g. `builder error: invalid port number`.
#[cfg(feature = "reqwest-transport")]
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
