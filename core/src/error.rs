//! Error types for the fetch controller.
//!
//! # Design
//! `Cancelled` is kept apart from `Transport` because the controller swallows
//! it: an aborted call is a terminal condition, not a failure. Transport
//! failures are stored in `RequestState::error` and never returned from a
//! method call. The remaining variants are programmer errors (bad
//! configuration, malformed arguments) and are returned directly.
//!
//! Variants carry `String` messages so the error is `Clone` and can live in
//! the observable state.

use thiserror::Error;

/// Errors produced while building or executing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The in-flight call was aborted through its cancellation handle.
    #[error("request aborted")]
    Cancelled,

    /// Network or protocol failure during the transport call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for the server.
    #[error("request timeout")]
    Timeout,

    /// No base URL was supplied by the call site or the context.
    #[error("a base url is required unless the context provides one")]
    MissingUrl,

    /// The configured base URL does not parse.
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The method was called with an argument shape it cannot disambiguate.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A request body could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Auto-fire was configured but no tokio runtime is running.
    #[error("auto-fire on mount requires a running tokio runtime")]
    NoRuntime,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_builder() {
            FetchError::InvalidArguments(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Serialization(err.to_string())
    }
}
