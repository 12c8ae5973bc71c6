//! Bridge error types.
//!
//! Only a handful of conditions abort a command. Ambiguous locates, failed
//! introspection and missing invocable members all resolve to ordinary
//! values and never show up here.

use serde_json::Value;
use thiserror::Error;

/// Errors that abort a bridge command.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The handle is not present in the registry.
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),

    /// An `occurrence` selector pointed past the end of the match list.
    #[error("Occurrence {occurrence} is out of range ({matches} matches)")]
    IndexOutOfRange { occurrence: usize, matches: usize },

    /// An `occurrence` selector that is not a positive integer.
    #[error("Invalid occurrence: {0}")]
    InvalidOccurrence(Value),

    /// Structural serialization failed (cyclic structure).
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A host function raised while being invoked.
    #[error("Invocation of '{name}' failed: {message}")]
    Invocation { name: String, message: String },

    /// The command message is malformed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON decoding or encoding of a command message failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bridge configuration is invalid or unreadable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Short, stable code used in log records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownHandle(_) => "unknown_handle",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::InvalidOccurrence(_) => "invalid_occurrence",
            Self::Serialization(_) => "serialization",
            Self::Invocation { .. } => "invocation",
            Self::Protocol(_) => "protocol",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
        }
    }

    /// Whether the error originates from the caller's request rather than
    /// from the page state.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownHandle(_)
                | Self::InvalidOccurrence(_)
                | Self::IndexOutOfRange { .. }
                | Self::Protocol(_)
                | Self::Json(_)
        )
    }
}

/// Error raised by a host function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvocationError(pub String);

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Convenience alias used throughout the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;
