//! Driver-side error types.

use thiserror::Error;

/// Maximum length of the diagnostic kept from an error outcome. Ambiguity
/// reports carry the whole match list and can be arbitrarily long.
pub const MAX_DIAGNOSTIC_LEN: usize = 2000;

/// Errors raised while preparing requests or decoding responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The bridge answered with an error outcome (e.g. an ambiguous locate).
    #[error("{error_string}: {diagnostic}")]
    Outcome {
        error_string: String,
        diagnostic: String,
    },

    /// A get/call answered `null`: no such property or method.
    #[error("No {kind} '{name}' in {owner}")]
    AttributeNotFound {
        kind: &'static str,
        name: String,
        owner: String,
    },

    /// A pattern constraint on a key that does not accept patterns, or a
    /// pattern that does not compile.
    #[error("Invalid locator pattern: {0}")]
    InvalidPattern(String),

    /// The response does not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl DriverError {
    /// Error outcome with its diagnostic cut to [`MAX_DIAGNOSTIC_LEN`]
    /// characters.
    pub fn outcome(error_string: impl Into<String>, diagnostic: &str) -> Self {
        Self::Outcome {
            error_string: error_string.into(),
            diagnostic: diagnostic.chars().take(MAX_DIAGNOSTIC_LEN).collect(),
        }
    }
}
