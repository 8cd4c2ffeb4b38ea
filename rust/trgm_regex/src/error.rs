//! Error types for trigram filter construction.
//!
//! A regex that is too loose to be filtered is not an error: the builders
//! return `Ok(None)` (or `TrigramQuery::All`) for that case. Everything here
//! is fatal to the build that raised it.

use thiserror::Error;

/// Errors raised while building a filter or searching the index.
#[derive(Error, Debug)]
pub enum TrgmError {
    /// The pattern could not be parsed.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// The pattern compiled to more NFA states than allowed.
    #[error("pattern too large: {states} NFA states (max: {limit})")]
    PatternTooLarge { states: usize, limit: usize },

    /// Configuration could not be parsed or failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The index ran out of document ids.
    #[error("index full: {0} documents")]
    IndexFull(u32),

    /// A construction invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, TrgmError>;

impl From<regex_syntax::Error> for TrgmError {
    fn from(e: regex_syntax::Error) -> Self {
        TrgmError::InvalidPattern(e.to_string())
    }
}

impl From<regex::Error> for TrgmError {
    fn from(e: regex::Error) -> Self {
        TrgmError::InvalidPattern(e.to_string())
    }
}

impl From<serde_json::Error> for TrgmError {
    fn from(e: serde_json::Error) -> Self {
        TrgmError::InvalidConfig(e.to_string())
    }
}
