//! Errors raised while declaring or resolving options.

use thiserror::Error;

/// Option registration and lookup errors.
///
/// The first three variants are programming errors raised while declaring
/// options and should abort startup. The remaining ones come from resolving or
/// writing values.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("option '{0}' is declared more than once")]
    DuplicateOption(String),

    #[error("default for option '{option}' is outside its bounds: {reason}")]
    DefaultOutOfBounds { option: String, reason: String },

    #[error("option '{option}' has invalid bounds: {reason}")]
    InvalidBounds { option: String, reason: String },

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("type mismatch for option '{option}': expected {expected}, got {got}")]
    TypeMismatch {
        option: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid value for option '{option}': {reason}")]
    InvalidValue { option: String, reason: String },

    #[error("option '{0}' is set more than once in the same source")]
    RepeatedOption(String),

    #[error("failed to parse value for option '{option}': {reason}")]
    Parse { option: String, reason: String },

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OptionsError>;
