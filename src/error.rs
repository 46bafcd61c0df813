//! Error types for fitdash

use thiserror::Error;

/// Errors raised while turning raw bytes into decoded records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Input is {size} bytes, limit is {limit}")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Malformed FIT stream: {0}")]
    Malformed(String),
}

/// Errors for decoder output that cannot yield a table at all
///
/// Missing sensor fields and unparseable per-row timestamps are not errors;
/// those rows or fields are filtered out instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Decoder produced no data messages")]
    NoMessages,

    #[error("Recording has {found} samples, limit is {limit}")]
    RowLimit { found: usize, limit: usize },
}

/// Errors while writing or reading the delimited-text export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rows out of timestamp order at line {0}")]
    Unordered(usize),

    #[error("Mixed activity types: {0:?} and {1:?}")]
    MixedActivityType(String, String),

    #[error("Inconsistent row at line {line}: {reason}")]
    Inconsistent { line: usize, reason: String },
}

/// Errors while loading processor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Umbrella error for callers that drive the whole pipeline
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
