use thiserror::Error;

/// Validation and contract errors exposed by `leapgrid-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("OCC code must be 1-6 alpha root + YYMMDD + C/P + 8-digit strike: '{value}'")]
    OccPatternMismatch { value: String },
    #[error("OCC code encodes an invalid calendar date: '{value}'")]
    OccInvalidDate { value: String },

    #[error("invalid interval '{value}', expected one of 1min, 5min, 15min")]
    InvalidInterval { value: String },

    #[error("invalid session clock time '{value}', expected HH:MM")]
    InvalidClockTime { value: String },

    #[error("invalid timestamp '{value}', expected YYYY-MM-DD HH:MM")]
    InvalidTimestamp { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("position '{label}' must have a positive contract count")]
    NonPositiveContracts { label: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Artifact(#[from] crate::artifacts::ArtifactError),
}
