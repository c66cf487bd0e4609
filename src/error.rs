//! Error types for the windowing pipeline, ingestion and persistence.
//!
//! Pipeline failures, read failures and store failures are kept in separate
//! enums so callers can tell a bad source file apart from a dataset that is
//! simply too short to window.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a pipeline stage (pivot, windowing, split, evaluation).
///
/// Windows skipped because they touch an unfillable hole are NOT errors and
/// never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// An observation is missing a required field or carries an unusable value.
    /// `row` is the 1-based position in the input sequence.
    #[error("Malformed row {row}: field `{field}` {reason}")]
    MalformedRow {
        row: usize,
        field: &'static str,
        reason: String,
    },

    /// Too few dates or entities to form a window, or a degenerate split.
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    /// Evaluation was asked to score zero samples.
    #[error("Empty input: {what}")]
    EmptyInput { what: &'static str },

    /// Matrix or record dimensions disagree with the entity/horizon layout.
    #[error("Shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A true-label cell holds something other than 0 or 1.
    #[error("Invalid label {value} at sample {sample}, column {column}")]
    InvalidLabel {
        sample: usize,
        column: usize,
        value: u8,
    },

    /// A predicted probability is NaN or outside [0, 1].
    #[error("Invalid prediction {value} at sample {sample}, column {column}")]
    InvalidPrediction {
        sample: usize,
        column: usize,
        value: f64,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure to obtain observations from a source.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("Ingestion task failed: {0}")]
    Task(String),
}

/// Failure to save or restore scale parameters or cached samples.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Version mismatch: file v{found} vs required v{expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Parameter mismatch: {0}")]
    ParameterMismatch(String),
}
