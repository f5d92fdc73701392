//! Uniform error carrier for the pipeline.
//!
//! A flat enum with hand-rolled `Display`, no `thiserror` — kinds match
//! the error list in §7 (inference failure, invalid input, library
//! corruption/IO, duplicate name, empty set, dimension mismatch). Recovery
//! policy lives with the caller (see module docs on [`crate::pipeline`]);
//! this type only carries what went wrong and where.

use std::error::Error;
use std::fmt;

/// Uniform error type returned by pipeline operations.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// A neural backend call failed or returned an unexpected shape.
    /// Recoverable per-segment; the pipeline continues.
    InferenceFailure { stage: &'static str, cause: String },

    /// Bad input to a pure function: invalid rate, empty audio, mismatched
    /// vector dimensions. Fatal to the call, not to the pipeline.
    InvalidInput { kind: String },

    /// Library deserialisation failed. Caller should start with an empty
    /// library; the original file is left untouched.
    LibraryCorrupt { detail: String },

    /// Library save/load hit a filesystem error. No partial state written.
    LibraryIO { detail: String },

    /// `enroll` was called with a name already present in the library.
    DuplicateName(String),

    /// An operation that requires at least one element was given zero.
    EmptySet,

    /// Two vectors expected to share a dimension did not.
    DimensionMismatch { expected: usize, found: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InferenceFailure { stage, cause } => {
                write!(f, "inference failure in {stage}: {cause}")
            }
            PipelineError::InvalidInput { kind } => write!(f, "invalid input: {kind}"),
            PipelineError::LibraryCorrupt { detail } => {
                write!(f, "speaker library is corrupt: {detail}")
            }
            PipelineError::LibraryIO { detail } => write!(f, "speaker library I/O error: {detail}"),
            PipelineError::DuplicateName(name) => {
                write!(f, "speaker name already enrolled: {name}")
            }
            PipelineError::EmptySet => write!(f, "operation requires at least one element"),
            PipelineError::DimensionMismatch { expected, found } => write!(
                f,
                "dimension mismatch: expected {expected}, found {found}"
            ),
        }
    }
}

impl Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::LibraryIO {
            detail: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::LibraryCorrupt {
            detail: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
