// In: src/error.rs

//! This module defines the single, unified error type for the entire molvis core.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

use crate::pipeline::ModifierId;
use crate::selection::ParseError;
use crate::types::ColumnType;

#[derive(Error, Debug)]
pub enum MolvisError {
    // =========================================================================
    // === Structural Errors (Block / Frame storage)
    // =========================================================================
    #[error("Column '{column}' has {got} rows but the block holds {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Column '{column}' holds {found} data, but {expected} was requested")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    // =========================================================================
    // === Expression & Pipeline Errors
    // =========================================================================
    #[error("Selection expression is malformed: {0}")]
    Parse(#[from] ParseError),

    #[error("Pipeline has no data source: the first modifier must be a DataSourceModifier")]
    MissingSource,

    #[error("Modifier not found: {0}")]
    ModifierNotFound(ModifierId),

    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    // =========================================================================
    // === Session / Bridge Errors
    // =========================================================================
    #[error("Operation '{0}' requires edit mode")]
    ModeViolation(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed frame data: {0}")]
    FrameFormatError(String),

    #[error("XYZ parse error at line {line}: {message}")]
    XyzFormat { line: usize, message: String },

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while decoding a bridge message.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An N×3 position array had the wrong shape.
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// An error for Python FFI operations.
    #[error("FFI operation failed: {0}")]
    FfiError(String), // PyErr doesn't impl Error, so we can't use #[from] here.
}

impl MolvisError {
    /// Builds an `XyzFormat` error for the given 1-based line.
    pub fn xyz(line: usize, message: impl Into<String>) -> Self {
        MolvisError::XyzFormat {
            line,
            message: message.into(),
        }
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for MolvisError {
    fn from(err: pyo3::PyErr) -> Self {
        MolvisError::FfiError(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<MolvisError> for pyo3::PyErr {
    fn from(err: MolvisError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message_names_the_column() {
        let err = MolvisError::LengthMismatch {
            column: "y".to_string(),
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "Column 'y' has 2 rows but the block holds 3");
    }

    #[test]
    fn test_parse_error_converts_with_question_mark() {
        fn parse() -> Result<(), MolvisError> {
            Err(ParseError::UnexpectedEof)?
        }
        assert!(matches!(parse(), Err(MolvisError::Parse(ParseError::UnexpectedEof))));
    }
}
