// In: src/selection/error.rs

//! Failure modes of the selection expression parser.

use thiserror::Error;

/// Errors raised while turning an expression string into an `Expr`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Only `x`, `y`, `z`, `element`, `id` and `index` may be referenced.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unmatched parenthesis")]
    UnmatchedParen,

    #[error("empty expression")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::UnknownIdentifier("mass".to_string());
        assert_eq!(format!("{}", err), "unknown identifier: mass");
    }
}
