//! Error types for the statistics engine
//!
//! Only recoverable conditions live here. Encoding-contract violations
//! (an unknown value type reaching the renderer, merging processors of
//! different kinds) are bugs and abort via `panic!` instead.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Stats expression could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Block construction rejected its input
    #[error("Invalid block: {0}")]
    InvalidBlock(#[from] BlockError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failure to parse the argument list of a stats function
///
/// Carries the function name so callers can report `min(...)` vs `max(...)`
/// problems without re-parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse {func}(): {message}; input: {input:?}")]
pub struct ParseError {
    /// Stats function whose arguments failed to parse
    pub func: String,
    /// Description of the failure
    pub message: String,
    /// Remaining input at the point of failure
    pub input: String,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(func: impl Into<String>, message: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            message: message.into(),
            input: input.into(),
        }
    }
}

/// Errors raised while assembling a block from raw column data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Column length differs from the block row count
    #[error("column {column:?} has {actual} rows, block has {expected}")]
    LengthMismatch {
        /// Column name
        column: String,
        /// Block row count
        expected: usize,
        /// Rows supplied for the column
        actual: usize,
    },

    /// Dictionary index points past the dictionary
    #[error("column {column:?} references dictionary entry {index}, dictionary has {len}")]
    DictIndexOutOfRange {
        /// Column name
        column: String,
        /// Offending index
        index: u8,
        /// Dictionary size
        len: usize,
    },

    /// Dictionary exceeds the 8-bit index space
    #[error("column {column:?} has {len} dictionary entries, limit is {limit}")]
    DictTooLarge {
        /// Column name
        column: String,
        /// Dictionary size
        len: usize,
        /// Maximum supported dictionary size
        limit: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("min", "missing ')'", "(a, b");
        let display = err.to_string();
        assert!(display.contains("min()"));
        assert!(display.contains("missing ')'"));
        assert!(display.contains("(a, b"));
    }

    #[test]
    fn test_parse_error_converts() {
        let err: Error = ParseError::new("max", "empty field name", "(,)").into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_block_error_display() {
        let err = BlockError::LengthMismatch {
            column: "level".to_string(),
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "column \"level\" has 3 rows, block has 4");
    }
}
