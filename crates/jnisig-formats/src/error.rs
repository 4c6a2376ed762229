//! Error types for binary format parsing.

use thiserror::Error;

/// Error type for binary format parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid magic number at start of file.
    #[error("invalid magic number: expected {expected}, got {actual:02x?}")]
    InvalidMagic {
        expected: &'static str,
        actual: Vec<u8>,
    },

    /// File is too short to contain required data.
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Truncated data while parsing.
    #[error("truncated data: expected {expected} bytes, got {actual} while parsing {context}")]
    TruncatedData {
        expected: usize,
        actual: usize,
        context: &'static str,
    },

    /// Invalid section or symbol table.
    #[error("invalid {kind} at offset {offset:#x}: {reason}")]
    InvalidStructure {
        kind: &'static str,
        offset: u64,
        reason: String,
    },

    /// Unknown architecture name.
    #[error("unknown architecture: {0}")]
    UnknownArchitecture(String),
}

impl ParseError {
    /// Creates a new InvalidMagic error.
    pub fn invalid_magic(expected: &'static str, actual: &[u8]) -> Self {
        Self::InvalidMagic {
            expected,
            actual: actual.to_vec(),
        }
    }

    /// Creates a new TooShort error.
    pub fn too_short(expected: usize, actual: usize) -> Self {
        Self::TooShort { expected, actual }
    }

    /// Creates a new InvalidStructure error.
    pub fn invalid_structure(kind: &'static str, offset: u64, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            kind,
            offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ParseError::too_short(64, 3).to_string(),
            "file too short: expected at least 64 bytes, got 3"
        );
        assert_eq!(
            ParseError::invalid_magic("ELF", b"MZ").to_string(),
            "invalid magic number: expected ELF, got [4d, 5a]"
        );
        assert!(ParseError::invalid_structure("symbol", 0x40, "name out of range")
            .to_string()
            .starts_with("invalid symbol at offset 0x40"));
    }
}
