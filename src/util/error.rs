//! Error types for the Commands codec.

use std::path::PathBuf;
use thiserror::Error;

use crate::guid::ShortGuid;

/// Main error type for decode and encode operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// An offset/count pair points outside the buffer
    #[error("Read of {len} bytes at offset {offset} is outside the buffer (size: {size})")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    /// A required top-level entry point does not resolve to a composite
    #[error("Entry point {0} does not name a composite in the archive")]
    MissingEntryPoint(ShortGuid),

    /// A restated identifier disagrees with its header
    #[error("Identifier mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: ShortGuid, actual: ShortGuid },

    /// Command-stream entry that this codec cannot apply
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// Invalid data structure in the buffer
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Command-stream payload does not fit the 16-bit size field
    #[error("Payload of {0} bytes exceeds the command size limit")]
    PayloadTooLarge(usize),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Check whether this error came from an out-of-range read.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::OutOfBounds { offset: 40, len: 12, size: 44 };
        let msg = e.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains("44"));
        assert!(e.is_out_of_bounds());

        let e = Error::IdMismatch {
            expected: ShortGuid::from_bytes([1, 2, 3, 4]),
            actual: ShortGuid::ZERO,
        };
        assert!(e.to_string().contains("01-02-03-04"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
