//! Error types and handling infrastructure for linescope.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. Scan outcomes such as user or system interruption are not
//! errors and live in [`crate::scan::ScanOutcome`]; only conditions that abort an
//! operation before it produces results are represented here.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for linescope operations.
#[derive(Error, Debug)]
pub enum LinescopeError {
    /// File system related errors (read failures, seek failures, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The bound file could not be opened for reading.
    ///
    /// This is the only open failure surfaced by the scanner; it is terminal for
    /// the operation and no partial results are emitted.
    #[error("Unable to open file: {path}")]
    UnableToOpenFile { path: PathBuf },

    /// A search or filter pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The processing worker is gone (shut down or panicked)
    #[error("Processing worker unavailable")]
    WorkerUnavailable,

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for linescope operations.
pub type Result<T> = std::result::Result<T, LinescopeError>;

impl LinescopeError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create an UnableToOpenFile error for the given path
    pub fn unable_to_open(path: impl Into<PathBuf>) -> Self {
        Self::UnableToOpenFile { path: path.into() }
    }

    /// Create an InvalidPattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LinescopeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            std::io::ErrorKind::UnexpectedEof => Self::FileError {
                message: "File is shorter than its line index".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_messages() {
        let path = PathBuf::from("/test/file.log");

        let unable = LinescopeError::unable_to_open(path.clone());
        assert_eq!(unable.to_string(), "Unable to open file: /test/file.log");

        let pattern = LinescopeError::invalid_pattern("a(", "unclosed group");
        assert_eq!(
            pattern.to_string(),
            "Invalid pattern 'a(': unclosed group"
        );

        let config = LinescopeError::config("block_size must be positive");
        assert_eq!(
            config.to_string(),
            "Configuration error: block_size must be positive"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: LinescopeError = io_err.into();

        match err {
            LinescopeError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }

        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        match LinescopeError::from(eof) {
            LinescopeError::FileError { message, .. } => {
                assert!(message.contains("shorter"));
            }
            _ => panic!("Expected FileError variant"),
        }
    }
}
