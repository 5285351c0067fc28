//! Error types for planetcore.

use std::io;
use thiserror::Error;

/// The result type used throughout planetcore.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for sort, index and id set operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Stored data could not be decoded or failed its checksum.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// The requested key is not present.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An element written to a fixed-width index had a different width than
    /// the first element.
    #[error(
        "Inconsistent element size: element {index} is {actual} bytes, expected {expected}"
    )]
    InconsistentElementSize {
        /// Zero-based position of the offending element.
        index: u64,
        /// Width established by the first element.
        expected: usize,
        /// Width of the offending element.
        actual: usize,
    },

    /// An id could not be narrowed to the range supported by a tracker.
    #[error("Id {0} is outside the supported range")]
    IdOutOfRange(i64),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The component is in a state that doesn't allow the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Returns true for an expected lookup miss, as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
