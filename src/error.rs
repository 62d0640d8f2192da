//! Error types for numr-geometry

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using numr-geometry's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in geometry and storage operations
///
/// Every variant describes a caller error or a runtime failure that is
/// reported immediately. Nothing here is retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Dimension index outside the (legacy-adjusted) rank
    #[error("Dimension {dim} out of range of {ndim}D tensor")]
    IndexOutOfRange {
        /// The invalid dimension
        dim: usize,
        /// Rank the index was validated against
        ndim: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A storage was required but none was given
    #[error("Tensor: invalid null storage")]
    NullStorage,

    /// DType mismatch between a tensor and a storage
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// DType of the tensor
        lhs: DType,
        /// DType of the storage
        rhs: DType,
    },

    /// Device mismatch between a tensor and a storage
    #[error(
        "Attempted to set the storage of a tensor on device \"{expected}\" to a storage on different device \"{got}\""
    )]
    DeviceMismatch {
        /// Device of the tensor
        expected: String,
        /// Device of the offending storage
        got: String,
    },

    /// Negative storage offset
    #[error("Tensor: invalid storage offset {offset}")]
    InvalidOffset {
        /// The rejected offset
        offset: isize,
    },

    /// The tensor's storage was never established
    #[error("Cannot operate on a tensor whose storage was never established")]
    UninitializedStorage,

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create an index-out-of-range error
    pub fn index_out_of_range(dim: usize, ndim: usize) -> Self {
        Self::IndexOutOfRange { dim, ndim }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a device mismatch error from two device names
    pub fn device_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::DeviceMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}
