//! Storage error types.
//!
//! Distinguishes a rejected operation (`MethodUnimplemented`, mutating an
//! immutable payload) from a failing backend (`Io`).

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The view does not support this operation.
    ///
    /// Encrypted payloads are immutable, so `update` on the payload view
    /// always fails with this error. Never retried.
    #[error("{operation} is not supported for {view}")]
    MethodUnimplemented {
        /// Operation that was attempted
        operation: &'static str,
        /// View it was attempted on
        view: &'static str,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns true if the operation may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(format!("storage task failed: {err}"))
    }
}
