//! Server error types.

use sealpost_core::StorageError;
use sealpost_crypto::KeyStoreError;
use thiserror::Error;

/// Errors that prevent a node from starting or keep it from serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration (bad bind address, unknown storage spec).
    ///
    /// Fatal. Fix the configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key files could not be loaded or written.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// The storage backend could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Socket or HTTP client failure.
    ///
    /// May be transient (network issues) or fatal (bind address in use).
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
