//! Error types for enclave operations.
//!
//! Messages describe what failed, never the key or plaintext material
//! involved.

use thiserror::Error;

/// Errors that can occur during encryption, decryption and key handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No sender key was given and the node holds no keys of its own.
    #[error("no sender key available")]
    NoSenderKey,

    /// The key store has no private key for the requested identity.
    #[error("no private key held for {public_key}")]
    NoPrivateKey {
        /// Base64 public key that was looked up
        public_key: String,
    },

    /// None of the payload's combined keys opens under the identity's key.
    #[error("payload cannot be decrypted with the given private key")]
    DecryptWrongPrivateKey,

    /// The content ciphertext failed authentication.
    #[error("payload ciphertext failed authentication")]
    DecryptFailed,

    /// Public key bytes are malformed (bad base64 or wrong length).
    #[error("malformed public key: {reason}")]
    DecodePublicKey {
        /// What was wrong with the encoding
        reason: String,
    },

    /// Private key bytes are malformed (bad base64 or wrong length).
    #[error("malformed private key: {reason}")]
    DecodePrivateKey {
        /// What was wrong with the encoding
        reason: String,
    },

    /// A nonce carried by a payload has the wrong length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonce {
        /// Required nonce length
        expected: usize,
        /// Length that was received
        actual: usize,
    },

    /// A payload was stripped for a key it holds no combined key for.
    #[error("payload has no combined key for {public_key}")]
    RecipientNotFound {
        /// Base64 public key that was requested
        public_key: String,
    },
}

impl CryptoError {
    pub(crate) fn decode_public_key(reason: impl Into<String>) -> Self {
        Self::DecodePublicKey { reason: reason.into() }
    }

    pub(crate) fn decode_private_key(reason: impl Into<String>) -> Self {
        Self::DecodePrivateKey { reason: reason.into() }
    }
}
