//! Node error types and their stable machine-readable codes.
//!
//! Every failure a caller can observe carries an [`ErrorCode`]. The code is
//! what crosses the wire (`{"error": "<code>"}`); the message is for logs.

use sealpost_crypto::CryptoError;
use thiserror::Error;

use crate::storage::StorageError;

/// Stable error codes surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No sender key given and the node has none
    NoSenderKey,
    /// The node holds no private key for the requested identity
    NoPrivateKey,
    /// No combined key opens under the identity's private key
    DecryptWrongPrivateKey,
    /// Malformed public key
    DecodePublicKey,
    /// Malformed payload (bad nonce, missing combined key)
    InvalidPayload,
    /// Referenced privacy group is absent or not active
    PrivacyGroupMissing,
    /// Deleting a group the requester is not a member of
    DeleteFromNotMember,
    /// A remote recipient has no known hosting node
    NodeMissingPeerUrl,
    /// Transport failure pushing to a peer
    NodePushingToPeer,
    /// A peer rejected a push or echoed the wrong digest
    NodePropagatingToAllPeers,
    /// No payload stored under the requested key
    EnclavePayloadNotFound,
    /// Send request names both or neither of `to` and `privacyGroupId`
    InvalidSendRequest,
    /// Operation not supported by the storage view
    MethodUnimplemented,
    /// Storage backend failure
    StorageIo,
    /// Stored value could not be encoded or decoded
    StorageSerialization,
}

impl ErrorCode {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSenderKey => "NoSenderKey",
            Self::NoPrivateKey => "NoPrivateKey",
            Self::DecryptWrongPrivateKey => "DecryptWrongPrivateKey",
            Self::DecodePublicKey => "DecodePublicKey",
            Self::InvalidPayload => "InvalidPayload",
            Self::PrivacyGroupMissing => "PrivacyGroupMissing",
            Self::DeleteFromNotMember => "DeleteFromNotMember",
            Self::NodeMissingPeerUrl => "NodeMissingPeerUrl",
            Self::NodePushingToPeer => "NodePushingToPeer",
            Self::NodePropagatingToAllPeers => "NodePropagatingToAllPeers",
            Self::EnclavePayloadNotFound => "EnclavePayloadNotFound",
            Self::InvalidSendRequest => "InvalidSendRequest",
            Self::MethodUnimplemented => "MethodUnimplemented",
            Self::StorageIo => "StorageIo",
            Self::StorageSerialization => "StorageSerialization",
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    ///
    /// Only propagation and storage I/O failures qualify. Validation, crypto
    /// and routing failures repeat until the request or the directory
    /// changes.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::NodePushingToPeer | Self::NodePropagatingToAllPeers | Self::StorageIo)
    }

    /// HTTP status an API response carries for this code.
    ///
    /// Not-found covers both an absent payload and one this node cannot open
    /// for the caller.
    pub fn http_status(self) -> u16 {
        match self {
            Self::EnclavePayloadNotFound | Self::DecryptWrongPrivateKey | Self::NoPrivateKey => 404,
            Self::NodePushingToPeer
            | Self::NodePropagatingToAllPeers
            | Self::MethodUnimplemented
            | Self::StorageIo
            | Self::StorageSerialization => 500,
            Self::NoSenderKey
            | Self::DecodePublicKey
            | Self::InvalidPayload
            | Self::PrivacyGroupMissing
            | Self::DeleteFromNotMember
            | Self::NodeMissingPeerUrl
            | Self::InvalidSendRequest => 400,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by node operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealpostError {
    /// Enclave failure
    #[error("enclave error: {0}")]
    Crypto(#[from] CryptoError),

    /// Storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Privacy group absent or deleted
    #[error("privacy group {0} is missing or not active")]
    PrivacyGroupMissing(String),

    /// Group deletion requested by a non-member
    #[error("{member} is not a member of privacy group {group}")]
    DeleteFromNotMember {
        /// Base64 key of the requester
        member: String,
        /// Group id
        group: String,
    },

    /// Recipient without a known hosting node
    #[error("no node known for recipient {0}")]
    NodeMissingPeerUrl(String),

    /// Transport failure on one propagation leg
    #[error("pushing to {url} failed: {reason}")]
    NodePushingToPeer {
        /// Peer URL
        url: String,
        /// Transport error
        reason: String,
    },

    /// Peer rejected a propagation leg
    #[error("propagation to {url} failed: {reason}")]
    NodePropagatingToAllPeers {
        /// Peer URL
        url: String,
        /// Status or mismatch description
        reason: String,
    },

    /// Nothing stored under the key
    #[error("payload {0} not found")]
    PayloadNotFound(String),

    /// Malformed send request
    #[error("invalid send request: {0}")]
    InvalidSendRequest(String),
}

impl SealpostError {
    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Crypto(err) => match err {
                CryptoError::NoSenderKey => ErrorCode::NoSenderKey,
                CryptoError::NoPrivateKey { .. } => ErrorCode::NoPrivateKey,
                CryptoError::DecryptWrongPrivateKey | CryptoError::DecryptFailed => {
                    ErrorCode::DecryptWrongPrivateKey
                },
                CryptoError::DecodePublicKey { .. } | CryptoError::DecodePrivateKey { .. } => {
                    ErrorCode::DecodePublicKey
                },
                CryptoError::InvalidNonce { .. } | CryptoError::RecipientNotFound { .. } => {
                    ErrorCode::InvalidPayload
                },
            },
            Self::Storage(err) => match err {
                StorageError::MethodUnimplemented { .. } => ErrorCode::MethodUnimplemented,
                StorageError::Serialization(_) => ErrorCode::StorageSerialization,
                StorageError::Io(_) => ErrorCode::StorageIo,
            },
            Self::PrivacyGroupMissing(_) => ErrorCode::PrivacyGroupMissing,
            Self::DeleteFromNotMember { .. } => ErrorCode::DeleteFromNotMember,
            Self::NodeMissingPeerUrl(_) => ErrorCode::NodeMissingPeerUrl,
            Self::NodePushingToPeer { .. } => ErrorCode::NodePushingToPeer,
            Self::NodePropagatingToAllPeers { .. } => ErrorCode::NodePropagatingToAllPeers,
            Self::PayloadNotFound(_) => ErrorCode::EnclavePayloadNotFound,
            Self::InvalidSendRequest(_) => ErrorCode::InvalidSendRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_to_codes() {
        let err = SealpostError::from(CryptoError::DecryptFailed);
        assert_eq!(err.code(), ErrorCode::DecryptWrongPrivateKey);

        let err = SealpostError::from(CryptoError::DecodePublicKey { reason: "short".into() });
        assert_eq!(err.code().as_str(), "DecodePublicKey");
    }

    #[test]
    fn storage_unimplemented_is_distinct_from_io() {
        let unimplemented = SealpostError::from(StorageError::MethodUnimplemented {
            operation: "update",
            view: "encrypted payloads",
        });
        let io = SealpostError::from(StorageError::Io("disk full".into()));

        assert_eq!(unimplemented.code(), ErrorCode::MethodUnimplemented);
        assert_eq!(io.code(), ErrorCode::StorageIo);
        assert!(!unimplemented.code().is_retryable());
        assert!(io.code().is_retryable());
    }

    #[test]
    fn status_classes() {
        assert_eq!(ErrorCode::EnclavePayloadNotFound.http_status(), 404);
        assert_eq!(ErrorCode::DecryptWrongPrivateKey.http_status(), 404);
        assert_eq!(ErrorCode::InvalidSendRequest.http_status(), 400);
        assert_eq!(ErrorCode::NodeMissingPeerUrl.http_status(), 400);
        assert_eq!(ErrorCode::NodePropagatingToAllPeers.http_status(), 500);
        assert_eq!(ErrorCode::StorageIo.http_status(), 500);
    }

    #[test]
    fn only_propagation_and_io_are_retryable() {
        assert!(ErrorCode::NodePushingToPeer.is_retryable());
        assert!(ErrorCode::NodePropagatingToAllPeers.is_retryable());
        assert!(!ErrorCode::NodeMissingPeerUrl.is_retryable());
        assert!(!ErrorCode::DecryptWrongPrivateKey.is_retryable());
        assert!(!ErrorCode::PrivacyGroupMissing.is_retryable());
    }
}
