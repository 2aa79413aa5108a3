//! Outbound calls to peer nodes.
//!
//! [`PeerClient`] is the seam between node logic and the wire. The server
//! crate implements it over HTTP; the simulation harness routes calls
//! between in-process nodes.

use async_trait::async_trait;
use sealpost_crypto::EncryptedPayload;
use thiserror::Error;

use crate::{PartyInfo, model::PrivacyGroupPayload};

/// Failure of a single outbound call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// The peer could not be reached or the call timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with a non-200 status.
    #[error("peer responded with status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Calls a node makes to its peers.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    /// Exchange directory snapshots with the node at `url`.
    async fn party_info(&self, url: &str, local: &PartyInfo) -> Result<PartyInfo, PeerError>;

    /// Push a stripped payload; the peer answers with the digest it stored.
    async fn push(&self, url: &str, payload: &EncryptedPayload) -> Result<String, PeerError>;

    /// Push a privacy group; the peer answers with the group id it stored.
    async fn push_privacy_group(
        &self,
        url: &str,
        group: &PrivacyGroupPayload,
    ) -> Result<String, PeerError>;
}
