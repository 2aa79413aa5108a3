//! Encrypted payload wire type.

use serde::{Deserialize, Serialize};

use crate::{CryptoError, PublicKey, digest::digest_base64, keys::base64_bytes};

/// The content key sealed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedKey {
    /// Box ciphertext of the 32-byte content key, including its tag
    #[serde(with = "base64_bytes")]
    pub encoded: Vec<u8>,
}

/// A plaintext encrypted once for a set of recipients.
///
/// Immutable after creation. Locally stored payloads carry every combined
/// key; payloads pushed to a peer carry only that peer's recipient key (see
/// [`EncryptedPayload::strip_for`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Key whose private half sealed the combined keys
    pub sender: PublicKey,
    /// Nonce for the content ciphertext
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Nonce shared by every combined key of this payload
    #[serde(with = "base64_bytes")]
    pub combined_key_nonce: Vec<u8>,
    /// One sealed content key per recipient
    pub combined_keys: Vec<CombinedKey>,
    /// AEAD ciphertext of the plaintext
    #[serde(with = "base64_bytes")]
    pub cipher_text: Vec<u8>,
    /// Privacy group this payload belongs to
    pub privacy_group_id: String,
    /// Recipient of each entry in `combined_keys`, same order.
    ///
    /// Only known to the node that encrypted the payload; never serialized.
    #[serde(skip)]
    pub(crate) key_owners: Vec<PublicKey>,
}

// Owner bookkeeping is local knowledge, not part of the payload's identity.
impl PartialEq for EncryptedPayload {
    fn eq(&self, other: &Self) -> bool {
        self.sender == other.sender
            && self.nonce == other.nonce
            && self.combined_key_nonce == other.combined_key_nonce
            && self.combined_keys == other.combined_keys
            && self.cipher_text == other.cipher_text
            && self.privacy_group_id == other.privacy_group_id
    }
}

impl Eq for EncryptedPayload {}

impl EncryptedPayload {
    /// Content digest, shared by the local store and every peer's store.
    pub fn digest(&self) -> String {
        digest_base64(&self.cipher_text)
    }

    /// Recipients whose combined keys this payload knows the owners of.
    ///
    /// Empty for payloads that arrived over the wire or from storage.
    pub fn key_owners(&self) -> &[PublicKey] {
        &self.key_owners
    }

    /// Same payload attributed to `privacy_group_id`.
    #[must_use]
    pub fn with_privacy_group_id(mut self, privacy_group_id: String) -> Self {
        self.privacy_group_id = privacy_group_id;
        self
    }

    /// Copy reduced to the single combined key belonging to `recipient`.
    ///
    /// Used before sending to that recipient's node so the peer learns
    /// nothing about co-recipients.
    pub fn strip_for(&self, recipient: &PublicKey) -> Result<Self, CryptoError> {
        self.strip_for_all(std::slice::from_ref(recipient))
    }

    /// Copy reduced to the combined keys of `recipients`, for a node that
    /// hosts several of them.
    pub fn strip_for_all(&self, recipients: &[PublicKey]) -> Result<Self, CryptoError> {
        let mut combined_keys = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let combined = self
                .key_owners
                .iter()
                .position(|owner| owner == recipient)
                .and_then(|index| self.combined_keys.get(index))
                .ok_or_else(|| CryptoError::RecipientNotFound {
                    public_key: recipient.to_base64(),
                })?;
            combined_keys.push(combined.clone());
        }

        Ok(Self {
            sender: self.sender,
            nonce: self.nonce.clone(),
            combined_key_nonce: self.combined_key_nonce.clone(),
            combined_keys,
            cipher_text: self.cipher_text.clone(),
            privacy_group_id: self.privacy_group_id.clone(),
            key_owners: recipients.to_vec(),
        })
    }
}
