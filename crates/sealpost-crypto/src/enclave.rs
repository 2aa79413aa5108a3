//! The enclave capability: everything that needs key material.
//!
//! [`Enclave`] is the seam the rest of the node is written against.
//! [`CryptoEnclave`] is the production variant; tests swap the key store and
//! environment for deterministic ones.

use std::sync::Arc;

use zeroize::Zeroize;

use crate::{
    CryptoError, DigestAlgorithm, EncryptedPayload, Environment, KeyStore, PrivacyGroupType,
    PublicKey,
    digest::{digest, privacy_group_id},
    seal::{check_nonce, open_content, open_key, seal_content, seal_key},
};

/// Hybrid multi-recipient encryption and identity derivation.
pub trait Enclave: Send + Sync + 'static {
    /// Encrypt `plaintext` for `recipients`.
    ///
    /// `sender` defaults to the node's first key. The sender always receives
    /// a combined key of its own. The payload's privacy group id is derived
    /// from (recipients and sender, `seed`, legacy); callers that resolved a
    /// group already replace it with
    /// [`EncryptedPayload::with_privacy_group_id`].
    fn encrypt(
        &self,
        plaintext: &[u8],
        sender: Option<&PublicKey>,
        recipients: &[PublicKey],
        seed: Option<&[u8]>,
    ) -> Result<EncryptedPayload, CryptoError>;

    /// Decrypt `payload` as `identity`.
    fn decrypt(&self, payload: &EncryptedPayload, identity: &PublicKey)
    -> Result<Vec<u8>, CryptoError>;

    /// Deterministic, order-independent group id.
    fn generate_privacy_group_id(
        &self,
        addresses: &[PublicKey],
        seed: Option<&[u8]>,
        group_type: PrivacyGroupType,
    ) -> String {
        privacy_group_id(addresses, seed, group_type)
    }

    /// One-way hash.
    fn digest(&self, algorithm: DigestAlgorithm, bytes: &[u8]) -> Vec<u8> {
        digest(algorithm, bytes)
    }

    /// Fresh random seed for a new privacy group.
    fn generate_random_seed(&self) -> Vec<u8>;

    /// Keys this node owns.
    fn node_keys(&self) -> Vec<PublicKey>;

    /// Keys copied on every send.
    fn always_send_to(&self) -> Vec<PublicKey>;
}

/// Enclave backed by X25519 boxes and `XChaCha20-Poly1305`.
pub struct CryptoEnclave<K: KeyStore, E: Environment> {
    keystore: Arc<K>,
    env: E,
}

impl<K: KeyStore, E: Environment> CryptoEnclave<K, E> {
    /// Create an enclave over `keystore`, drawing randomness from `env`.
    pub fn new(keystore: Arc<K>, env: E) -> Self {
        Self { keystore, env }
    }

    /// Underlying key store.
    pub fn keystore(&self) -> &Arc<K> {
        &self.keystore
    }
}

impl<K: KeyStore, E: Environment> Enclave for CryptoEnclave<K, E> {
    fn encrypt(
        &self,
        plaintext: &[u8],
        sender: Option<&PublicKey>,
        recipients: &[PublicKey],
        seed: Option<&[u8]>,
    ) -> Result<EncryptedPayload, CryptoError> {
        let sender = match sender {
            Some(key) => *key,
            None => self.keystore.node_keys().first().copied().ok_or(CryptoError::NoSenderKey)?,
        };
        let sender_private =
            self.keystore.private_key_for(&sender).ok_or(CryptoError::NoSenderKey)?;

        let mut owners: Vec<PublicKey> = Vec::with_capacity(recipients.len() + 1);
        for recipient in recipients.iter().chain(std::iter::once(&sender)) {
            if !owners.contains(recipient) {
                owners.push(*recipient);
            }
        }

        let mut content_key = self.env.random_key();
        let nonce = self.env.random_nonce();
        let combined_key_nonce = self.env.random_nonce();

        let cipher_text = seal_content(plaintext, &content_key, &nonce);
        let combined_keys = owners
            .iter()
            .map(|owner| seal_key(&content_key, &sender_private, owner, &combined_key_nonce))
            .collect();
        content_key.zeroize();

        Ok(EncryptedPayload {
            sender,
            nonce: nonce.to_vec(),
            combined_key_nonce: combined_key_nonce.to_vec(),
            combined_keys,
            cipher_text,
            privacy_group_id: privacy_group_id(&owners, seed, PrivacyGroupType::Legacy),
            key_owners: owners,
        })
    }

    fn decrypt(
        &self,
        payload: &EncryptedPayload,
        identity: &PublicKey,
    ) -> Result<Vec<u8>, CryptoError> {
        let private = self
            .keystore
            .private_key_for(identity)
            .ok_or_else(|| CryptoError::NoPrivateKey { public_key: identity.to_base64() })?;
        let combined_key_nonce = check_nonce(&payload.combined_key_nonce)?;

        let mut content_key = payload
            .combined_keys
            .iter()
            .find_map(|combined| open_key(combined, &private, &payload.sender, combined_key_nonce))
            .ok_or(CryptoError::DecryptWrongPrivateKey)?;

        let plaintext = open_content(&payload.cipher_text, &content_key, &payload.nonce);
        content_key.zeroize();

        plaintext
    }

    fn generate_random_seed(&self) -> Vec<u8> {
        self.env.random_key().to_vec()
    }

    fn node_keys(&self) -> Vec<PublicKey> {
        self.keystore.node_keys()
    }

    fn always_send_to(&self) -> Vec<PublicKey> {
        self.keystore.always_send_to()
    }
}
