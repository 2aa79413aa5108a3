//! Reading payloads back, and storing payloads pushed by peers.

use std::sync::Arc;

use sealpost_crypto::{CryptoError, Enclave, EncryptedPayload, PublicKey};

use crate::{
    SealpostError,
    views::{EncryptedPayloadStorage, StorageView},
};

/// A decrypted payload and what it was sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Plaintext
    pub payload: Vec<u8>,
    /// Group the payload was sent to
    pub privacy_group_id: String,
    /// Key that sealed the payload
    pub sender: PublicKey,
}

/// Looks up and decrypts stored payloads.
pub struct ReceiveManager {
    enclave: Arc<dyn Enclave>,
    payloads: EncryptedPayloadStorage,
}

impl ReceiveManager {
    /// Manager over the node's enclave and payload storage.
    pub fn new(enclave: Arc<dyn Enclave>, payloads: EncryptedPayloadStorage) -> Self {
        Self { enclave, payloads }
    }

    /// Decrypt the payload stored at `key` as `identity`.
    ///
    /// `identity` defaults to the node's first key.
    pub async fn receive(
        &self,
        key: &str,
        identity: Option<PublicKey>,
    ) -> Result<Received, SealpostError> {
        let identity = match identity {
            Some(identity) => identity,
            None => self
                .enclave
                .node_keys()
                .first()
                .copied()
                .ok_or(SealpostError::Crypto(CryptoError::NoSenderKey))?,
        };

        let payload = self
            .payloads
            .get(key)
            .await?
            .ok_or_else(|| SealpostError::PayloadNotFound(key.to_string()))?;

        let plaintext = self.enclave.decrypt(&payload, &identity)?;

        Ok(Received {
            payload: plaintext,
            privacy_group_id: payload.privacy_group_id,
            sender: payload.sender,
        })
    }

    /// Store a payload pushed by a peer and return its digest.
    pub async fn store_pushed(&self, payload: &EncryptedPayload) -> Result<String, SealpostError> {
        let digest = self.payloads.put(payload).await?;
        tracing::debug!(
            digest = %digest,
            combined_keys = payload.combined_keys.len(),
            "Stored pushed payload"
        );
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use sealpost_crypto::{CryptoEnclave, MemoryKeyStore, SystemEnv};

    use super::*;
    use crate::{ErrorCode, storage::MemoryStore};

    fn manager() -> (ReceiveManager, Arc<CryptoEnclave<MemoryKeyStore, SystemEnv>>, Vec<PublicKey>)
    {
        let keystore = Arc::new(MemoryKeyStore::new());
        let keys = vec![keystore.generate_node_key().public, keystore.generate_node_key().public];
        let enclave = Arc::new(CryptoEnclave::new(keystore, SystemEnv::new()));
        let payloads = EncryptedPayloadStorage::new(Arc::new(MemoryStore::new()));
        let manager = ReceiveManager::new(Arc::clone(&enclave) as Arc<dyn Enclave>, payloads);
        (manager, enclave, keys)
    }

    #[tokio::test]
    async fn stored_payload_decrypts_for_default_identity() {
        let (manager, enclave, keys) = manager();
        let payload = enclave.encrypt(b"hello", Some(&keys[1]), &[keys[0]], None).unwrap();
        let digest = manager.store_pushed(&payload).await.unwrap();

        let received = manager.receive(&digest, None).await.unwrap();
        assert_eq!(received.payload, b"hello");
        assert_eq!(received.sender, keys[1]);
        assert_eq!(received.privacy_group_id, payload.privacy_group_id);
    }

    #[tokio::test]
    async fn missing_payload_is_not_found() {
        let (manager, _, _) = manager();
        let err = manager.receive("nope", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EnclavePayloadNotFound);
    }

    #[tokio::test]
    async fn foreign_identity_has_no_private_key() {
        let (manager, enclave, keys) = manager();
        let payload = enclave.encrypt(b"hello", Some(&keys[0]), &[keys[1]], None).unwrap();
        let digest = manager.store_pushed(&payload).await.unwrap();

        let stranger = PublicKey::from([7u8; 32]);
        let err = manager.receive(&digest, Some(stranger)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoPrivateKey);
    }
}
