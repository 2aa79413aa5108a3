use std::sync::Arc;

use async_trait::async_trait;
use sealpost_crypto::EncryptedPayload;

use super::{Namespace, StorageView};
use crate::storage::{KeyValueStore, StorageError};

/// Encrypted payloads keyed by the digest of their cipher text.
///
/// Payloads are immutable: [`StorageView::update`] always fails with
/// [`StorageError::MethodUnimplemented`].
#[derive(Clone)]
pub struct EncryptedPayloadStorage {
    ns: Namespace,
}

impl EncryptedPayloadStorage {
    /// View over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { ns: Namespace::new(store, "payload/") }
    }
}

#[async_trait]
impl StorageView for EncryptedPayloadStorage {
    type Value = EncryptedPayload;

    fn digest_of(&self, value: &EncryptedPayload) -> String {
        value.digest()
    }

    async fn put(&self, value: &EncryptedPayload) -> Result<String, StorageError> {
        let digest = self.digest_of(value);
        self.ns.save(&digest, value).await?;
        Ok(digest)
    }

    async fn get(&self, digest: &str) -> Result<Option<EncryptedPayload>, StorageError> {
        self.ns.load(digest).await
    }

    async fn update(
        &self,
        _digest: &str,
        _value: &EncryptedPayload,
    ) -> Result<Option<EncryptedPayload>, StorageError> {
        Err(StorageError::MethodUnimplemented { operation: "update", view: "encrypted payloads" })
    }
}
