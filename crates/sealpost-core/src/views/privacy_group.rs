use std::sync::Arc;

use async_trait::async_trait;

use super::{Namespace, StorageView};
use crate::{
    model::PrivacyGroupPayload,
    storage::{KeyValueStore, StorageError},
};

/// Privacy groups keyed by their id.
///
/// `update` overwrites; it is how a group moves to `Deleted`.
#[derive(Clone)]
pub struct PrivacyGroupStorage {
    ns: Namespace,
}

impl PrivacyGroupStorage {
    /// View over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { ns: Namespace::new(store, "group/") }
    }
}

#[async_trait]
impl StorageView for PrivacyGroupStorage {
    type Value = PrivacyGroupPayload;

    fn digest_of(&self, value: &PrivacyGroupPayload) -> String {
        value.id()
    }

    async fn put(&self, value: &PrivacyGroupPayload) -> Result<String, StorageError> {
        let id = self.digest_of(value);
        self.ns.save(&id, value).await?;
        Ok(id)
    }

    async fn get(&self, digest: &str) -> Result<Option<PrivacyGroupPayload>, StorageError> {
        self.ns.load(digest).await
    }

    async fn update(
        &self,
        digest: &str,
        value: &PrivacyGroupPayload,
    ) -> Result<Option<PrivacyGroupPayload>, StorageError> {
        self.ns.save(digest, value).await?;
        Ok(Some(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use sealpost_crypto::PublicKey;

    use super::*;
    use crate::{model::PrivacyGroupState, storage::MemoryStore};

    fn group() -> PrivacyGroupPayload {
        PrivacyGroupPayload::explicit(
            vec![PublicKey::from([1u8; 32]), PublicKey::from([2u8; 32])],
            "auditors",
            "quarterly audit",
            vec![5u8; 32],
        )
    }

    #[tokio::test]
    async fn put_keys_by_group_id() {
        let view = PrivacyGroupStorage::new(Arc::new(MemoryStore::new()));
        let value = group();

        let id = view.put(&value).await.unwrap();
        assert_eq!(id, value.id());
        assert_eq!(view.get(&id).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn update_overwrites_state() {
        let view = PrivacyGroupStorage::new(Arc::new(MemoryStore::new()));
        let id = view.put(&group()).await.unwrap();

        let updated = view.update(&id, &group().deleted()).await.unwrap().unwrap();
        assert_eq!(updated.state, PrivacyGroupState::Deleted);
        assert_eq!(view.get(&id).await.unwrap().unwrap().state, PrivacyGroupState::Deleted);
    }
}
