use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Namespace, StorageView};
use crate::{
    model::QueryPrivacyGroupPayload,
    storage::{KeyValueStore, StorageError},
};

/// Address-set index: every privacy group id created for one exact set.
///
/// `update` merges: the value's `privacy_group_to_append` is appended to (or,
/// with `to_delete`, removed from) the stored id list. Merges through clones
/// of one view are serialized, so concurrent appends are never lost.
#[derive(Clone)]
pub struct QueryPrivacyGroupStorage {
    ns: Namespace,
    merge: Arc<Mutex<()>>,
}

impl QueryPrivacyGroupStorage {
    /// View over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { ns: Namespace::new(store, "query/"), merge: Arc::new(Mutex::new(())) }
    }
}

#[async_trait]
impl StorageView for QueryPrivacyGroupStorage {
    type Value = QueryPrivacyGroupPayload;

    fn digest_of(&self, value: &QueryPrivacyGroupPayload) -> String {
        value.digest()
    }

    async fn put(&self, value: &QueryPrivacyGroupPayload) -> Result<String, StorageError> {
        let digest = self.digest_of(value);
        self.ns.save(&digest, value).await?;
        Ok(digest)
    }

    async fn get(&self, digest: &str) -> Result<Option<QueryPrivacyGroupPayload>, StorageError> {
        self.ns.load(digest).await
    }

    async fn update(
        &self,
        digest: &str,
        value: &QueryPrivacyGroupPayload,
    ) -> Result<Option<QueryPrivacyGroupPayload>, StorageError> {
        let _merging = self.merge.lock().await;
        let stored = self.ns.load(digest).await?;
        let merged = value.merge_into(stored);
        self.ns.save(digest, &merged).await?;
        Ok(Some(merged))
    }
}
