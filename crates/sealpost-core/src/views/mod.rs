//! Typed, content-addressed projections over a [`KeyValueStore`].
//!
//! Each view owns a key namespace and a digest function that defines the
//! primary key of its values:
//!
//! | View | Namespace | Digest |
//! |---|---|---|
//! | [`EncryptedPayloadStorage`] | `payload/` | SHA-512/256 of the cipher text |
//! | [`PrivacyGroupStorage`] | `group/` | privacy group id |
//! | [`QueryPrivacyGroupStorage`] | `query/` | SHA-512/256 of the address set |
//!
//! Values are CBOR-encoded.

mod payload;
mod privacy_group;
mod query;

use std::sync::Arc;

use async_trait::async_trait;
pub use payload::EncryptedPayloadStorage;
pub use privacy_group::PrivacyGroupStorage;
pub use query::QueryPrivacyGroupStorage;
use serde::{Serialize, de::DeserializeOwned};

use crate::storage::{KeyValueStore, StorageError};

/// A typed view keyed by a digest of its values.
#[async_trait]
pub trait StorageView: Send + Sync {
    /// Stored value type
    type Value: Send + Sync;

    /// Primary key of `value`.
    fn digest_of(&self, value: &Self::Value) -> String;

    /// Store `value` at its digest and return the digest.
    async fn put(&self, value: &Self::Value) -> Result<String, StorageError>;

    /// Value stored at `digest`, if any.
    async fn get(&self, digest: &str) -> Result<Option<Self::Value>, StorageError>;

    /// Replace or merge the value stored at `digest`.
    async fn update(
        &self,
        digest: &str,
        value: &Self::Value,
    ) -> Result<Option<Self::Value>, StorageError>;
}

/// Every view of one node, sharing a single backend.
#[derive(Clone)]
pub struct Stores {
    /// Encrypted payloads
    pub payloads: EncryptedPayloadStorage,
    /// Privacy groups
    pub groups: PrivacyGroupStorage,
    /// Address-set query index
    pub queries: QueryPrivacyGroupStorage,
}

impl Stores {
    /// Build all views over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            payloads: EncryptedPayloadStorage::new(Arc::clone(&store)),
            groups: PrivacyGroupStorage::new(Arc::clone(&store)),
            queries: QueryPrivacyGroupStorage::new(store),
        }
    }
}

/// Namespaced backend handle shared by the views.
#[derive(Clone)]
struct Namespace {
    store: Arc<dyn KeyValueStore>,
    prefix: &'static str,
}

impl Namespace {
    fn new(store: Arc<dyn KeyValueStore>, prefix: &'static str) -> Self {
        Self { store, prefix }
    }

    fn key(&self, digest: &str) -> String {
        format!("{}{digest}", self.prefix)
    }

    async fn load<T: DeserializeOwned>(&self, digest: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(&self.key(digest)).await? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize + Sync>(&self, digest: &str, value: &T) -> Result<(), StorageError> {
        let bytes = encode(value)?;
        self.store.put(&self.key(digest), &bytes).await
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
