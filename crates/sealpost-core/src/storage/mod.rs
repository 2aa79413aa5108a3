//! Key-value storage collaborator.
//!
//! The views in [`crate::views`] derive keys and encode values; a
//! [`KeyValueStore`] only moves bytes. Backends are swappable:
//! [`MemoryStore`] for tests and ephemeral nodes, [`RedbStore`] for durable
//! nodes, [`ChaoticStore`] wrapping either to inject failures.

mod chaotic;
mod error;
mod memory;
mod redb;

use async_trait::async_trait;
pub use chaotic::ChaoticStore;
pub use error::StorageError;
pub use memory::MemoryStore;

pub use self::redb::RedbStore;

/// Byte-oriented asynchronous key-value store.
///
/// Implementations are shared behind `Arc` by every view of a node and must
/// be safe for concurrent use. A `put` that returned `Ok` is visible to every
/// later `get`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Value stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}
