//! Fuzz target for reading corrupted storage
//!
//! Writes arbitrary bytes under every view's namespace and reads them back
//! through the typed views.
//!
//! # Invariants
//!
//! - Corrupt values surface as `StorageError::Serialization`, NEVER a panic
//! - Absent keys read as `None`

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use sealpost_core::{KeyValueStore, MemoryStore, StorageError, StorageView, Stores};

fuzz_target!(|data: &[u8]| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };

    runtime.block_on(async {
        let store = Arc::new(MemoryStore::new());
        for prefix in ["payload/", "group/", "query/"] {
            store.put(&format!("{prefix}fuzz"), data).await.unwrap();
        }
        let stores = Stores::new(store);

        check(stores.payloads.get("fuzz").await);
        check(stores.groups.get("fuzz").await);
        check(stores.queries.get("fuzz").await);

        assert!(stores.payloads.get("absent").await.unwrap().is_none());
    });
});

fn check<T>(result: Result<Option<T>, StorageError>) {
    match result {
        Ok(value) => assert!(value.is_some()),
        Err(err) => assert!(matches!(err, StorageError::Serialization(_)), "{err}"),
    }
}
