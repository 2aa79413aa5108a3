//! Fuzz target for request body decoding
//!
//! Every HTTP body a node accepts is JSON from an untrusted caller or peer.
//!
//! # Invariants
//!
//! - Decoding NEVER panics, only returns Err
//! - A decoded payload carries no owner bookkeeping, so stripping it fails
//! - Send request validation NEVER panics on any decoded request

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_core::{
    PartyInfo, PrivacyGroupPayload,
    api::{CreatePrivacyGroupRequest, ReceiveRequest, SendRequest},
};
use sealpost_crypto::EncryptedPayload;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = serde_json::from_slice::<EncryptedPayload>(data) {
        let _ = payload.digest();
        assert!(payload.key_owners().is_empty());
        assert!(payload.strip_for(&payload.sender).is_err());
    }

    if let Ok(request) = serde_json::from_slice::<SendRequest>(data) {
        let _ = request.plaintext();
        let _ = request.sender();
        let _ = request.target();
    }

    if let Ok(request) = serde_json::from_slice::<ReceiveRequest>(data) {
        let _ = request.identity();
    }

    if let Ok(request) = serde_json::from_slice::<CreatePrivacyGroupRequest>(data) {
        let _ = request.creator();
    }

    if let Ok(group) = serde_json::from_slice::<PrivacyGroupPayload>(data) {
        let _ = group.id();
    }

    let _ = serde_json::from_slice::<PartyInfo>(data);
});
