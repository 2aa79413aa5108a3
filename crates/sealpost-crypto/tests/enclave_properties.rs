//! Property tests for the enclave.
//!
//! These tests verify:
//! - Every recipient and the sender can decrypt what was encrypted for them
//! - A stripped payload decrypts identically and carries one combined key
//! - Privacy group ids ignore member order and are stable

use std::sync::Arc;

use proptest::prelude::*;
use sealpost_crypto::{
    CryptoEnclave, Enclave, MemoryKeyStore, PrivacyGroupType, PublicKey, SystemEnv,
};

fn enclave_with(keys: usize) -> (CryptoEnclave<MemoryKeyStore, SystemEnv>, Vec<PublicKey>) {
    let store = MemoryKeyStore::new();
    let publics = (0..keys).map(|_| store.generate_node_key().public).collect();
    (CryptoEnclave::new(Arc::new(store), SystemEnv::new()), publics)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_recipient_and_sender_decrypts(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        recipient_count in 1usize..6,
    ) {
        let (enclave, keys) = enclave_with(recipient_count + 1);
        let sender = keys[0];
        let recipients = &keys[1..];

        let payload = enclave.encrypt(&plaintext, Some(&sender), recipients, None).unwrap();
        prop_assert_eq!(payload.combined_keys.len(), recipients.len() + 1);

        for recipient in recipients {
            prop_assert_eq!(enclave.decrypt(&payload, recipient).unwrap(), plaintext.clone());
        }
        prop_assert_eq!(enclave.decrypt(&payload, &sender).unwrap(), plaintext);
    }

    #[test]
    fn prop_stripped_payload_decrypts_identically(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        recipient_count in 1usize..5,
        pick in any::<prop::sample::Index>(),
    ) {
        let (enclave, keys) = enclave_with(recipient_count + 1);
        let recipients = &keys[1..];
        let chosen = recipients[pick.index(recipients.len())];

        let payload = enclave.encrypt(&plaintext, Some(&keys[0]), recipients, None).unwrap();
        let stripped = payload.strip_for(&chosen).unwrap();

        prop_assert_eq!(stripped.combined_keys.len(), 1);
        prop_assert_eq!(stripped.digest(), payload.digest());
        prop_assert_eq!(
            enclave.decrypt(&stripped, &chosen).unwrap(),
            enclave.decrypt(&payload, &chosen).unwrap()
        );
    }

    #[test]
    fn prop_group_id_is_order_independent(
        raw in prop::collection::vec(any::<[u8; 32]>(), 1..8),
        seed in prop::collection::vec(any::<u8>(), 0..32),
        explicit in any::<bool>(),
    ) {
        let (enclave, _) = enclave_with(0);
        let group_type = if explicit { PrivacyGroupType::Explicit } else { PrivacyGroupType::Legacy };
        let addresses: Vec<PublicKey> = raw.into_iter().map(PublicKey::from).collect();
        let mut reversed = addresses.clone();
        reversed.reverse();

        let id = enclave.generate_privacy_group_id(&addresses, Some(&seed), group_type);
        prop_assert_eq!(&id, &enclave.generate_privacy_group_id(&reversed, Some(&seed), group_type));
        prop_assert_eq!(&id, &enclave.generate_privacy_group_id(&addresses, Some(&seed), group_type));
    }
}

#[test]
fn payload_survives_json_transport() {
    let (enclave, keys) = enclave_with(2);
    let payload = enclave.encrypt(b"over the wire", Some(&keys[0]), &[keys[1]], None).unwrap();
    let stripped = payload.strip_for(&keys[1]).unwrap();

    let json = serde_json::to_vec(&stripped).unwrap();
    let received: sealpost_crypto::EncryptedPayload = serde_json::from_slice(&json).unwrap();

    assert_eq!(enclave.decrypt(&received, &keys[1]).unwrap(), b"over the wire");
    assert!(received.key_owners().is_empty());
}
