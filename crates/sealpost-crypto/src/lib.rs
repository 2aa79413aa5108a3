//! Sealpost Cryptographic Enclave
//!
//! Everything that touches key material lives here. The rest of the node
//! works with public keys, opaque [`EncryptedPayload`]s and the [`Enclave`]
//! capability.
//!
//! # Payload Layout
//!
//! A payload is encrypted once and readable by every recipient:
//!
//! ```text
//! plaintext ──XChaCha20-Poly1305(content key, nonce)──▶ cipherText
//!
//! content key ──box(sender private, recipient public, combinedKeyNonce)──▶ combinedKeys[i]
//!
//! box key = HKDF-SHA256(X25519(own private, peer public))
//! ```
//!
//! The sender always seals one combined key for itself, so the node that
//! sent a payload can read it back. Payloads pushed to a peer are stripped
//! to the single combined key of that peer's recipient.
//!
//! # Identity
//!
//! - Storage key: base64 SHA-512/256 of `cipherText`. Identical on every node
//!   holding the payload, stripped or not.
//! - Privacy group id: base64 SHA-512/256 over sorted member keys, seed and
//!   group type. Independent of member order.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod digest;
pub mod enclave;
pub mod env;
pub mod error;
pub mod keys;
pub mod keystore;
pub mod payload;
mod seal;

pub use digest::{
    DigestAlgorithm, PrivacyGroupType, address_set_digest, digest_base64, privacy_group_id,
};
pub use enclave::{CryptoEnclave, Enclave};
pub use env::{Environment, SystemEnv};
pub use error::CryptoError;
pub use keys::{KEY_SIZE, KeyPair, PrivateKey, PublicKey, base64_bytes};
pub use keystore::{FileKeyStore, KeyFiles, KeyStore, KeyStoreError, MemoryKeyStore};
pub use payload::{CombinedKey, EncryptedPayload};
pub use seal::{CONTENT_KEY_SIZE, NONCE_SIZE, TAG_SIZE};
