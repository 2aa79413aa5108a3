//! X25519 key types.
//!
//! Keys travel as standard base64 strings on the wire and in key files.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use x25519_dalek::StaticSecret;
use zeroize::Zeroize;

use crate::CryptoError;

/// Size of X25519 public and private keys in bytes.
pub const KEY_SIZE: usize = 32;

/// X25519 public key identifying a participant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::decode_public_key(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::decode_public_key(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Standard base64 encoding.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(de::Error::custom)
    }
}

/// X25519 private key.
///
/// Zeroized on drop; `Debug` never prints the key bytes.
#[derive(Clone)]
pub struct PrivateKey([u8; KEY_SIZE]);

impl PrivateKey {
    /// Create from raw bytes.
    ///
    /// # Security
    ///
    /// Only use bytes from a secure source.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::decode_private_key(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::decode_private_key(e.to_string()))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Standard base64 encoding, for writing key files.
    ///
    /// # Security
    ///
    /// Handle with care - this exposes the private key.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }

    /// X25519 shared secret with a peer's public key.
    pub(crate) fn diffie_hellman(&self, peer: &PublicKey) -> [u8; KEY_SIZE] {
        let secret = StaticSecret::from(self.0);
        let peer = x25519_dalek::PublicKey::from(peer.0);
        secret.diffie_hellman(&peer).to_bytes()
    }
}

impl From<[u8; KEY_SIZE]> for PrivateKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A private key together with its public key.
#[derive(Clone, Debug)]
pub struct KeyPair {
    /// Public half
    pub public: PublicKey,
    /// Private half
    pub private: PrivateKey,
}

impl KeyPair {
    /// Build a key pair from a private key.
    pub fn from_private(private: PrivateKey) -> Self {
        Self { public: private.public_key(), private }
    }
}

/// Serde helper encoding byte vectors as standard base64 strings.
///
/// Use with `#[serde(with = "sealpost_crypto::base64_bytes")]`.
pub mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Encode `bytes` as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Decode a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_base64_roundtrip() {
        let key = PublicKey::from([7u8; KEY_SIZE]);
        let decoded = PublicKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        let short = STANDARD.encode([1u8; 31]);
        assert!(matches!(
            PublicKey::from_base64(&short),
            Err(CryptoError::DecodePublicKey { .. })
        ));
    }

    #[test]
    fn public_key_rejects_bad_base64() {
        assert!(matches!(
            PublicKey::from_base64("not base64 at all!"),
            Err(CryptoError::DecodePublicKey { .. })
        ));
    }

    #[test]
    fn private_key_debug_hides_bytes() {
        let key = PrivateKey::from_bytes(&[0xAB; KEY_SIZE]).unwrap();
        assert_eq!(format!("{key:?}"), "PrivateKey(..)");
    }

    #[test]
    fn diffie_hellman_is_symmetric() {
        let alice = PrivateKey::from_bytes(&[1u8; KEY_SIZE]).unwrap();
        let bob = PrivateKey::from_bytes(&[2u8; KEY_SIZE]).unwrap();

        let ab = alice.diffie_hellman(&bob.public_key());
        let ba = bob.diffie_hellman(&alice.public_key());

        assert_eq!(ab, ba);
    }

    #[test]
    fn public_key_serializes_as_base64_string() {
        let key = PublicKey::from([0u8; KEY_SIZE]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_base64()));

        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
