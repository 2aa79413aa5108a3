//! One-way digests and privacy group identity derivation.
//!
//! Every digest that leaves this module is standard base64, the form used as
//! a storage key and echoed by peers when acknowledging a push.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512, Sha512_256};

use crate::PublicKey;

/// Supported hash functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-512 truncated to 256 bits. Used for storage keys.
    Sha512_256,
    /// SHA-512
    Sha512,
}

/// Hash `bytes` with `algorithm`.
pub fn digest(algorithm: DigestAlgorithm, bytes: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
        DigestAlgorithm::Sha512_256 => Sha512_256::digest(bytes).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(bytes).to_vec(),
    }
}

/// Base64 SHA-512/256 digest of `bytes`.
pub fn digest_base64(bytes: &[u8]) -> String {
    STANDARD.encode(digest(DigestAlgorithm::Sha512_256, bytes))
}

/// How a privacy group came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivacyGroupType {
    /// Implicitly created from a flat recipient list on send.
    Legacy,
    /// Created explicitly and referenced by id afterwards.
    Explicit,
}

impl PrivacyGroupType {
    /// Byte mixed into the group id so both kinds never collide.
    fn discriminant(self) -> u8 {
        match self {
            Self::Legacy => 0x01,
            Self::Explicit => 0x02,
        }
    }
}

/// Address bytes sorted and deduplicated, so order and repetition never
/// change a digest.
fn canonical_addresses(addresses: &[PublicKey]) -> Vec<PublicKey> {
    let mut sorted = addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Deterministic privacy group id over (addresses, seed, type).
///
/// Invariant under permutation and duplication of `addresses`.
pub fn privacy_group_id(
    addresses: &[PublicKey],
    seed: Option<&[u8]>,
    group_type: PrivacyGroupType,
) -> String {
    let canonical = canonical_addresses(addresses);
    let seed = seed.unwrap_or_default();

    let mut input = Vec::with_capacity(canonical.len() * 32 + seed.len() + 1);
    for address in &canonical {
        input.extend_from_slice(address.as_bytes());
    }
    input.extend_from_slice(seed);
    input.push(group_type.discriminant());

    digest_base64(&input)
}

/// Seed-independent digest over an address set.
///
/// Keys the query index so repeated sends to the same recipients find the
/// groups already created for them.
pub fn address_set_digest(addresses: &[PublicKey]) -> String {
    let canonical = canonical_addresses(addresses);

    let mut input = Vec::with_capacity(canonical.len() * 32);
    for address in &canonical {
        input.extend_from_slice(address.as_bytes());
    }

    digest_base64(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from([byte; 32])
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(digest(DigestAlgorithm::Sha256, b"abc").len(), 32);
        assert_eq!(digest(DigestAlgorithm::Sha512_256, b"abc").len(), 32);
        assert_eq!(digest(DigestAlgorithm::Sha512, b"abc").len(), 64);
    }

    #[test]
    fn sha256_known_vector() {
        let out = digest(DigestAlgorithm::Sha256, b"abc");
        assert_eq!(out[..4], [0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn group_id_ignores_order_and_duplicates() {
        let a = privacy_group_id(&[key(1), key(2), key(3)], Some(b"seed"), PrivacyGroupType::Legacy);
        let b = privacy_group_id(&[key(3), key(1), key(2), key(1)], Some(b"seed"), PrivacyGroupType::Legacy);
        assert_eq!(a, b);
    }

    #[test]
    fn group_id_depends_on_seed_and_type() {
        let members = [key(1), key(2)];
        let base = privacy_group_id(&members, Some(b"seed"), PrivacyGroupType::Legacy);

        assert_ne!(base, privacy_group_id(&members, Some(b"other"), PrivacyGroupType::Legacy));
        assert_ne!(base, privacy_group_id(&members, Some(b"seed"), PrivacyGroupType::Explicit));
        assert_ne!(base, privacy_group_id(&members, None, PrivacyGroupType::Legacy));
    }

    #[test]
    fn address_set_digest_is_seed_free() {
        let members = [key(4), key(5)];
        assert_eq!(address_set_digest(&members), address_set_digest(&[key(5), key(4)]));
        assert_ne!(
            address_set_digest(&members),
            privacy_group_id(&members, None, PrivacyGroupType::Legacy)
        );
    }

    #[test]
    fn group_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&PrivacyGroupType::Legacy).unwrap(), "\"LEGACY\"");
        assert_eq!(serde_json::to_string(&PrivacyGroupType::Explicit).unwrap(), "\"EXPLICIT\"");
    }
}
