//! Content encryption and content-key boxes using `XChaCha20-Poly1305`.
//!
//! A box key is the X25519 shared secret of (own private, peer public)
//! expanded with HKDF-SHA256. The exchange is symmetric, so the recipient
//! opens with (recipient private, sender public) what the sender sealed with
//! (sender private, recipient public).

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{CombinedKey, CryptoError, PrivateKey, PublicKey};

/// `XChaCha20` nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Symmetric content key size (32 bytes)
pub const CONTENT_KEY_SIZE: usize = 32;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Label used for box key derivation
const BOX_KEY_LABEL: &[u8] = b"sealpostBoxV1";

/// Validate a nonce received from the wire.
pub(crate) fn check_nonce(nonce: &[u8]) -> Result<&XNonce, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonce { expected: NONCE_SIZE, actual: nonce.len() });
    }
    Ok(XNonce::from_slice(nonce))
}

/// Encrypt `plaintext` under the content key.
pub(crate) fn seal_content(
    plaintext: &[u8],
    content_key: &[u8; CONTENT_KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(content_key.into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt content ciphertext.
///
/// # Errors
///
/// - `InvalidNonce`: nonce has the wrong length
/// - `DecryptFailed`: authentication tag or key is incorrect (tamper)
pub(crate) fn open_content(
    ciphertext: &[u8],
    content_key: &[u8; CONTENT_KEY_SIZE],
    nonce: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce = check_nonce(nonce)?;
    let cipher = XChaCha20Poly1305::new(content_key.into());

    cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::DecryptFailed)
}

fn box_key(own: &PrivateKey, peer: &PublicKey) -> [u8; 32] {
    let mut shared = own.diffie_hellman(peer);
    let hkdf = Hkdf::<Sha256>::new(None, &shared);
    shared.zeroize();

    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(BOX_KEY_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}

/// Seal the content key for `peer`.
pub(crate) fn seal_key(
    content_key: &[u8; CONTENT_KEY_SIZE],
    own: &PrivateKey,
    peer: &PublicKey,
    nonce: &[u8; NONCE_SIZE],
) -> CombinedKey {
    let mut key = box_key(own, peer);
    let encoded = seal_content(content_key, &key, nonce);
    key.zeroize();

    CombinedKey { encoded }
}

/// Try to open a combined key. `None` if it was not sealed for this pair.
pub(crate) fn open_key(
    combined: &CombinedKey,
    own: &PrivateKey,
    peer: &PublicKey,
    nonce: &XNonce,
) -> Option<[u8; CONTENT_KEY_SIZE]> {
    let mut key = box_key(own, peer);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let mut opened = cipher.decrypt(nonce, combined.encoded.as_slice()).ok()?;
    let content_key: Option<[u8; CONTENT_KEY_SIZE]> = opened.as_slice().try_into().ok();
    opened.zeroize();

    content_key
}
