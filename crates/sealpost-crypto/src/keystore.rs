//! Private key lookup and generation.
//!
//! The enclave never touches key material except through [`KeyStore`].
//! [`MemoryKeyStore`] holds keys for tests and ephemeral nodes;
//! [`FileKeyStore`] loads and writes base64 key files.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use thiserror::Error;

use crate::{CryptoError, Environment, KeyPair, PrivateKey, PublicKey, SystemEnv};

/// Errors from loading or generating keys.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Reading or writing a key file failed.
    #[error("key file {}: {reason}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error message
        reason: String,
    },

    /// A key file does not hold a valid key.
    #[error("key file {}: {source}", .path.display())]
    Decode {
        /// File involved
        path: PathBuf,
        /// Decoding failure
        source: CryptoError,
    },

    /// A public key file does not match its private key file.
    #[error("public key {} does not match its private key", .path.display())]
    KeyMismatch {
        /// Public key file
        path: PathBuf,
    },

    /// Password-protected key files are not supported.
    #[error("password-protected key files are not supported")]
    PasswordUnsupported,
}

/// Source of the node's key material.
pub trait KeyStore: Send + Sync + 'static {
    /// Private key for `public`, if this node holds it.
    fn private_key_for(&self, public: &PublicKey) -> Option<PrivateKey>;

    /// Generate a fresh key pair and hold it.
    ///
    /// File-backed stores persist it at `base_path` (`.pub` and `.key`).
    fn generate_key_pair(
        &self,
        base_path: &Path,
        password: Option<&str>,
    ) -> Result<PublicKey, KeyStoreError>;

    /// Keys this node advertises as its own, in configuration order.
    fn node_keys(&self) -> Vec<PublicKey>;

    /// Keys that receive a copy of every payload this node sends.
    fn always_send_to(&self) -> Vec<PublicKey>;
}

#[derive(Default)]
struct KeyStoreInner {
    keys: HashMap<PublicKey, PrivateKey>,
    node_keys: Vec<PublicKey>,
    always_send_to: Vec<PublicKey>,
}

/// In-memory key store.
///
/// Generated keys are held but not persisted.
pub struct MemoryKeyStore<E: Environment = SystemEnv> {
    env: E,
    inner: RwLock<KeyStoreInner>,
}

impl MemoryKeyStore<SystemEnv> {
    /// Empty store using OS randomness.
    pub fn new() -> Self {
        Self::with_env(SystemEnv::new())
    }
}

impl Default for MemoryKeyStore<SystemEnv> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> MemoryKeyStore<E> {
    /// Empty store drawing randomness from `env`.
    pub fn with_env(env: E) -> Self {
        Self { env, inner: RwLock::new(KeyStoreInner::default()) }
    }

    /// Add a key pair as one of this node's own keys.
    pub fn add_node_key(&self, pair: KeyPair) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.node_keys.contains(&pair.public) {
            inner.node_keys.push(pair.public);
        }
        inner.keys.insert(pair.public, pair.private);
    }

    /// Add a key that every send also encrypts for.
    pub fn add_always_send_to(&self, public: PublicKey) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.always_send_to.contains(&public) {
            inner.always_send_to.push(public);
        }
    }

    /// Generate a key pair, register it as a node key and return it.
    pub fn generate_node_key(&self) -> KeyPair {
        let pair = self.random_pair();
        self.add_node_key(pair.clone());
        pair
    }

    fn random_pair(&self) -> KeyPair {
        let bytes = self.env.random_key();
        KeyPair::from_private(PrivateKey::from(bytes))
    }

    fn hold(&self, pair: KeyPair) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.keys.insert(pair.public, pair.private);
    }
}

impl<E: Environment> KeyStore for MemoryKeyStore<E> {
    fn private_key_for(&self, public: &PublicKey) -> Option<PrivateKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.keys.get(public).cloned()
    }

    fn generate_key_pair(
        &self,
        _base_path: &Path,
        password: Option<&str>,
    ) -> Result<PublicKey, KeyStoreError> {
        if password.is_some() {
            return Err(KeyStoreError::PasswordUnsupported);
        }

        let pair = self.random_pair();
        let public = pair.public;
        self.hold(pair);
        Ok(public)
    }

    fn node_keys(&self) -> Vec<PublicKey> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).node_keys.clone()
    }

    fn always_send_to(&self) -> Vec<PublicKey> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).always_send_to.clone()
    }
}

/// Paths of one configured key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    /// File holding the base64 public key
    pub public: PathBuf,
    /// File holding the base64 private key
    pub private: PathBuf,
}

impl KeyFiles {
    /// `<base>.pub` and `<base>.key`.
    pub fn from_base_path(base: &Path) -> Self {
        Self { public: base.with_extension("pub"), private: base.with_extension("key") }
    }
}

/// Key store backed by base64 key files.
pub struct FileKeyStore<E: Environment = SystemEnv> {
    memory: MemoryKeyStore<E>,
}

impl FileKeyStore<SystemEnv> {
    /// Load the node's key pairs and always-send-to public keys.
    pub fn open(node_keys: &[KeyFiles], always_send_to: &[PathBuf]) -> Result<Self, KeyStoreError> {
        Self::open_with_env(SystemEnv::new(), node_keys, always_send_to)
    }
}

impl<E: Environment> FileKeyStore<E> {
    /// Load key files, drawing randomness for generated keys from `env`.
    pub fn open_with_env(
        env: E,
        node_keys: &[KeyFiles],
        always_send_to: &[PathBuf],
    ) -> Result<Self, KeyStoreError> {
        let memory = MemoryKeyStore::with_env(env);

        for files in node_keys {
            let public = read_public(&files.public)?;
            let private = read_key_file(&files.private, PrivateKey::from_base64)?;

            if private.public_key() != public {
                return Err(KeyStoreError::KeyMismatch { path: files.public.clone() });
            }

            memory.add_node_key(KeyPair { public, private });
        }

        for path in always_send_to {
            memory.add_always_send_to(read_public(path)?);
        }

        tracing::debug!(
            node_keys = node_keys.len(),
            always_send_to = always_send_to.len(),
            "Loaded key files"
        );

        Ok(Self { memory })
    }

    /// Add a node key that lives only in memory.
    ///
    /// Used when no key files are configured.
    pub fn generate_ephemeral_key(&self) -> PublicKey {
        self.memory.generate_node_key().public
    }
}

impl<E: Environment> KeyStore for FileKeyStore<E> {
    fn private_key_for(&self, public: &PublicKey) -> Option<PrivateKey> {
        self.memory.private_key_for(public)
    }

    fn generate_key_pair(
        &self,
        base_path: &Path,
        password: Option<&str>,
    ) -> Result<PublicKey, KeyStoreError> {
        if password.is_some() {
            return Err(KeyStoreError::PasswordUnsupported);
        }

        let pair = self.memory.random_pair();
        let files = KeyFiles::from_base_path(base_path);
        write_key_file(&files.public, &pair.public.to_base64())?;
        write_key_file(&files.private, &pair.private.to_base64())?;

        let public = pair.public;
        self.memory.hold(pair);
        tracing::info!(public_key = %public, path = %files.public.display(), "Generated key pair");

        Ok(public)
    }

    fn node_keys(&self) -> Vec<PublicKey> {
        self.memory.node_keys()
    }

    fn always_send_to(&self) -> Vec<PublicKey> {
        self.memory.always_send_to()
    }
}

fn read_public(path: &Path) -> Result<PublicKey, KeyStoreError> {
    read_key_file(path, PublicKey::from_base64)
}

fn read_key_file<T>(
    path: &Path,
    decode: impl FnOnce(&str) -> Result<T, CryptoError>,
) -> Result<T, KeyStoreError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| KeyStoreError::Io { path: path.to_path_buf(), reason: e.to_string() })?;
    decode(&contents).map_err(|source| KeyStoreError::Decode { path: path.to_path_buf(), source })
}

fn write_key_file(path: &Path, contents: &str) -> Result<(), KeyStoreError> {
    fs::write(path, contents)
        .map_err(|e| KeyStoreError::Io { path: path.to_path_buf(), reason: e.to_string() })
}
