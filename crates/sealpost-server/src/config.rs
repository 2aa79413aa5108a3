//! Node runtime configuration.

use std::{path::PathBuf, str::FromStr, time::Duration};

use sealpost_core::DiscoveryConfig;
use sealpost_crypto::KeyFiles;

use crate::ServerError;

/// Where a node keeps its payloads and groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageConfig {
    /// In-process map, lost on restart
    #[default]
    Memory,
    /// redb database file
    Redb(PathBuf),
}

impl FromStr for StorageConfig {
    type Err = ServerError;

    /// `memory` or `redb:<path>`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if spec == "memory" {
            return Ok(Self::Memory);
        }
        match spec.strip_prefix("redb:") {
            Some(path) if !path.is_empty() => Ok(Self::Redb(PathBuf::from(path))),
            Some(_) => Err(ServerError::Config("redb storage needs a path".to_string())),
            None => Err(ServerError::Config(format!("unknown storage kind: {spec}"))),
        }
    }
}

/// Configuration for one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address to listen on (e.g. "0.0.0.0:9000")
    pub bind_address: String,
    /// URL peers reach this node at; derived from the bound address if
    /// empty
    pub node_url: String,
    /// Peer URLs to start discovery from
    pub bootnodes: Vec<String>,
    /// Storage backend
    pub storage: StorageConfig,
    /// This node's key pairs; one ephemeral key is generated if empty
    pub key_files: Vec<KeyFiles>,
    /// Public key files of keys every send also encrypts for
    pub always_send_to: Vec<PathBuf>,
    /// Discovery timing
    pub discovery: DiscoveryConfig,
    /// Timeout of each outbound peer call
    pub peer_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9000".to_string(),
            node_url: String::new(),
            bootnodes: Vec::new(),
            storage: StorageConfig::Memory,
            key_files: Vec::new(),
            always_send_to: Vec::new(),
            discovery: DiscoveryConfig::default(),
            peer_timeout: Duration::from_secs(2),
        }
    }
}

impl NodeConfig {
    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        let DiscoveryConfig { base_delay, max_delay } = self.discovery;
        if base_delay.is_zero() {
            return Err(ServerError::Config("discovery base delay must be positive".to_string()));
        }
        if max_delay < base_delay {
            return Err(ServerError::Config(format!(
                "discovery max delay {max_delay:?} is below the base delay {base_delay:?}"
            )));
        }
        if self.peer_timeout.is_zero() {
            return Err(ServerError::Config("peer timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_spec_parsing() {
        assert_eq!("memory".parse::<StorageConfig>().unwrap(), StorageConfig::Memory);
        assert_eq!(
            "redb:/var/lib/sealpost.redb".parse::<StorageConfig>().unwrap(),
            StorageConfig::Redb(PathBuf::from("/var/lib/sealpost.redb"))
        );
        assert!("redb:".parse::<StorageConfig>().is_err());
        assert!("sqlite:x".parse::<StorageConfig>().is_err());
    }

    #[test]
    fn defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.peer_timeout, Duration::from_secs(2));
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.discovery.base_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn discovery_delays_are_validated() {
        let zero_base = NodeConfig {
            discovery: DiscoveryConfig {
                base_delay: Duration::ZERO,
                max_delay: Duration::from_secs(1),
            },
            ..NodeConfig::default()
        };
        assert!(matches!(zero_base.validate(), Err(ServerError::Config(_))));

        let inverted = NodeConfig {
            discovery: DiscoveryConfig {
                base_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(1),
            },
            ..NodeConfig::default()
        };
        assert!(matches!(inverted.validate(), Err(ServerError::Config(_))));

        let zero_timeout = NodeConfig { peer_timeout: Duration::ZERO, ..NodeConfig::default() };
        assert!(matches!(zero_timeout.validate(), Err(ServerError::Config(_))));
    }
}
