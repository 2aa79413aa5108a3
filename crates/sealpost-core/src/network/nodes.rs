//! Peer directory.
//!
//! Maps participant keys to the URL of the node hosting them. Grows for the
//! life of the process: entries are only ever added. A key that already has
//! a URL keeps it, so a peer cannot redirect a known identity by gossiping a
//! different mapping.

use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use dashmap::{DashMap, mapref::entry::Entry};
use sealpost_crypto::PublicKey;
use serde::{Deserialize, Serialize};

/// Serialized directory snapshot exchanged by `/partyinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInfo {
    /// URL of the node that produced the snapshot
    pub url: String,
    /// Every node URL it knows, in discovery order
    #[serde(rename = "nodeURLs")]
    pub node_urls: Vec<String>,
    /// Key to hosting node URL
    #[serde(rename = "nodePKs")]
    pub node_pks: BTreeMap<PublicKey, String>,
}

/// Concurrent peer directory.
///
/// Reads and writes need no external lock; there is no transactional view
/// across calls.
#[derive(Debug)]
pub struct NetworkNodes {
    url: String,
    node_urls: Mutex<Vec<String>>,
    node_pks: DashMap<PublicKey, String>,
}

impl NetworkNodes {
    /// Directory advertising this node at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self { node_urls: Mutex::new(vec![url.clone()]), url, node_pks: DashMap::new() }
    }

    /// Directory seeded with bootnode URLs.
    pub fn with_bootnodes(url: impl Into<String>, bootnodes: &[String]) -> Self {
        let nodes = Self::new(url);
        for bootnode in bootnodes {
            nodes.add_node_url(bootnode);
        }
        nodes
    }

    /// URL this node advertises.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Record that `url` hosts `key`. Returns true if anything was learned.
    ///
    /// An existing mapping for `key` is never replaced.
    pub fn add_node(&self, key: PublicKey, url: &str) -> bool {
        let mapped = match self.node_pks.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(url.to_string());
                true
            },
        };
        let listed = self.add_node_url(url);
        mapped || listed
    }

    /// Record a node URL. Returns true if it was new.
    pub fn add_node_url(&self, url: &str) -> bool {
        let mut urls = self.node_urls.lock().unwrap_or_else(PoisonError::into_inner);
        if urls.iter().any(|known| known == url) {
            return false;
        }
        urls.push(url.to_string());
        true
    }

    /// Hosting node of `key`, if known.
    pub fn url_for_recipient(&self, key: &PublicKey) -> Option<String> {
        self.node_pks.get(key).map(|entry| entry.value().clone())
    }

    /// Every known node URL, this node's included, in discovery order.
    pub fn node_urls(&self) -> Vec<String> {
        self.node_urls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of keys with a known hosting node.
    pub fn key_count(&self) -> usize {
        self.node_pks.len()
    }

    /// Snapshot for gossip.
    pub fn snapshot(&self) -> PartyInfo {
        PartyInfo {
            url: self.url.clone(),
            node_urls: self.node_urls(),
            node_pks: self
                .node_pks
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }

    /// Learn everything in `other` that is not known yet.
    ///
    /// Idempotent. Returns true if anything new was learned.
    pub fn merge(&self, other: &PartyInfo) -> bool {
        let mut changed = false;

        if !other.url.is_empty() {
            changed |= self.add_node_url(&other.url);
        }
        for url in &other.node_urls {
            changed |= self.add_node_url(url);
        }
        for (key, url) in &other.node_pks {
            changed |= self.add_node(*key, url);
        }

        changed
    }
}
