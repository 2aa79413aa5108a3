//! Simulated node clusters.
//!
//! A [`SimCluster`] owns one [`SimNetwork`] and any number of nodes wired
//! to it. Directory convergence can be driven two ways: [`SimCluster::gossip`]
//! runs synchronous exchange rounds until nothing changes, and
//! [`SimCluster::start_discovery`] runs the real timer-driven discovery
//! actors (pair with tokio's paused clock for deterministic timing).

use std::sync::Arc;

use sealpost_core::{
    DiscoveryConfig, KeyValueStore, MemoryStore, NetworkDiscovery, NetworkNodes, NodeService,
    PeerClient,
};
use sealpost_crypto::{CryptoEnclave, Enclave, MemoryKeyStore, PublicKey};

use crate::{SimEnv, SimNetwork};

/// One simulated node.
pub struct SimNode {
    /// Advertised URL
    pub url: String,
    /// Keys this node hosts, in node-key order
    pub keys: Vec<PublicKey>,
    /// Key material
    pub keystore: Arc<MemoryKeyStore<SimEnv>>,
    /// Node operations
    pub service: Arc<NodeService>,
    discovery: Option<NetworkDiscovery>,
}

impl SimNode {
    /// First node key, the default sender and identity.
    pub fn key(&self) -> PublicKey {
        self.keys[0]
    }

    /// Running discovery actor, if started.
    pub fn discovery(&self) -> Option<&NetworkDiscovery> {
        self.discovery.as_ref()
    }
}

/// A set of nodes sharing one simulated network and RNG stream.
pub struct SimCluster {
    env: SimEnv,
    network: Arc<SimNetwork>,
    nodes: Vec<SimNode>,
}

impl SimCluster {
    /// Empty cluster whose randomness derives from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            env: SimEnv::with_seed(seed),
            network: Arc::new(SimNetwork::new()),
            nodes: Vec::new(),
        }
    }

    /// Add a node with `key_count` keys and in-memory storage.
    ///
    /// Returns the node's index.
    pub fn add_node(&mut self, url: &str, key_count: usize, bootnodes: &[&str]) -> usize {
        self.add_node_with_store(url, key_count, bootnodes, Arc::new(MemoryStore::new()))
    }

    /// Add a node over a caller-provided store (durable or chaotic).
    pub fn add_node_with_store(
        &mut self,
        url: &str,
        key_count: usize,
        bootnodes: &[&str],
        store: Arc<dyn KeyValueStore>,
    ) -> usize {
        let keystore = Arc::new(MemoryKeyStore::with_env(self.env.clone()));
        let keys: Vec<PublicKey> =
            (0..key_count).map(|_| keystore.generate_node_key().public).collect();

        let enclave: Arc<dyn Enclave> =
            Arc::new(CryptoEnclave::new(Arc::clone(&keystore), self.env.clone()));
        let bootnodes: Vec<String> = bootnodes.iter().map(ToString::to_string).collect();
        let directory = Arc::new(NetworkNodes::with_bootnodes(url, &bootnodes));
        let client: Arc<dyn PeerClient> = self.network.clone();

        let service = Arc::new(NodeService::new(enclave, store, directory, client));
        self.network.register(url, &service);

        self.nodes.push(SimNode { url: url.to_string(), keys, keystore, service, discovery: None });
        self.nodes.len() - 1
    }

    /// Node by index.
    pub fn node(&self, index: usize) -> &SimNode {
        &self.nodes[index]
    }

    /// Every node, in insertion order.
    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// The shared network, for fault injection and call counts.
    pub fn network(&self) -> &Arc<SimNetwork> {
        &self.network
    }

    /// The shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Exchange directories along every known URL until a full round
    /// teaches no node anything. Returns the number of rounds run.
    pub async fn gossip(&self) -> usize {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let before = self.directory_size();

            for node in &self.nodes {
                let directory = node.service.nodes();
                for url in directory.node_urls() {
                    if url == node.url {
                        continue;
                    }
                    if let Ok(answer) = self.network.party_info(&url, &directory.snapshot()).await {
                        directory.merge(&answer);
                    }
                }
            }

            if self.directory_size() == before {
                tracing::debug!(rounds, "Directories converged");
                return rounds;
            }
        }
    }

    /// Total entries across every directory. Directories only grow, so an
    /// unchanged total means nothing was learned.
    fn directory_size(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.service.nodes().key_count() + node.service.nodes().node_urls().len())
            .sum()
    }

    /// Start a discovery actor on every node.
    pub fn start_discovery(&mut self, config: DiscoveryConfig) {
        for node in &mut self.nodes {
            if node.discovery.is_some() {
                continue;
            }
            let client: Arc<dyn PeerClient> = self.network.clone();
            node.discovery = Some(NetworkDiscovery::start(
                Arc::clone(node.service.nodes()),
                client,
                self.env.clone(),
                config,
            ));
        }
    }

    /// True if every node knows the hosting node of every key in the
    /// cluster.
    pub fn converged(&self) -> bool {
        self.nodes.iter().all(|node| {
            let directory = node.service.nodes();
            self.nodes.iter().all(|peer| {
                peer.keys.iter().all(|key| {
                    directory.url_for_recipient(key).as_deref() == Some(peer.url.as_str())
                })
            })
        })
    }

    /// Stop every discovery actor.
    pub async fn shutdown(&mut self) {
        for node in &mut self.nodes {
            if let Some(discovery) = node.discovery.take() {
                discovery.shutdown().await;
            }
        }
    }
}
