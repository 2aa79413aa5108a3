//! Production node runtime.

use std::{future::Future, net::SocketAddr, sync::Arc};

use sealpost_core::{
    KeyValueStore, MemoryStore, NetworkDiscovery, NetworkNodes, NodeService, PeerClient, RedbStore,
};
use sealpost_crypto::{CryptoEnclave, FileKeyStore, KeyStore, SystemEnv};
use tokio::net::TcpListener;

use crate::{HttpPeerClient, NodeConfig, ServerError, StorageConfig, router};

/// A bound node, ready to serve.
pub struct Node {
    config: NodeConfig,
    listener: TcpListener,
    service: Arc<NodeService>,
    nodes: Arc<NetworkNodes>,
    client: Arc<dyn PeerClient>,
}

impl Node {
    /// Load keys, open storage and bind the listener.
    pub async fn bind(mut config: NodeConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        if config.node_url.is_empty() {
            config.node_url = format!("http://{local_addr}");
        }

        let keystore = Arc::new(FileKeyStore::open(&config.key_files, &config.always_send_to)?);
        if config.key_files.is_empty() {
            let public = keystore.generate_ephemeral_key();
            tracing::warn!(public_key = %public, "No key files configured, using an ephemeral key");
        }
        let keys = keystore.node_keys().len();
        let enclave = Arc::new(CryptoEnclave::new(keystore, SystemEnv::new()));

        let store: Arc<dyn KeyValueStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemoryStore::new()),
            StorageConfig::Redb(path) => Arc::new(RedbStore::open(path)?),
        };

        let nodes = Arc::new(NetworkNodes::with_bootnodes(&config.node_url, &config.bootnodes));
        let client: Arc<dyn PeerClient> = Arc::new(HttpPeerClient::new(config.peer_timeout)?);
        let service =
            Arc::new(NodeService::new(enclave, store, Arc::clone(&nodes), Arc::clone(&client)));

        tracing::info!(
            address = %local_addr,
            url = %config.node_url,
            keys,
            bootnodes = config.bootnodes.len(),
            "Node bound"
        );

        Ok(Self { config, listener, service, nodes, client })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// URL this node advertises to peers.
    pub fn url(&self) -> &str {
        &self.config.node_url
    }

    /// Operations this node serves.
    pub fn service(&self) -> &Arc<NodeService> {
        &self.service
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
        })
        .await
    }

    /// Serve and discover peers until `shutdown` resolves.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let discovery = NetworkDiscovery::start(
            Arc::clone(&self.nodes),
            Arc::clone(&self.client),
            SystemEnv::new(),
            self.config.discovery,
        );

        tracing::info!(url = %self.config.node_url, "Node serving");
        let served = axum::serve(self.listener, router(self.service))
            .with_graceful_shutdown(shutdown)
            .await;

        discovery.shutdown().await;
        tracing::info!("Node stopped");

        served.map_err(ServerError::from)
    }
}
