//! Sealpost node binary.
//!
//! # Usage
//!
//! ```bash
//! # Write a key pair to node.pub / node.key
//! sealpost-node generate-keys node
//!
//! # Start a node that knows one peer
//! sealpost-node --bind 0.0.0.0:9000 --node-url http://10.0.0.1:9000 \
//!     --public-key node.pub --private-key node.key \
//!     --bootnode http://10.0.0.2:9000 --storage redb:/var/lib/sealpost.redb
//! ```

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use sealpost_core::DiscoveryConfig;
use sealpost_crypto::{FileKeyStore, KeyFiles, KeyStore};
use sealpost_server::{Node, NodeConfig, ServerError, StorageConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealpost private payload node
#[derive(Parser, Debug)]
#[command(name = "sealpost-node")]
#[command(about = "Encrypts, distributes and stores private payloads")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    bind: String,

    /// URL peers reach this node at (default: derived from the bound address)
    #[arg(long, default_value = "")]
    node_url: String,

    /// Peer URL to start discovery from (repeatable)
    #[arg(long = "bootnode")]
    bootnodes: Vec<String>,

    /// Storage backend: `memory` or `redb:<path>`
    #[arg(long, default_value = "memory")]
    storage: StorageConfig,

    /// Public key file of a node key pair (repeatable, paired with --private-key)
    #[arg(long = "public-key")]
    public_keys: Vec<PathBuf>,

    /// Private key file of a node key pair (repeatable, paired with --public-key)
    #[arg(long = "private-key")]
    private_keys: Vec<PathBuf>,

    /// Public key file copied on every send (repeatable)
    #[arg(long = "always-send-to")]
    always_send_to: Vec<PathBuf>,

    /// First discovery delay in milliseconds
    #[arg(long, default_value = "1000")]
    discovery_base_delay_ms: u64,

    /// Discovery backoff ceiling in milliseconds
    #[arg(long, default_value = "60000")]
    discovery_max_delay_ms: u64,

    /// Timeout of each outbound peer call in milliseconds
    #[arg(long, default_value = "2000")]
    peer_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new key pair to `<base_path>.pub` and `<base_path>.key`
    GenerateKeys {
        /// Path prefix of the key files
        base_path: PathBuf,
    },
}

impl Args {
    fn into_config(self) -> Result<NodeConfig, ServerError> {
        if self.public_keys.len() != self.private_keys.len() {
            return Err(ServerError::Config(format!(
                "{} public key files but {} private key files",
                self.public_keys.len(),
                self.private_keys.len()
            )));
        }
        let key_files = self
            .public_keys
            .into_iter()
            .zip(self.private_keys)
            .map(|(public, private)| KeyFiles { public, private })
            .collect();

        let config = NodeConfig {
            bind_address: self.bind,
            node_url: self.node_url,
            bootnodes: self.bootnodes,
            storage: self.storage,
            key_files,
            always_send_to: self.always_send_to,
            discovery: DiscoveryConfig {
                base_delay: Duration::from_millis(self.discovery_base_delay_ms),
                max_delay: Duration::from_millis(self.discovery_max_delay_ms),
            },
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if let Some(Command::GenerateKeys { base_path }) = &args.command {
        let store = FileKeyStore::open(&[], &[])?;
        let public = store.generate_key_pair(base_path, None)?;
        tracing::info!(public_key = %public, "Key pair written");
        return Ok(());
    }

    tracing::info!("Sealpost node starting");

    let node = Node::bind(args.into_config()?).await?;

    tracing::info!("Listening on {} as {}", node.local_addr()?, node.url());

    node.run().await?;

    Ok(())
}
