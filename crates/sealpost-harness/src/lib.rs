//! Deterministic simulation harness for Sealpost node clusters.
//!
//! Nodes run their real [`sealpost_core::NodeService`] and
//! [`sealpost_crypto::CryptoEnclave`]; only the edges are simulated:
//!
//! - [`SimEnv`]: seeded `ChaCha8` randomness and tokio's clock, so key
//!   generation, nonces and discovery timing replay exactly
//! - [`SimNetwork`]: in-process peer calls with JSON round-trips and
//!   per-URL fault injection (partition, error status, tampered echo)
//! - [`SimCluster`]: builds nodes, drives gossip, starts discovery
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() {
//! use sealpost_harness::SimCluster;
//!
//! let mut cluster = SimCluster::new(42);
//! let n1 = cluster.add_node("http://n1", 1, &[]);
//! let n2 = cluster.add_node("http://n2", 1, &["http://n1"]);
//! cluster.gossip().await;
//! assert!(cluster.converged());
//! # let _ = (n1, n2);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod sim_env;
pub mod sim_network;

pub use cluster::{SimCluster, SimNode};
pub use sim_env::SimEnv;
pub use sim_network::{CallCounts, Fault, SimNetwork};
