//! Sealpost node server.
//!
//! Production glue around [`sealpost_core`]: an axum HTTP API that
//! dispatches into [`NodeService`](sealpost_core::NodeService), a reqwest
//! [`HttpPeerClient`] for outbound peer calls, and the [`Node`] runtime that
//! wires keys, storage and discovery together.
//!
//! # Components
//!
//! - [`router`]: every endpoint, with errors rendered as `{"error": code}`
//! - [`HttpPeerClient`]: `/partyinfo`, `/push` and `/pushPrivacyGroup` calls
//! - [`Node`]: binds, serves and runs discovery until shutdown
//! - [`NodeConfig`]: runtime configuration populated by the binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod node;
mod routes;

pub use client::HttpPeerClient;
pub use config::{NodeConfig, StorageConfig};
pub use error::ServerError;
pub use node::Node;
pub use routes::{ApiError, router};
