//! Peer directory, outbound peer calls and gossip discovery.

mod client;
mod discovery;
mod nodes;

pub use client::{PeerClient, PeerError};
pub use discovery::{
    Backoff, DiscovererState, DiscovererStatus, DiscoveryConfig, NetworkDiscovery,
};
pub use nodes::{NetworkNodes, PartyInfo};
