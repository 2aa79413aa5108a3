//! Sealpost Node Core
//!
//! Transport-independent node logic: typed storage views, the peer
//! directory, gossip discovery, send orchestration, receive, and privacy
//! group management.
//!
//! # Architecture
//!
//! ```text
//!              ┌───────────────────────────────┐
//!   client ───▶│          NodeService          │◀─── peer pushes
//!              └──┬──────────┬──────────────┬──┘
//!                 │          │              │
//!      DistributePayload   Receive    PrivacyGroup
//!           Manager        Manager       Manager
//!                 │          │              │
//!        ┌────────┴──┐   ┌───┴───────┐   ┌──┴─────────┐
//!        │ Enclave   │   │  Stores   │   │ PeerClient │
//!        └───────────┘   └─────┬─────┘   └────────────┘
//!                              │
//!                        KeyValueStore
//! ```
//!
//! All I/O goes through three seams: [`sealpost_crypto::Enclave`] for key
//! material, [`KeyValueStore`] for persistence and [`PeerClient`] for peer
//! calls. Production wires them to real keys, redb and HTTP; tests wire them
//! to in-memory and simulated variants.
//!
//! # Send Ordering
//!
//! A send stores the payload locally only after every remote recipient's
//! node stored its stripped copy and echoed the digest. See
//! [`DistributePayloadManager::send`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
pub mod distribute;
pub mod error;
pub mod model;
pub mod network;
pub mod privacy_groups;
mod propagation;
pub mod receive;
pub mod service;
pub mod storage;
pub mod views;

pub use distribute::{DistributePayloadManager, SendTarget};
pub use error::{ErrorCode, SealpostError};
pub use model::{PrivacyGroupPayload, PrivacyGroupState, QueryPrivacyGroupPayload};
pub use network::{
    Backoff, DiscovererState, DiscovererStatus, DiscoveryConfig, NetworkDiscovery, NetworkNodes,
    PartyInfo, PeerClient, PeerError,
};
pub use privacy_groups::PrivacyGroupManager;
pub use receive::{ReceiveManager, Received};
pub use service::{NodeService, UPCHECK_RESPONSE};
pub use storage::{ChaoticStore, KeyValueStore, MemoryStore, RedbStore, StorageError};
pub use views::{
    EncryptedPayloadStorage, PrivacyGroupStorage, QueryPrivacyGroupStorage, StorageView, Stores,
};
