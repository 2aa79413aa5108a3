//! In-process peer network.
//!
//! [`SimNetwork`] implements [`PeerClient`] by dispatching straight into the
//! target node's [`NodeService`]. Every call round-trips its body through
//! JSON, so a peer sees exactly what it would see over HTTP (no key owners,
//! no shared allocations).
//!
//! Faults are per target URL and apply until healed.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use async_trait::async_trait;
use sealpost_core::{NodeService, PartyInfo, PeerClient, PeerError, PrivacyGroupPayload};
use sealpost_crypto::EncryptedPayload;
use serde::{Serialize, de::DeserializeOwned};

/// Fault injected on calls to one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Calls fail as if the peer were unreachable
    Partitioned,
    /// Calls are answered with this status
    Status(u16),
    /// Pushes are stored but answered with a different digest
    TamperedEcho,
}

/// Counters of calls delivered to one URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `/partyinfo` exchanges
    pub party_info: usize,
    /// `/push` calls
    pub push: usize,
    /// `/pushPrivacyGroup` calls
    pub push_privacy_group: usize,
}

/// Routes peer calls between in-process nodes.
#[derive(Default)]
pub struct SimNetwork {
    nodes: Mutex<HashMap<String, Weak<NodeService>>>,
    faults: Mutex<HashMap<String, Fault>>,
    calls: Mutex<HashMap<String, CallCounts>>,
}

impl SimNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `service` reachable at `url`.
    pub fn register(&self, url: &str, service: &Arc<NodeService>) {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Arc::downgrade(service));
    }

    /// Inject `fault` on every later call to `url`.
    pub fn inject(&self, url: &str, fault: Fault) {
        tracing::debug!(url = %url, fault = ?fault, "Injecting fault");
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).insert(url.to_string(), fault);
    }

    /// Remove any fault on `url`.
    pub fn heal(&self, url: &str) {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).remove(url);
    }

    /// Calls delivered to `url` so far, faulted ones included.
    pub fn calls_to(&self, url: &str) -> CallCounts {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    fn fault(&self, url: &str) -> Option<Fault> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).get(url).cloned()
    }

    fn record(&self, url: &str, count: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        count(calls.entry(url.to_string()).or_default());
    }

    /// Service at `url`, unless the call is faulted before delivery.
    fn route(&self, url: &str) -> Result<Arc<NodeService>, PeerError> {
        match self.fault(url) {
            Some(Fault::Partitioned) => {
                return Err(PeerError::Transport(format!("{url} is partitioned")));
            },
            Some(Fault::Status(status)) => return Err(PeerError::Status(status)),
            Some(Fault::TamperedEcho) | None => {},
        }

        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .and_then(Weak::upgrade)
            .ok_or_else(|| PeerError::Transport(format!("no node listening at {url}")))
    }

    fn echo(&self, url: &str, echo: String) -> String {
        if self.fault(url) == Some(Fault::TamperedEcho) {
            return format!("{echo}-tampered");
        }
        echo
    }
}

/// Serialize and decode `value` the way the HTTP layer would.
fn over_the_wire<T: Serialize + DeserializeOwned>(value: &T) -> Result<T, PeerError> {
    let body = serde_json::to_vec(value).map_err(|e| PeerError::Decode(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| PeerError::Decode(e.to_string()))
}

#[async_trait]
impl PeerClient for SimNetwork {
    async fn party_info(&self, url: &str, local: &PartyInfo) -> Result<PartyInfo, PeerError> {
        self.record(url, |calls| calls.party_info += 1);
        let service = self.route(url)?;

        let (answer, _) = service.party_info(&over_the_wire(local)?);
        over_the_wire(&answer)
    }

    async fn push(&self, url: &str, payload: &EncryptedPayload) -> Result<String, PeerError> {
        self.record(url, |calls| calls.push += 1);
        let service = self.route(url)?;

        match service.push(&over_the_wire(payload)?).await {
            Ok(digest) => Ok(self.echo(url, digest)),
            Err(e) => Err(PeerError::Status(e.code().http_status())),
        }
    }

    async fn push_privacy_group(
        &self,
        url: &str,
        group: &PrivacyGroupPayload,
    ) -> Result<String, PeerError> {
        self.record(url, |calls| calls.push_privacy_group += 1);
        let service = self.route(url)?;

        match service.push_privacy_group(&over_the_wire(group)?).await {
            Ok(id) => Ok(self.echo(url, id)),
            Err(e) => Err(PeerError::Status(e.code().http_status())),
        }
    }
}
