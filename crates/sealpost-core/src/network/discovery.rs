//! Gossip discovery.
//!
//! One actor task per [`NetworkDiscovery`] owns the discoverer set. Every
//! timer fire, exchange completion and rescan is an event on the actor's
//! channel, so discoverer-set mutation and directory merges run serially.
//!
//! Per-peer lifecycle:
//!
//! ```text
//!            timer fires              exchange done (any outcome)
//! SCHEDULED ─────────────▶ FIRING ─────────────────────────────▶ SCHEDULED
//!     │                                                    (delay doubled)
//!     └── shutdown ──▶ CANCELLED
//! ```
//!
//! The discoverer for this node's own URL rescans the local directory
//! instead of calling the network, picking up whatever inbound `/partyinfo`
//! requests merged in the meantime.

use std::{collections::HashMap, sync::Arc, time::Duration};

use sealpost_crypto::Environment;
use tokio::{
    sync::{mpsc, oneshot},
    task::{AbortHandle, JoinHandle},
};

use super::{NetworkNodes, PartyInfo, PeerClient, PeerError};

/// Discovery timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Delay before a new discoverer's first exchange
    pub base_delay: Duration,
    /// Ceiling the doubling delay never exceeds
    pub max_delay: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60) }
    }
}

/// Doubling delay with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// Smallest delay a backoff ever yields.
    pub const MIN_DELAY: Duration = Duration::from_millis(1);

    /// Backoff starting at `base`.
    ///
    /// Both bounds are at least [`Backoff::MIN_DELAY`].
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(Self::MIN_DELAY);
        Self { next: base.max(Self::MIN_DELAY).min(max), max }
    }

    /// Delay to use now; the following one is doubled up to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = delay.saturating_mul(2).min(self.max);
        delay
    }
}

/// Where a discoverer is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscovererState {
    /// Timer armed
    Scheduled,
    /// Exchange in flight
    Firing,
    /// Stopped by shutdown
    Cancelled,
}

/// Observable state of one discoverer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscovererStatus {
    /// Peer URL
    pub url: String,
    /// Current state
    pub state: DiscovererState,
    /// Delay of the most recently armed timer
    pub delay: Duration,
    /// Number of completed ticks
    pub ticks: u64,
    /// True for the discoverer covering this node's own URL
    pub local: bool,
}

enum Event {
    Fire { url: String },
    Exchanged { url: String, outcome: Result<PartyInfo, PeerError> },
    Rescan,
    Status(oneshot::Sender<Vec<DiscovererStatus>>),
    Shutdown,
}

struct Discoverer {
    local: bool,
    state: DiscovererState,
    backoff: Backoff,
    delay: Duration,
    ticks: u64,
    timer: Option<AbortHandle>,
}

/// Handle to a running discovery actor.
pub struct NetworkDiscovery {
    events: mpsc::UnboundedSender<Event>,
    task: JoinHandle<()>,
}

impl NetworkDiscovery {
    /// Spawn the actor and schedule a discoverer for every known URL.
    pub fn start<E: Environment>(
        nodes: Arc<NetworkNodes>,
        client: Arc<dyn PeerClient>,
        env: E,
        config: DiscoveryConfig,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let actor = DiscoveryActor {
            nodes,
            client,
            env,
            config,
            events: events.downgrade(),
            discoverers: HashMap::new(),
        };
        let task = tokio::spawn(actor.run(rx));

        tracing::debug!(
            base_delay_ms = config.base_delay.as_millis() as u64,
            max_delay_ms = config.max_delay.as_millis() as u64,
            "Network discovery started"
        );

        Self { events, task }
    }

    /// Look for URLs learned outside of discovery (inbound exchanges).
    pub fn rescan(&self) {
        let _ = self.events.send(Event::Rescan);
    }

    /// Snapshot of every discoverer, sorted by URL.
    ///
    /// Empty once the actor has stopped.
    pub async fn discoverers(&self) -> Vec<DiscovererStatus> {
        let (reply, response) = oneshot::channel();
        if self.events.send(Event::Status(reply)).is_err() {
            return Vec::new();
        }
        response.await.unwrap_or_default()
    }

    /// Cancel every timer and stop the actor.
    ///
    /// Exchanges still in flight complete but their results are dropped.
    pub async fn shutdown(self) {
        let _ = self.events.send(Event::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Discovery task ended abnormally");
        }
    }
}

struct DiscoveryActor<E: Environment> {
    nodes: Arc<NetworkNodes>,
    client: Arc<dyn PeerClient>,
    env: E,
    config: DiscoveryConfig,
    /// Weak so that dropping the handle closes the channel.
    events: mpsc::WeakUnboundedSender<Event>,
    discoverers: HashMap<String, Discoverer>,
}

impl<E: Environment> DiscoveryActor<E> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        self.rescan();

        while let Some(event) = rx.recv().await {
            match event {
                Event::Fire { url } => self.fire(&url),
                Event::Exchanged { url, outcome } => self.exchanged(&url, outcome),
                Event::Rescan => self.rescan(),
                Event::Status(reply) => {
                    let _ = reply.send(self.status());
                },
                Event::Shutdown => break,
            }
        }

        self.cancel_all();
        tracing::debug!(discoverers = self.discoverers.len(), "Network discovery stopped");
    }

    /// Spawn a discoverer for every URL that has none.
    fn rescan(&mut self) {
        for url in self.nodes.node_urls() {
            if self.discoverers.contains_key(&url) {
                continue;
            }

            let local = url == self.nodes.url();
            self.discoverers.insert(
                url.clone(),
                Discoverer {
                    local,
                    state: DiscovererState::Scheduled,
                    backoff: Backoff::new(self.config.base_delay, self.config.max_delay),
                    delay: Duration::ZERO,
                    ticks: 0,
                    timer: None,
                },
            );
            if !local {
                tracing::debug!(url = %url, "Discovered node");
            }
            self.schedule(&url);
        }
    }

    fn schedule(&mut self, url: &str) {
        let env = self.env.clone();
        let events = self.events.clone();
        let Some(discoverer) = self.discoverers.get_mut(url) else {
            return;
        };

        let delay = discoverer.backoff.next_delay();
        let fire_url = url.to_string();
        let timer = tokio::spawn(async move {
            env.sleep(delay).await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(Event::Fire { url: fire_url });
            }
        });

        discoverer.delay = delay;
        discoverer.state = DiscovererState::Scheduled;
        discoverer.timer = Some(timer.abort_handle());
    }

    fn fire(&mut self, url: &str) {
        let Some(discoverer) = self.discoverers.get_mut(url) else {
            return;
        };
        if discoverer.state != DiscovererState::Scheduled {
            return;
        }
        discoverer.state = DiscovererState::Firing;
        discoverer.timer = None;

        if discoverer.local {
            self.rescan();
            self.tick(url);
            return;
        }

        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let snapshot = self.nodes.snapshot();
        let peer = url.to_string();
        tokio::spawn(async move {
            let outcome = client.party_info(&peer, &snapshot).await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(Event::Exchanged { url: peer, outcome });
            }
        });
    }

    fn exchanged(&mut self, url: &str, outcome: Result<PartyInfo, PeerError>) {
        let firing = self
            .discoverers
            .get(url)
            .is_some_and(|discoverer| discoverer.state == DiscovererState::Firing);
        if !firing {
            return;
        }

        match outcome {
            Ok(info) => {
                if self.nodes.merge(&info) {
                    tracing::debug!(url = %url, keys = self.nodes.key_count(), "Learned new nodes");
                    self.rescan();
                }
            },
            Err(PeerError::Transport(reason)) => {
                tracing::debug!(url = %url, reason = %reason, "Party info exchange failed");
            },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Party info exchange rejected");
            },
        }

        self.tick(url);
    }

    /// Count a completed tick and arm the next, doubled, timer.
    fn tick(&mut self, url: &str) {
        if let Some(discoverer) = self.discoverers.get_mut(url) {
            discoverer.ticks += 1;
        }
        self.schedule(url);
    }

    fn cancel_all(&mut self) {
        for discoverer in self.discoverers.values_mut() {
            if let Some(timer) = discoverer.timer.take() {
                timer.abort();
            }
            discoverer.state = DiscovererState::Cancelled;
        }
    }

    fn status(&self) -> Vec<DiscovererStatus> {
        let mut status: Vec<DiscovererStatus> = self
            .discoverers
            .iter()
            .map(|(url, discoverer)| DiscovererStatus {
                url: url.clone(),
                state: discoverer.state,
                delay: discoverer.delay,
                ticks: discoverer.ticks,
                local: discoverer.local,
            })
            .collect();
        status.sort_by(|a, b| a.url.cmp(&b.url));
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_ceiling() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn base_above_ceiling_is_clamped() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn zero_base_still_doubles() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::from_millis(8));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8]);

        let mut backoff = Backoff::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(backoff.next_delay(), Backoff::MIN_DELAY);
    }

    proptest::proptest! {
        #[test]
        fn backoff_never_shrinks_or_passes_ceiling(base in 1u64..10_000, max in 1u64..100_000) {
            let max = Duration::from_millis(max);
            let mut backoff = Backoff::new(Duration::from_millis(base), max);
            let mut previous = Duration::ZERO;
            for _ in 0..40 {
                let delay = backoff.next_delay();
                proptest::prop_assert!(delay >= previous);
                proptest::prop_assert!(delay <= max);
                previous = delay;
            }
            proptest::prop_assert_eq!(previous, max);
        }
    }
}
