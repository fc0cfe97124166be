//! Peer table — every known gossip peer and when it was last heard from.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use murmur_core::Endpoint;

/// Last-seen bookkeeping for the gossip peer set, the node itself
/// included. Shared between the keepalive, broadcast, and listen
/// activities; liveness is decided by timeout alone.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: DashMap<Endpoint, Instant>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer, refreshing its last-seen time. New arrivals are
    /// logged; re-joining is idempotent.
    pub fn join(&self, peer: Endpoint) {
        if self.peers.insert(peer, Instant::now()).is_none() {
            tracing::debug!(%peer, "peer joined");
        }
    }

    /// Refresh a peer's last-seen time, inserting it if unknown.
    pub fn touch(&self, peer: Endpoint) {
        self.touch_at(peer, Instant::now());
    }

    /// `touch` with an explicit instant. The seam sweep tests use to
    /// drive a synthetic clock.
    pub fn touch_at(&self, peer: Endpoint, seen: Instant) {
        self.peers.insert(peer, seen);
    }

    /// Remove a peer.
    pub fn leave(&self, peer: Endpoint) {
        if self.peers.remove(&peer).is_some() {
            tracing::debug!(%peer, "peer left");
        }
    }

    pub fn contains(&self, peer: &Endpoint) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Copy the table out so iteration never holds a lock across socket
    /// I/O.
    pub fn snapshot(&self) -> Vec<(Endpoint, Instant)> {
        self.peers
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Evict every entry not refreshed within `timeout`. Returns how many
    /// were removed.
    pub fn sweep(&self, timeout: Duration) -> usize {
        let before = self.peers.len();
        self.peers.retain(|_, seen| seen.elapsed() <= timeout);
        let removed = before.saturating_sub(self.peers.len());
        if removed > 0 {
            tracing::debug!(removed, "expired stale peers");
        }
        removed
    }
}
