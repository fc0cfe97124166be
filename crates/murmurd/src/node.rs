//! The gossip node — three cooperating activities over one UDP socket.
//!
//! The keepalive loop advertises our address to every known peer and
//! sweeps stale entries, the broadcast loop drains the outgoing mailbox
//! into `snip` frames, and the listen loop dispatches incoming datagrams
//! until a `stop` arrives. Shutdown is cooperative: the listener clears
//! `running` and the other two loops observe it within one cycle; no
//! task is forcibly aborted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use murmur_core::config::GossipConfig;
use murmur_core::wire::{Frame, WireError, MAX_DATAGRAM};
use murmur_core::{Endpoint, LamportClock};
use murmur_services::journal::JournalSnapshot;
use murmur_services::{ActivityJournal, Mailbox, PeerTable, Snippet};

/// Shared state of one gossip node. Workers hold an `Arc` handle that
/// keeps the node alive for their duration; the socket, peer table,
/// clock, and journal are owned here and nowhere else.
pub struct GossipNode {
    socket: UdpSocket,
    self_addr: Endpoint,
    peers: PeerTable,
    clock: LamportClock,
    mailbox: Arc<Mailbox>,
    journal: ActivityJournal,
    running: AtomicBool,
    started_at: Instant,
    keepalive: Duration,
    peer_timeout: Duration,
    poll_interval: Duration,
}

impl GossipNode {
    /// Bind the gossip socket and seed the peer table with our own
    /// endpoint plus the registry bootstrap set. `source` is the registry
    /// address the initial peers came from. A bind failure is fatal: the
    /// port is the identity we advertised to the registry.
    pub async fn bind(
        self_addr: Endpoint,
        source: &str,
        initial_peers: &[Endpoint],
        mailbox: Arc<Mailbox>,
        config: &GossipConfig,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(SocketAddr::from(self_addr))
            .await
            .with_context(|| format!("failed to bind gossip socket on {self_addr}"))?;
        // Port 0 means the OS picked one; advertise what was actually bound.
        let self_addr = Endpoint::try_from(socket.local_addr()?)?;

        let node = Arc::new(Self {
            socket,
            self_addr,
            peers: PeerTable::new(),
            clock: LamportClock::new(),
            mailbox,
            journal: ActivityJournal::new(),
            running: AtomicBool::new(true),
            started_at: Instant::now(),
            keepalive: config.keepalive(),
            peer_timeout: config.peer_timeout(),
            poll_interval: config.poll_interval(),
        });

        node.peers.join(self_addr);
        for &peer in initial_peers {
            node.peers.join(peer);
            node.journal.record_peer(peer);
        }
        node.journal.record_source(source, initial_peers);

        tracing::info!(addr = %self_addr, peers = initial_peers.len(), "gossip node ready");
        Ok(node)
    }

    pub fn self_addr(&self) -> Endpoint {
        self.self_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn peer_snapshot(&self) -> Vec<(Endpoint, Instant)> {
        self.peers.snapshot()
    }

    pub fn snippets_seen(&self) -> usize {
        self.journal.snippet_count()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn journal_snapshot(&self) -> JournalSnapshot {
        self.journal.snapshot()
    }

    /// Run the node until a `stop` datagram arrives. The keepalive and
    /// broadcast activities are spawned; the listener runs on the calling
    /// task and gates shutdown.
    pub async fn run(self: Arc<Self>) {
        let keepalive = tokio::spawn(Arc::clone(&self).keepalive_loop());
        let broadcast = tokio::spawn(Arc::clone(&self).broadcast_loop());

        self.listen_loop().await;
        self.running.store(false, Ordering::SeqCst);

        let _ = tokio::join!(keepalive, broadcast);
        tracing::info!("gossip node stopped");
    }

    /// Advertise our endpoint to every known peer, then evict the stale
    /// ones. Sending to ourselves is what refreshes our own entry.
    async fn keepalive_loop(self: Arc<Self>) {
        let frame = Frame::Peer(self.self_addr).encode();
        while self.is_running() {
            for (peer, _) in self.peers.snapshot() {
                if let Err(e) = self
                    .socket
                    .send_to(frame.as_bytes(), SocketAddr::from(peer))
                    .await
                {
                    // Liveness is decided by timeout alone; the peer stays.
                    tracing::warn!(%peer, error = %e, "keepalive send failed");
                }
                self.journal.record_sent_advert(peer, self.self_addr);
            }
            self.peers.sweep(self.peer_timeout);
            tokio::time::sleep(self.keepalive).await;
        }
        tracing::debug!("keepalive loop stopped");
    }

    /// Drain the outgoing mailbox: each console line becomes one `snip`
    /// frame stamped with a fresh Lamport tick and sent to a snapshot of
    /// the peer table.
    async fn broadcast_loop(self: Arc<Self>) {
        while self.is_running() {
            match self.mailbox.pop_outgoing() {
                Some(text) => {
                    let timestamp = self.clock.tick();
                    let frame = Frame::Snip { timestamp, text }.encode();
                    for (peer, _) in self.peers.snapshot() {
                        if let Err(e) = self
                            .socket
                            .send_to(frame.as_bytes(), SocketAddr::from(peer))
                            .await
                        {
                            tracing::warn!(%peer, error = %e, "snippet send failed");
                        }
                    }
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
        tracing::debug!("broadcast loop stopped");
    }

    /// Receive datagrams until a `stop` arrives. Malformed datagrams are
    /// dropped; nothing here is allowed to end the loop early.
    async fn listen_loop(&self) {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!(error = %e, "recv_from failed");
                    continue;
                }
            };
            let sender = match Endpoint::try_from(from) {
                Ok(sender) => sender,
                Err(_) => {
                    tracing::debug!(%from, "ignoring non-IPv4 sender");
                    continue;
                }
            };
            match Frame::decode(&buf[..len]) {
                Ok(Frame::Peer(advertised)) => self.on_peer(sender, advertised),
                Ok(Frame::Snip { timestamp, text }) => self.on_snip(sender, timestamp, &text),
                Ok(Frame::Stop) => break,
                Err(WireError::UnknownOpcode(_)) | Err(WireError::TooShort(_)) => {
                    tracing::trace!(%sender, len, "dropping unrecognized datagram");
                }
                Err(e) => tracing::debug!(%sender, error = %e, "dropping malformed datagram"),
            }
        }
        tracing::info!("listener stopped");
    }

    /// A `peer` frame: the sender is alive and advertises one endpoint.
    /// Feeding the same advert twice refreshes last-seen without
    /// duplicating entries.
    fn on_peer(&self, sender: Endpoint, advertised: Endpoint) {
        self.peers.touch(sender);
        self.peers.touch(advertised);
        self.journal.record_peer(sender);
        self.journal.record_peer(advertised);
        self.journal.record_recv_advert(advertised, sender);
    }

    /// A `snip` frame: merge the sender's Lamport claim, then hand the
    /// snippet to the console tagged with the merged clock. Our own
    /// snippets are journaled but never queued for display.
    fn on_snip(&self, sender: Endpoint, timestamp: u64, text: &str) {
        self.peers.touch(sender);
        self.clock.observe(timestamp);
        let timestamp = self.clock.current();
        if sender != self.self_addr {
            self.mailbox.put_incoming(Snippet {
                sender,
                text: text.to_owned(),
                timestamp,
            });
        }
        self.journal.record_snippet(timestamp, text, sender);
    }
}
