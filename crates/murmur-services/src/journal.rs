//! Activity journal — append-only records of everything the node
//! observed, rendered into the registry report after shutdown.

use std::sync::Mutex;

use chrono::Local;
use murmur_core::Endpoint;

fn datestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One `peer` advert, sent or received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertRecord {
    pub to: String,
    pub from: String,
    pub date: String,
}

/// One registry bootstrap: which source supplied which initial peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub address: String,
    pub date: String,
    pub peers: Vec<String>,
}

/// One snippet at its post-observe Lamport time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRecord {
    pub timestamp: u64,
    pub text: String,
    pub sender: String,
}

/// Everything the journal has accumulated, cloned out under one lock so
/// report rendering never contends with the gossip activities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalSnapshot {
    /// Endpoints ever observed, insertion-ordered and deduplicated.
    pub peers: Vec<String>,
    pub sources: Vec<SourceRecord>,
    pub recv_adverts: Vec<AdvertRecord>,
    pub sent_adverts: Vec<AdvertRecord>,
    pub snippets: Vec<SnippetRecord>,
}

/// Mutex-guarded append-only journal. Created with the gossip node,
/// appended by its activities, read-only once the node halts.
#[derive(Debug, Default)]
pub struct ActivityJournal {
    inner: Mutex<JournalSnapshot>,
}

impl ActivityJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an endpoint sighting.
    pub fn record_peer(&self, peer: Endpoint) {
        let mut inner = self.inner.lock().unwrap();
        let peer = peer.to_string();
        if !inner.peers.contains(&peer) {
            inner.peers.push(peer);
        }
    }

    /// Record a registry bootstrap.
    pub fn record_source(&self, source: &str, peers: &[Endpoint]) {
        let record = SourceRecord {
            address: source.to_owned(),
            date: datestamp(),
            peers: peers.iter().map(Endpoint::to_string).collect(),
        };
        self.inner.lock().unwrap().sources.push(record);
    }

    /// Record a `peer` advert received from `observed_by` advertising
    /// `advertised`.
    pub fn record_recv_advert(&self, advertised: Endpoint, observed_by: Endpoint) {
        let record = AdvertRecord {
            to: advertised.to_string(),
            from: observed_by.to_string(),
            date: datestamp(),
        };
        self.inner.lock().unwrap().recv_adverts.push(record);
    }

    /// Record a keepalive advert sent to `to` carrying our own address.
    pub fn record_sent_advert(&self, to: Endpoint, own: Endpoint) {
        let record = AdvertRecord {
            to: to.to_string(),
            from: own.to_string(),
            date: datestamp(),
        };
        self.inner.lock().unwrap().sent_adverts.push(record);
    }

    /// Record a snippet.
    pub fn record_snippet(&self, timestamp: u64, text: &str, sender: Endpoint) {
        let record = SnippetRecord {
            timestamp,
            text: text.to_owned(),
            sender: sender.to_string(),
        };
        self.inner.lock().unwrap().snippets.push(record);
    }

    pub fn peer_count(&self) -> usize {
        self.inner.lock().unwrap().peers.len()
    }

    pub fn snippet_count(&self) -> usize {
        self.inner.lock().unwrap().snippets.len()
    }

    pub fn snapshot(&self) -> JournalSnapshot {
        self.inner.lock().unwrap().clone()
    }
}
