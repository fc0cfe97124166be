//! I/O mailbox — the two FIFOs between the console and the gossip node.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use murmur_core::Endpoint;

/// A received snippet, tagged with the local Lamport time at receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub sender: Endpoint,
    pub text: String,
    pub timestamp: u64,
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}> {}", self.timestamp, self.sender, self.text)
    }
}

/// Two unbounded FIFO queues: console lines waiting to be broadcast, and
/// received snippets waiting to be displayed. Consumers poll with the
/// `has_*`/`pop_*` pairs; `pop_*` returns `None` when the queue is empty.
#[derive(Debug, Default)]
pub struct Mailbox {
    incoming: Mutex<VecDeque<Snippet>>,
    outgoing: Mutex<VecDeque<String>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_incoming(&self) -> bool {
        !self.incoming.lock().unwrap().is_empty()
    }

    pub fn put_incoming(&self, snippet: Snippet) {
        self.incoming.lock().unwrap().push_back(snippet);
    }

    pub fn pop_incoming(&self) -> Option<Snippet> {
        self.incoming.lock().unwrap().pop_front()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.lock().unwrap().is_empty()
    }

    pub fn put_outgoing(&self, line: String) {
        self.outgoing.lock().unwrap().push_back(line);
    }

    pub fn pop_outgoing(&self) -> Option<String> {
        self.outgoing.lock().unwrap().pop_front()
    }
}
