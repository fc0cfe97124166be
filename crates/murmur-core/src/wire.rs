//! Murmur wire format — endpoints and the three gossip frames.
//!
//! The gossip protocol is plain ASCII over UDP: one datagram per message,
//! at most 2048 bytes, the first four bytes an opcode and the remainder
//! the payload. The datagram boundary is the message boundary; there is
//! no length prefix and no framing beyond the opcode.
//!
//! The decoder must never panic on hostile input. Every malformed
//! datagram decodes to a [`WireError`] the listener drops.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

/// Maximum gossip datagram size in bytes.
pub const MAX_DATAGRAM: usize = 2048;

/// Opcode width in bytes.
pub const OPCODE_LEN: usize = 4;

/// Interval between keepalive `peer` broadcasts.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// A peer not heard from for longer than this is evicted at sweep time.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(20);

/// How long the broadcaster sleeps when the outgoing mailbox is empty.
pub const OUTGOING_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Errors arising from wire data. All recoverable: the affected update is
/// dropped and the loops continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("datagram shorter than opcode ({0} bytes)")]
    TooShort(usize),

    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("endpoint missing ':' separator: {0:?}")]
    MissingPort(String),

    #[error("invalid port in {0:?}")]
    InvalidPort(String),

    #[error("\"null\" endpoint sentinel")]
    NullEndpoint,

    #[error("cannot resolve {0:?} to an IPv4 address")]
    Unresolvable(String),

    #[error("not an IPv4 address: {0}")]
    NotIpv4(String),

    #[error("snippet payload missing timestamp: {0:?}")]
    MalformedSnippet(String),
}

// ── Endpoint ─────────────────────────────────────────────────────────────────

/// An IPv4 gossip endpoint. Equality and hashing are by (address, port).
///
/// The string form is `"a.b.c.d:port"`. Parsing accepts hostnames and
/// resolves them to a single IPv4 address; an unresolvable name is a
/// recoverable error, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddrV4);

impl Endpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self(SocketAddrV4::new(ip, port))
    }

    pub fn ip(&self) -> Ipv4Addr {
        *self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self(addr)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        SocketAddr::V4(ep.0)
    }
}

impl TryFrom<SocketAddr> for Endpoint {
    type Error = WireError;

    fn try_from(addr: SocketAddr) -> Result<Self, WireError> {
        match addr {
            SocketAddr::V4(v4) => Ok(Self(v4)),
            SocketAddr::V6(v6) => Err(WireError::NotIpv4(v6.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Endpoint {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, WireError> {
        let s = s.trim();
        let (host, port) = s
            .split_once(':')
            .ok_or_else(|| WireError::MissingPort(s.to_owned()))?;
        if host == "null" {
            return Err(WireError::NullEndpoint);
        }
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| WireError::InvalidPort(s.to_owned()))?;
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(Self::new(ip, port));
        }
        // Hostname: resolve and keep the first IPv4 result.
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| WireError::Unresolvable(host.to_owned()))?;
        addrs
            .into_iter()
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(Self(v4)),
                SocketAddr::V6(_) => None,
            })
            .ok_or_else(|| WireError::Unresolvable(host.to_owned()))
    }
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// One gossip datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Sender announces itself; the payload is one endpoint it advertises.
    Peer(Endpoint),
    /// A text snippet tagged with a Lamport timestamp.
    Snip { timestamp: u64, text: String },
    /// Commands the listener to exit. Payload ignored.
    Stop,
}

impl Frame {
    /// Render the on-wire form. `peer` has no separator between opcode and
    /// payload; `snip` separates timestamp and text with one ASCII space.
    pub fn encode(&self) -> String {
        match self {
            Frame::Peer(ep) => format!("peer{ep}"),
            Frame::Snip { timestamp, text } => format!("snip{timestamp} {text}"),
            Frame::Stop => "stop".to_owned(),
        }
    }

    /// Decode one datagram. Payload whitespace is trimmed before parsing.
    pub fn decode(datagram: &[u8]) -> Result<Self, WireError> {
        if datagram.len() < OPCODE_LEN {
            return Err(WireError::TooShort(datagram.len()));
        }
        let (opcode, payload) = datagram.split_at(OPCODE_LEN);
        // The protocol is ASCII; lossy conversion keeps the decoder total.
        let payload = String::from_utf8_lossy(payload);
        let payload = payload.trim();
        match opcode {
            b"peer" => Ok(Frame::Peer(payload.parse()?)),
            b"snip" => {
                let (ts, text) = payload
                    .split_once(' ')
                    .ok_or_else(|| WireError::MalformedSnippet(payload.to_owned()))?;
                let timestamp = ts
                    .parse()
                    .map_err(|_| WireError::MalformedSnippet(payload.to_owned()))?;
                Ok(Frame::Snip {
                    timestamp,
                    text: text.to_owned(),
                })
            }
            b"stop" => Ok(Frame::Stop),
            other => Err(WireError::UnknownOpcode(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
