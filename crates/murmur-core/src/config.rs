//! Configuration system for Murmur.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $MURMUR_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/murmur/config.toml
//!   3. ~/.config/murmur/config.toml
//!
//! The team name and gossip port stay on the command line; the config
//! carries everything that outlives a single invocation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::wire::{KEEPALIVE_INTERVAL, OUTGOING_POLL_INTERVAL, PEER_TIMEOUT};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub registry: RegistryConfig,
    pub gossip: GossipConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry host. Hostnames are resolved at connect time.
    pub host: String,
    /// Registry TCP port.
    pub port: u16,
    /// Directory whose `.rs` sources are streamed for `get code`.
    pub code_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Seconds between keepalive `peer` broadcasts.
    pub keepalive_secs: u64,
    /// Seconds of silence after which a peer is evicted.
    pub peer_timeout_secs: u64,
    /// Milliseconds the broadcaster sleeps when the outgoing mailbox is empty.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Local HTTP status port. 0 disables the endpoint.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for MurmurConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            gossip: GossipConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "136.159.5.22".to_owned(),
            port: 55921,
            code_root: PathBuf::from("."),
        }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: KEEPALIVE_INTERVAL.as_secs(),
            peer_timeout_secs: PEER_TIMEOUT.as_secs(),
            poll_interval_ms: OUTGOING_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { port: 9404 }
    }
}

impl GossipConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("murmur")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl MurmurConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            MurmurConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("MURMUR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply MURMUR_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MURMUR_REGISTRY__HOST") {
            self.registry.host = v;
        }
        if let Ok(v) = std::env::var("MURMUR_REGISTRY__PORT") {
            if let Ok(p) = v.parse() {
                self.registry.port = p;
            }
        }
        if let Ok(v) = std::env::var("MURMUR_REGISTRY__CODE_ROOT") {
            self.registry.code_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MURMUR_GOSSIP__KEEPALIVE_SECS") {
            if let Ok(s) = v.parse() {
                self.gossip.keepalive_secs = s;
            }
        }
        if let Ok(v) = std::env::var("MURMUR_GOSSIP__PEER_TIMEOUT_SECS") {
            if let Ok(s) = v.parse() {
                self.gossip.peer_timeout_secs = s;
            }
        }
        if let Ok(v) = std::env::var("MURMUR_GOSSIP__POLL_INTERVAL_MS") {
            if let Ok(ms) = v.parse() {
                self.gossip.poll_interval_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("MURMUR_STATUS__PORT") {
            if let Ok(p) = v.parse() {
                self.status.port = p;
            }
        }
    }
}
