//! murmur-ctl — command-line status client for the Murmur daemon.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct StatusResponse {
    self_addr: String,
    running: bool,
    clock: u64,
    peer_count: usize,
    snippets_seen: usize,
    uptime_secs: u64,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    addr: String,
    last_seen_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("port must be a number")?,
        None => 9404,
    };
    let base = format!("http://127.0.0.1:{}", port);

    let status = reqwest::get(format!("{base}/status"))
        .await
        .context("failed to connect to murmurd — is it running?")?
        .json::<StatusResponse>()
        .await
        .context("failed to parse status response")?;

    let peers = reqwest::get(format!("{base}/peers"))
        .await
        .context("failed to fetch peers")?
        .json::<PeersResponse>()
        .await
        .context("failed to parse peers response")?;

    println!("═══════════════════════════════════════");
    println!("  Murmur Node Status");
    println!("═══════════════════════════════════════");
    println!("  Address       : {}", status.self_addr);
    println!("  Running       : {}", status.running);
    println!("  Lamport clock : {}", status.clock);
    println!("  Known peers   : {}", status.peer_count);
    println!("  Snippets seen : {}", status.snippets_seen);
    println!("  Uptime        : {}s", status.uptime_secs);

    if peers.peers.is_empty() {
        println!("\n  No known peers.");
    } else {
        println!("\n  Peers:");
        for peer in &peers.peers {
            println!("  ┌─ {}", peer.addr);
            println!("  └─ last seen {}s ago", peer.last_seen_secs);
        }
    }

    Ok(())
}
