//! HTTP status endpoint — exposes node state as JSON on loopback.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::node::GossipNode;

#[derive(Clone)]
pub struct StatusState {
    pub node: Arc<GossipNode>,
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub self_addr: String,
    pub running: bool,
    pub clock: u64,
    pub peer_count: usize,
    pub snippets_seen: usize,
    pub uptime_secs: u64,
}

async fn handle_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    let node = &state.node;
    Json(StatusResponse {
        self_addr: node.self_addr().to_string(),
        running: node.is_running(),
        clock: node.clock().current(),
        peer_count: node.peer_snapshot().len(),
        snippets_seen: node.snippets_seen(),
        uptime_secs: node.uptime().as_secs(),
    })
}

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerInfo>,
}

#[derive(Serialize)]
pub struct PeerInfo {
    pub addr: String,
    pub last_seen_secs: u64,
}

async fn handle_peers(State(state): State<StatusState>) -> Json<PeersResponse> {
    let peers = state
        .node
        .peer_snapshot()
        .into_iter()
        .map(|(addr, last_seen)| PeerInfo {
            addr: addr.to_string(),
            last_seen_secs: last_seen.elapsed().as_secs(),
        })
        .collect();
    Json(PeersResponse { peers })
}

// ── Router ────────────────────────────────────────────────────────────────────

pub async fn serve(state: StatusState, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/status", get(handle_status))
        .route("/peers", get(handle_peers))
        .with_state(state);

    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "status endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}
