//! murmurd — Murmur peer-to-peer gossip chat daemon.
//!
//! `murmurd <team-name> <port>`: bootstrap from the registry, gossip
//! until a `stop` datagram arrives, then upload the activity report.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use murmur_core::config::MurmurConfig;
use murmur_core::Endpoint;
use murmur_services::{report, Mailbox};
use murmurd::console::Console;
use murmurd::node::GossipNode;
use murmurd::registry::{self, RegistryContext};
use murmurd::status::{self, StatusState};

fn usage() -> ! {
    eprintln!("Usage: murmurd <team-name> <port>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(team_name), Some(port), None) = (args.next(), args.next(), args.next()) else {
        usage();
    };
    let Ok(port) = port.parse::<u16>() else {
        usage();
    };

    let config = MurmurConfig::load().context("failed to load configuration")?;
    let registry_ep: Endpoint = format!("{}:{}", config.registry.host, config.registry.port)
        .parse()
        .context("bad registry address in configuration")?;
    let registry_addr = SocketAddr::from(registry_ep);
    tracing::info!(team = %team_name, port, registry = %registry_addr, "murmurd starting");

    let mut ctx = RegistryContext::new(team_name, config.registry.code_root.clone());
    registry::run_session(port, registry_addr, &mut ctx)
        .await
        .context("registry bootstrap session failed")?;

    let self_addr = ctx
        .address
        .context("registry session did not establish our address")?;
    let initial_peers: Vec<Endpoint> = ctx.peers.iter().copied().collect();

    let mailbox = Arc::new(Mailbox::new());
    let node = GossipNode::bind(
        self_addr,
        &registry_addr.to_string(),
        &initial_peers,
        Arc::clone(&mailbox),
        &config.gossip,
    )
    .await?;

    let console = Console::spawn(Arc::clone(&mailbox));

    if config.status.port != 0 {
        let state = StatusState {
            node: Arc::clone(&node),
        };
        let status_port = config.status.port;
        tokio::spawn(async move {
            if let Err(e) = status::serve(state, status_port).await {
                tracing::error!(error = %e, "status endpoint failed");
            }
        });
    }

    // Blocks until a `stop` datagram terminates the listener.
    Arc::clone(&node).run().await;
    console.close();

    tracing::info!("uploading activity report");
    ctx.report = report::assemble_report(&node.journal_snapshot());
    registry::run_session(port, registry_addr, &mut ctx)
        .await
        .context("registry report session failed")?;

    Ok(())
}
