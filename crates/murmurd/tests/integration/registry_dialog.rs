use crate::*;

use std::net::SocketAddr;
use std::sync::Arc;

use murmur_core::config::GossipConfig;
use murmur_core::{Endpoint, Frame};
use murmur_services::Mailbox;
use murmurd::node::GossipNode;
use murmurd::registry::{run_session, RegistryContext};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

async fn fake_registry() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind registry");
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn accept(listener: &TcpListener) -> TcpStream {
    tokio::time::timeout(RECV_TIMEOUT, listener.accept())
        .await
        .expect("no client connected")
        .expect("accept failed")
        .0
}

/// `receive peers` fills the context, skipping the `null` placeholder.
#[tokio::test]
async fn bootstrap_collects_peers_and_skips_null() {
    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream
            .write_all(b"receive peers\n3\n127.0.0.1:40001\n127.0.0.1:40002\nnull:0\nclose\n")
            .await
            .unwrap();
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    run_session(0, addr, &mut ctx).await.expect("session failed");
    server.await.unwrap();

    assert!(ctx.address.is_some());
    assert_eq!(ctx.peers.len(), 2);
    assert!(ctx.peers.contains(&"127.0.0.1:40001".parse().unwrap()));
    assert!(ctx.peers.contains(&"127.0.0.1:40002".parse().unwrap()));
}

/// An empty peer list is valid; the node will start with only itself.
#[tokio::test]
async fn bootstrap_with_zero_peers_is_valid() {
    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(b"receive peers\n0\nclose\n").await.unwrap();
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    run_session(0, addr, &mut ctx).await.expect("session failed");
    server.await.unwrap();

    assert!(ctx.peers.is_empty());
}

/// `get team name` and `get location` answer one line each; the location
/// is the address the registry sees on the wire.
#[tokio::test]
async fn team_name_and_location_are_answered() {
    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let stream = accept(&listener).await;
        let peer_addr = stream.peer_addr().unwrap();
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        write.write_all(b"get team name\n").await.unwrap();
        let mut team = String::new();
        reader.read_line(&mut team).await.unwrap();

        write.write_all(b"get location\n").await.unwrap();
        let mut location = String::new();
        reader.read_line(&mut location).await.unwrap();

        write.write_all(b"close\n").await.unwrap();
        (team, location, peer_addr)
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    run_session(0, addr, &mut ctx).await.expect("session failed");
    let (team, location, peer_addr) = server.await.unwrap();

    assert_eq!(team, "the-team\n");
    assert_eq!(location.trim(), peer_addr.to_string());
    assert_eq!(ctx.address, Some(Endpoint::try_from(peer_addr).unwrap()));
}

/// `get report` streams the prebuilt report verbatim.
#[tokio::test]
async fn report_is_uploaded_verbatim() {
    let report = "2\n10.0.0.1:1\n10.0.0.2:2\n0\n0\n0\n0\n".to_owned();
    let expected = format!("{report}\n");

    let (listener, addr) = fake_registry().await;
    let expected_len = expected.len();
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(b"get report\n").await.unwrap();
        let mut buf = vec![0u8; expected_len];
        stream.read_exact(&mut buf).await.unwrap();
        stream.write_all(b"close\n").await.unwrap();
        String::from_utf8(buf).unwrap()
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    ctx.report = report;
    run_session(0, addr, &mut ctx).await.expect("session failed");
    assert_eq!(server.await.unwrap(), expected);
}

/// `get code` sends the language line first and the terminator last.
#[tokio::test]
async fn code_listing_is_framed_by_language_and_terminator() {
    let root = std::env::temp_dir().join(format!("murmur-code-test-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("solo.rs"), "fn main() {}\n").unwrap();

    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(b"get code\nclose\n").await.unwrap();
        let mut all = String::new();
        stream.read_to_string(&mut all).await.unwrap();
        all
    });

    let mut ctx = RegistryContext::new("the-team", &root);
    run_session(0, addr, &mut ctx).await.expect("session failed");
    let listing = server.await.unwrap();

    assert!(listing.starts_with("rust\n"));
    assert!(listing.contains("fn main() {}\n"));
    assert!(listing.ends_with("...\n"));

    let _ = std::fs::remove_dir_all(&root);
}

/// Anything outside the command table is a protocol violation that
/// aborts the session.
#[tokio::test]
async fn unknown_command_aborts_the_session() {
    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(b"gimme stuff\n").await.unwrap();
        // The client hangs up; swallow whatever the socket does next.
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    let result = run_session(0, addr, &mut ctx).await;
    assert!(result.is_err());
    server.await.unwrap();
}

/// A blank command line ends the dialog without error.
#[tokio::test]
async fn blank_command_ends_the_dialog() {
    let (listener, addr) = fake_registry().await;
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(b"\n").await.unwrap();
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    run_session(0, addr, &mut ctx).await.expect("session failed");
    server.await.unwrap();
}

/// End-to-end bootstrap: the registry hands out two peers, the node
/// binds the address observed on the TCP session, and both peers hear a
/// keepalive within the first cycle.
#[tokio::test]
async fn bootstrap_then_first_keepalive() {
    let (probe_a, addr_a) = udp_probe().await;
    let (probe_b, addr_b) = udp_probe().await;

    let (listener, addr) = fake_registry().await;
    let payload = format!("receive peers\n2\n{addr_a}\n{addr_b}\nclose\n");
    let server = tokio::spawn(async move {
        let mut stream = accept(&listener).await;
        stream.write_all(payload.as_bytes()).await.unwrap();
    });

    let mut ctx = RegistryContext::new("the-team", ".");
    run_session(0, addr, &mut ctx).await.expect("session failed");
    server.await.unwrap();

    let self_addr = ctx.address.expect("no self address");
    let initial: Vec<Endpoint> = ctx.peers.iter().copied().collect();
    let mailbox = Arc::new(Mailbox::new());
    let node = GossipNode::bind(
        self_addr,
        &addr.to_string(),
        &initial,
        mailbox,
        &GossipConfig::default(),
    )
    .await
    .expect("bind node");

    let runner = {
        let node = Arc::clone(&node);
        tokio::spawn(async move { node.run().await })
    };

    let expected = Frame::Peer(node.self_addr()).encode();
    assert_eq!(recv_with_prefix(&probe_a, "peer").await, expected);
    assert_eq!(recv_with_prefix(&probe_b, "peer").await, expected);

    let journal = node.journal_snapshot();
    assert_eq!(journal.sources.len(), 1);
    assert_eq!(journal.peers.len(), 2);

    probe_a
        .send_to(b"stop", SocketAddr::from(node.self_addr()))
        .await
        .unwrap();
    tokio::time::timeout(RECV_TIMEOUT, runner)
        .await
        .expect("node did not stop")
        .unwrap();
}
