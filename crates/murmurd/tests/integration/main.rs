//! Murmur integration test harness.
//!
//! Tests drive real UDP and TCP sockets on loopback with ephemeral
//! ports. Each test owns its sockets; nothing is shared between tests.

mod registry_dialog;

use std::time::Duration;

use murmur_core::Endpoint;
use tokio::net::UdpSocket;

/// Generous bound for anything that should happen within one keepalive
/// cycle.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Bind a throwaway UDP probe on loopback.
pub async fn udp_probe() -> (UdpSocket, Endpoint) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = Endpoint::try_from(socket.local_addr().unwrap()).unwrap();
    (socket, addr)
}

/// Receive one datagram as text, failing the test after `RECV_TIMEOUT`.
pub async fn recv_text(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 2048];
    let (len, _) = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for a datagram")
        .expect("recv failed");
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

/// Receive datagrams until one starts with `prefix`, skipping the rest.
pub async fn recv_with_prefix(socket: &UdpSocket, prefix: &str) -> String {
    loop {
        let text = recv_text(socket).await;
        if text.starts_with(prefix) {
            return text;
        }
    }
}

/// Poll `check` every 50 ms until it yields a value.
pub async fn wait_for<T>(mut check: impl FnMut() -> Option<T>) -> T {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        if let Some(value) = check() {
            return value;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
