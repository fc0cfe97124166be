//! Registry client — serves the registry's command/response dialog.
//!
//! The registry drives: it sends one command line at a time and the
//! client answers until `close` (or end of input) ends the session. The
//! bootstrap session collects the initial peer set; the closing session
//! uploads the rendered activity report. Both connect from the node's
//! gossip port, so the address the registry observes is the address
//! other peers can reach us on.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpSocket;

use murmur_core::wire::WireError;
use murmur_core::Endpoint;

/// What the registry may ask of us. Matched by substring: command lines
/// arrive with trailing newlines and occasional padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Empty,
    TeamName,
    Code,
    Location,
    Report,
    Peers,
    Close,
}

/// `None` is a protocol violation that aborts the session.
fn classify(line: &str) -> Option<Request> {
    let line = line.trim();
    if line.is_empty() {
        return Some(Request::Empty);
    }
    if line.contains("get team name") {
        return Some(Request::TeamName);
    }
    if line.contains("get code") {
        return Some(Request::Code);
    }
    if line.contains("get location") {
        return Some(Request::Location);
    }
    if line.contains("get report") {
        return Some(Request::Report);
    }
    if line.contains("receive peers") {
        return Some(Request::Peers);
    }
    if line.contains("close") {
        return Some(Request::Close);
    }
    None
}

/// State carried across the bootstrap and report sessions.
#[derive(Debug)]
pub struct RegistryContext {
    pub team_name: String,
    /// Directory whose `.rs` sources answer `get code`.
    pub code_root: PathBuf,
    /// Our own endpoint as observed on the first connect. Stable for the
    /// whole run even though the socket is replaced between sessions.
    pub address: Option<Endpoint>,
    /// Initial peer set accumulated from `receive peers`.
    pub peers: HashSet<Endpoint>,
    /// Rendered activity report; empty until the node has shut down.
    pub report: String,
}

impl RegistryContext {
    pub fn new(team_name: impl Into<String>, code_root: impl Into<PathBuf>) -> Self {
        Self {
            team_name: team_name.into(),
            code_root: code_root.into(),
            address: None,
            peers: HashSet::new(),
            report: String::new(),
        }
    }
}

/// Run one registry session: connect from the node's gossip port and
/// answer commands until the registry closes the dialog. Read and write
/// errors abort the session.
pub async fn run_session(
    local_port: u16,
    registry_addr: SocketAddr,
    ctx: &mut RegistryContext,
) -> Result<()> {
    let socket = TcpSocket::new_v4().context("failed to create registry socket")?;
    // The report session rebinds the same local port while the bootstrap
    // connection may still be in TIME_WAIT.
    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    socket
        .bind(SocketAddr::from(([0, 0, 0, 0], local_port)))
        .with_context(|| format!("failed to bind local port {local_port}"))?;
    let stream = socket
        .connect(registry_addr)
        .await
        .with_context(|| format!("failed to connect to registry at {registry_addr}"))?;

    if ctx.address.is_none() {
        let local = stream.local_addr().context("no local address")?;
        ctx.address = Some(Endpoint::try_from(local).context("registry connection is not IPv4")?);
    }
    let self_addr = ctx.address.context("no remembered self address")?;

    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    loop {
        let Some(line) = read_line(&mut reader).await? else {
            break;
        };
        let Some(request) = classify(&line) else {
            bail!("registry protocol violation: unrecognized command {:?}", line.trim());
        };
        tracing::debug!(?request, "registry command");
        match request {
            Request::Empty => break,
            Request::TeamName => send_line(&mut write, &ctx.team_name).await?,
            Request::Location => send_line(&mut write, &self_addr.to_string()).await?,
            Request::Code => send_code(&mut write, &ctx.code_root).await?,
            Request::Report => send_line(&mut write, &ctx.report).await?,
            Request::Peers => receive_peers(&mut reader, &mut ctx.peers).await?,
            Request::Close => break,
        }
    }
    Ok(())
}

/// One `\n`-terminated line, or `None` at end of input.
async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<Option<String>> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .await
        .context("registry read failed")?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

async fn send_line(write: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    write
        .write_all(line.as_bytes())
        .await
        .context("registry write failed")?;
    write
        .write_all(b"\n")
        .await
        .context("registry write failed")?;
    Ok(())
}

/// `receive peers`: one count line, then that many `host:port` lines.
/// `null` entries are the registry's placeholder and are skipped
/// silently; other parse failures drop the entry with a warning. A
/// trailing `close` is picked up by the dialog loop on its next read.
async fn receive_peers(
    reader: &mut BufReader<OwnedReadHalf>,
    peers: &mut HashSet<Endpoint>,
) -> Result<()> {
    let count_line = read_line(reader)
        .await?
        .context("registry closed during receive peers")?;
    let count: usize = count_line
        .trim()
        .parse()
        .with_context(|| format!("bad peer count {:?}", count_line.trim()))?;
    for _ in 0..count {
        let line = read_line(reader)
            .await?
            .context("registry closed during receive peers")?;
        match line.trim().parse::<Endpoint>() {
            Ok(peer) => {
                peers.insert(peer);
            }
            Err(WireError::NullEndpoint) => {}
            Err(e) => tracing::warn!(entry = %line.trim(), error = %e, "skipping unparseable peer"),
        }
    }
    tracing::info!(total = peers.len(), "received initial peers");
    Ok(())
}

/// `get code`: the implementation language, every source file, then the
/// literal terminator line.
async fn send_code(write: &mut OwnedWriteHalf, root: &Path) -> Result<()> {
    send_line(write, "rust").await?;
    for path in source_files(root) {
        match std::fs::read_to_string(&path) {
            Ok(contents) => send_line(write, &contents).await?,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable source file")
            }
        }
    }
    send_line(write, "...").await
}

/// Every `.rs` file under `root`, recursively, in sorted order so the
/// transmission is deterministic. Build output and hidden directories
/// are skipped.
fn source_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_sources(root, &mut files);
    files.sort();
    files
}

fn collect_sources(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if name == "target" || name.starts_with('.') {
                continue;
            }
            collect_sources(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
}
