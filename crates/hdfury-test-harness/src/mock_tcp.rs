//! Mock HDFury device for protocol-level testing.
//!
//! [`MockTcpServer`] listens on localhost and speaks the device's
//! line protocol: it reads `\r\n`-terminated command lines and answers
//! from a script of expectations, falling back to a default reply once the
//! script is exhausted. It can also stay silent (to provoke read timeouts),
//! hang up mid-conversation, send a welcome banner on connect, and go
//! "offline" so every connection is dropped on arrival.
//!
//! # Example
//!
//! ```
//! use hdfury_test_harness::MockTcpServer;
//!
//! # async fn example() -> hdfury_core::Result<()> {
//! let server = MockTcpServer::new().await?;
//!
//! // When the client sends "get ver", respond with ">ver 0.61"
//! server.expect("get ver", ">ver 0.61");
//!
//! let port = server.port();
//! // ... connect an HdfuryClient to 127.0.0.1:port and test ...
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use hdfury_core::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the server does after receiving a scripted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this line (a `\r\n` terminator is appended).
    Line(String),
    /// Read the request but never answer it.
    Silent,
    /// Close the connection without answering.
    Hangup,
}

#[derive(Debug, Clone)]
struct Expectation {
    request: String,
    reply: Reply,
}

/// A command line received by the server, with its arrival time.
#[derive(Debug, Clone)]
pub struct ReceivedLine {
    pub line: String,
    pub at: Instant,
    /// 1-based index of the connection the line arrived on.
    pub connection: usize,
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<Expectation>>,
    default_reply: Mutex<Option<String>>,
    banner: Mutex<Option<String>>,
    received: Mutex<Vec<ReceivedLine>>,
    errors: Mutex<Vec<String>>,
    connections: AtomicUsize,
}

impl Shared {
    fn next_reply(&self, line: &str) -> Option<Reply> {
        let next = lock(&self.script).pop_front();
        match next {
            Some(exp) if exp.request == line => Some(exp.reply),
            Some(exp) => {
                lock(&self.errors).push(format!(
                    "request mismatch: expected {:?}, got {:?}",
                    exp.request, line
                ));
                Some(Reply::Hangup)
            }
            None => lock(&self.default_reply).clone().map(Reply::Line),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scripted line-protocol device on a random localhost port.
///
/// The server starts accepting as soon as it is created. Each accepted
/// connection is served on its own task; expectations are shared, so they
/// are consumed in order regardless of which connection a line arrives on.
/// Requests that do not match the next expectation are recorded in
/// [`errors`](MockTcpServer::errors) and the connection is closed.
pub struct MockTcpServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    online: watch::Sender<bool>,
    accept_handle: JoinHandle<()>,
}

impl MockTcpServer {
    /// Bind to `127.0.0.1:0` and start accepting connections.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Connection(format!("failed to bind mock TCP server: {e}")))?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared::default());
        let (online, _) = watch::channel(true);

        let accept_shared = Arc::clone(&shared);
        let accept_online = online.clone();
        let accept_handle = tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "mock server accept failed");
                        continue;
                    }
                };
                let index = accept_shared.connections.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(%peer, connection = index, "mock server accepted connection");

                let conn_shared = Arc::clone(&accept_shared);
                let conn_online = accept_online.subscribe();
                tokio::spawn(serve_connection(stream, index, conn_shared, conn_online));
            }
        });

        Ok(Self {
            addr,
            shared,
            online,
            accept_handle,
        })
    }

    /// Add a scripted reply. Expectations are consumed in order.
    pub fn expect(&self, request: &str, reply: &str) {
        self.push(request, Reply::Line(reply.to_string()));
    }

    /// Expect `request` and never answer it.
    pub fn expect_silence(&self, request: &str) {
        self.push(request, Reply::Silent);
    }

    /// Expect `request` and close the connection instead of answering.
    pub fn expect_hangup(&self, request: &str) {
        self.push(request, Reply::Hangup);
    }

    fn push(&self, request: &str, reply: Reply) {
        lock(&self.shared.script).push_back(Expectation {
            request: request.to_string(),
            reply,
        });
    }

    /// Reply used for any line received after the script is exhausted.
    /// Without one, unscripted lines go unanswered.
    pub fn set_default_reply(&self, reply: &str) {
        *lock(&self.shared.default_reply) = Some(reply.to_string());
    }

    /// Line sent to each client right after it connects.
    pub fn set_banner(&self, banner: Option<&str>) {
        *lock(&self.shared.banner) = banner.map(str::to_string);
    }

    /// Builder-style form of [`set_banner`](MockTcpServer::set_banner).
    pub fn with_banner(self, banner: &str) -> Self {
        self.set_banner(Some(banner));
        self
    }

    /// Take the device off the network (`false`) or bring it back.
    ///
    /// Going offline closes every open connection; while offline, new
    /// connections are accepted and closed immediately.
    pub fn set_online(&self, online: bool) {
        self.online.send_replace(online);
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every line received so far, in arrival order.
    pub fn received(&self) -> Vec<ReceivedLine> {
        lock(&self.shared.received).clone()
    }

    /// Just the text of every line received so far.
    pub fn received_lines(&self) -> Vec<String> {
        lock(&self.shared.received)
            .iter()
            .map(|r| r.line.clone())
            .collect()
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Scripted expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        lock(&self.shared.script).len()
    }

    /// Script violations observed so far.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.shared.errors).clone()
    }
}

impl Drop for MockTcpServer {
    fn drop(&mut self) {
        self.accept_handle.abort();
        // Closes every connection still being served.
        self.online.send_replace(false);
    }
}

async fn serve_connection(
    stream: TcpStream,
    index: usize,
    shared: Arc<Shared>,
    mut online: watch::Receiver<bool>,
) {
    if !*online.borrow_and_update() {
        tracing::debug!(connection = index, "mock server offline, dropping connection");
        return;
    }

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let banner = lock(&shared.banner).clone();
    if let Some(banner) = banner {
        if write_line(&mut write_half, &banner).await.is_err() {
            return;
        }
    }

    let mut buf = String::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut buf) => read,
            changed = online.changed() => {
                if changed.is_err() || !*online.borrow() {
                    tracing::debug!(connection = index, "mock server going offline");
                    return;
                }
                continue;
            }
        };

        match read {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection = index, error = %e, "mock server read failed");
                return;
            }
        }

        if !*online.borrow() {
            return;
        }

        let line = buf.trim_end_matches(['\r', '\n']).to_string();
        lock(&shared.received).push(ReceivedLine {
            line: line.clone(),
            at: Instant::now(),
            connection: index,
        });

        match shared.next_reply(&line) {
            Some(Reply::Line(reply)) => {
                if write_line(&mut write_half, &reply).await.is_err() {
                    return;
                }
            }
            Some(Reply::Silent) | None => {}
            Some(Reply::Hangup) => return,
        }
    }
}

async fn write_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    line: &str,
) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}
