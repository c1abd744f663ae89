//! TCP protocol client for HDFury devices.
//!
//! [`HdfuryClient`] owns one persistent TCP connection to a device and
//! exchanges `\r\n`-terminated ASCII command lines with it, one request and
//! one reply at a time.
//!
//! HDFury firmware drops idle sockets without a close handshake, so a socket
//! that looks healthy may be dead. The client compensates in two ways:
//!
//! - **Proactive reconnect**: if the connection has been idle for longer
//!   than [`ClientOptions::idle_reconnect_after`], the next command tears it
//!   down and dials fresh before sending.
//! - **Retry once**: a read timeout or connection error forces a disconnect
//!   and the whole command (dial, write, read) is retried exactly once.
//!   Any other failure disconnects and propagates immediately.
//!
//! # Example
//!
//! ```no_run
//! use hdfury_client::HdfuryClient;
//! use hdfury_core::models;
//!
//! # async fn example() -> hdfury_core::Result<()> {
//! let client = HdfuryClient::new("192.168.1.100", 2222, models::vrroom());
//! client.connect().await?;
//!
//! let version = client.send_command("get ver").await?;
//! client.select_source("HDMI 2").await?;
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use hdfury_core::error::{Error, Result};
use hdfury_core::{AudioDelayStep, CecRole, Intent, ModelConfig};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::commands;

/// Prompt marker some firmware prefixes to reply lines.
const PROMPT: char = '>';

/// Upper bound on bytes read while draining the welcome banner.
const BANNER_BUF_LEN: usize = 2048;

/// Timeouts and reconnect policy for [`HdfuryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Maximum time to establish the TCP connection.
    pub connect_timeout: Duration,
    /// How long to wait for an unsolicited welcome banner after connecting.
    pub banner_timeout: Duration,
    /// Idle period after which the next command forces a fresh dial.
    pub idle_reconnect_after: Duration,
    /// Reply timeout for `set ...` commands, which the device is slower to
    /// acknowledge.
    pub set_timeout: Duration,
    /// Reply timeout for queries and everything else.
    pub query_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            connect_timeout: Duration::from_secs(10),
            banner_timeout: Duration::from_secs(1),
            idle_reconnect_after: Duration::from_secs(600),
            set_timeout: Duration::from_secs(8),
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientOptions {
    /// Reply timeout for `command`.
    pub fn timeout_for(&self, command: &str) -> Duration {
        if command.trim_start().starts_with("set") {
            self.set_timeout
        } else {
            self.query_timeout
        }
    }
}

/// An established connection. Both halves exist together or not at all.
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    last_activity: Instant,
}

/// Client for one HDFury device.
///
/// All methods take `&self`; the client is meant to be shared behind an
/// `Arc` between a command worker and a liveness task. Two locks guard it:
/// `command_lock` keeps at most one request/reply exchange on the wire, and
/// the connection slot lock prevents concurrent dials.
pub struct HdfuryClient {
    host: String,
    port: u16,
    model: ModelConfig,
    options: ClientOptions,
    conn: Mutex<Option<Connection>>,
    connected: AtomicBool,
    command_lock: Mutex<()>,
}

impl HdfuryClient {
    /// Create a disconnected client with default options.
    pub fn new(host: &str, port: u16, model: ModelConfig) -> Self {
        Self::with_options(host, port, model, ClientOptions::default())
    }

    /// Create a disconnected client with explicit timeouts.
    pub fn with_options(host: &str, port: u16, model: ModelConfig, options: ClientOptions) -> Self {
        HdfuryClient {
            host: host.to_string(),
            port,
            model,
            options,
            conn: Mutex::new(None),
            connected: AtomicBool::new(false),
            command_lock: Mutex::new(()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, for logging.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// True iff a connection is established and not being torn down.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Connect to the device. A no-op if already connected.
    ///
    /// Any unsolicited welcome banner is drained; its absence is not an
    /// error.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.conn.lock().await;
        self.open(&mut slot).await
    }

    /// Close the connection. Idempotent, and never fails: close-time errors
    /// are logged and the client always ends disconnected.
    pub async fn disconnect(&self) {
        let mut slot = self.conn.lock().await;
        self.close(&mut slot).await;
    }

    async fn open(&self, slot: &mut Option<Connection>) -> Result<()> {
        if slot.is_some() {
            return Ok(());
        }

        let addr = self.addr();
        tracing::info!(
            addr = %addr,
            timeout_ms = self.options.connect_timeout.as_millis(),
            "Connecting to device"
        );

        match self.dial(&addr).await {
            Ok(conn) => {
                *slot = Some(conn);
                self.connected.store(true, Ordering::Release);
                tracing::info!(addr = %addr, "Connected");
                Ok(())
            }
            Err(e) => {
                tracing::error!(addr = %addr, error = %e, "Connection failed");
                self.connected.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn dial(&self, addr: &str) -> Result<Connection> {
        let stream = tokio::time::timeout(
            self.options.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| Error::Connection(format!("connect to {addr} timed out")))?
        .map_err(|e| map_connect_error(e, addr))?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        let (read_half, writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut banner = [0u8; BANNER_BUF_LEN];
        match tokio::time::timeout(self.options.banner_timeout, reader.read(&mut banner)).await {
            Ok(Ok(0)) => {
                // Peer already closed; the first command will find out.
                tracing::debug!(addr = %addr, "Peer closed before banner");
            }
            Ok(Ok(n)) => {
                tracing::debug!(addr = %addr, bytes = n, "Cleared welcome banner");
            }
            Ok(Err(e)) => return Err(map_io_error(e)),
            Err(_) => {}
        }

        Ok(Connection {
            reader,
            writer,
            last_activity: Instant::now(),
        })
    }

    async fn close(&self, slot: &mut Option<Connection>) {
        let Some(mut conn) = slot.take() else {
            return;
        };
        self.connected.store(false, Ordering::Release);
        tracing::info!(addr = %self.addr(), "Disconnecting");

        if let Err(e) = conn.writer.shutdown().await {
            tracing::debug!(
                addr = %self.addr(),
                error = %e,
                "Error during disconnect (ignored)"
            );
        }
    }

    /// Send one command line and return the normalized reply.
    ///
    /// Timeouts and connection errors force a disconnect and retry the
    /// command once from scratch; a second failure propagates. Other errors
    /// disconnect and propagate without retrying.
    pub async fn send_command(&self, command: &str) -> Result<String> {
        let _guard = self.command_lock.lock().await;

        let mut retried = false;
        loop {
            match self.exchange(command).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && !retried => {
                    tracing::warn!(
                        command = %command,
                        error = %e,
                        "Command failed, reconnecting and retrying once"
                    );
                    self.disconnect().await;
                    retried = true;
                }
                Err(e) => {
                    tracing::error!(
                        command = %command,
                        error = %e,
                        retried,
                        "Command failed"
                    );
                    self.disconnect().await;
                    return Err(e);
                }
            }
        }
    }

    async fn exchange(&self, command: &str) -> Result<String> {
        let mut slot = self.conn.lock().await;
        self.ensure_connection(&mut slot).await?;
        let conn = slot.as_mut().ok_or(Error::NotConnected)?;

        let timeout = self.options.timeout_for(command);
        tracing::debug!(
            command = %command,
            timeout_ms = timeout.as_millis(),
            "Sending command"
        );

        conn.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await
            .map_err(map_io_error)?;
        conn.writer.flush().await.map_err(map_io_error)?;

        let mut line = Vec::new();
        let n = tokio::time::timeout(timeout, conn.reader.read_until(b'\n', &mut line))
            .await
            .map_err(|_| {
                tracing::warn!(
                    command = %command,
                    timeout_ms = timeout.as_millis(),
                    "No reply, connection may be stale"
                );
                Error::Timeout
            })?
            .map_err(map_io_error)?;

        if n == 0 {
            tracing::warn!(addr = %self.addr(), "Peer closed connection");
            return Err(Error::ConnectionLost);
        }
        if !line.is_ascii() {
            return Err(Error::Protocol(format!(
                "non-ASCII reply to '{command}': {line:02X?}"
            )));
        }

        let reply = normalize_reply(&String::from_utf8_lossy(&line));
        conn.last_activity = Instant::now();
        tracing::trace!(command = %command, reply = %reply, "Received reply");
        Ok(reply)
    }

    async fn ensure_connection(&self, slot: &mut Option<Connection>) -> Result<()> {
        if let Some(conn) = slot.as_ref() {
            let idle = conn.last_activity.elapsed();
            if idle > self.options.idle_reconnect_after {
                tracing::info!(
                    addr = %self.addr(),
                    idle_secs = idle.as_secs(),
                    "Proactive reconnect after inactivity"
                );
                self.close(slot).await;
            }
        }
        self.open(slot).await
    }

    /// Translate `intent` for this model and send the resulting command
    /// lines in order. Returns the reply to the last line.
    pub async fn execute(&self, intent: &Intent) -> Result<String> {
        let lines = commands::build(&self.model, intent)?;
        let mut reply = String::new();
        for line in &lines {
            reply = self.send_command(line).await?;
        }
        Ok(reply)
    }

    async fn apply(&self, intent: Intent) -> Result<()> {
        self.execute(&intent).await.map(|_| ())
    }

    /// Probe the connection with a lightweight query. Never fails; any
    /// error is logged and reported as `false`.
    pub async fn heartbeat(&self) -> bool {
        let probe = commands::cmd_heartbeat(&self.model);
        match self.send_command(&probe).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(addr = %self.addr(), error = %e, "Heartbeat failed");
                false
            }
        }
    }

    // ---------------------------------------------------------------
    // Typed operations
    // ---------------------------------------------------------------

    pub async fn select_source(&self, source: &str) -> Result<()> {
        self.apply(Intent::SelectSource(source.to_string())).await
    }

    pub async fn route_matrix(&self, output: u8, source: &str) -> Result<()> {
        self.apply(Intent::RouteMatrix {
            output,
            source: source.to_string(),
        })
        .await
    }

    pub async fn set_edid_mode(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetEdidMode(mode.to_string())).await
    }

    pub async fn set_edid_audio(&self, source: &str) -> Result<()> {
        self.apply(Intent::SetEdidAudio(source.to_string())).await
    }

    pub async fn load_edid_slot(&self, slot: u8) -> Result<()> {
        self.apply(Intent::LoadEdidSlot(slot)).await
    }

    pub async fn save_edid_slot(&self, slot: u8) -> Result<()> {
        self.apply(Intent::SaveEdidSlot(slot)).await
    }

    pub async fn set_color_space(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetColorSpace(mode.to_string())).await
    }

    pub async fn set_deep_color(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetDeepColor(mode.to_string())).await
    }

    pub async fn set_output_resolution(&self, resolution: &str) -> Result<()> {
        self.apply(Intent::SetOutputResolution(resolution.to_string()))
            .await
    }

    pub async fn set_hdr_custom(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetHdrCustom(on)).await
    }

    pub async fn set_hdr_disable(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetHdrDisable(on)).await
    }

    pub async fn set_cec(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetCec(on)).await
    }

    pub async fn set_cec_logical_address(&self, role: CecRole) -> Result<()> {
        self.apply(Intent::SetCecLogicalAddress(role)).await
    }

    pub async fn set_earc_force(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetEarcForce(mode.to_string())).await
    }

    pub async fn set_oled(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetOled(on)).await
    }

    pub async fn set_oled_page(&self, page: i32) -> Result<()> {
        self.apply(Intent::SetOledPage(page)).await
    }

    pub async fn set_oled_fade(&self, fade: i32) -> Result<()> {
        self.apply(Intent::SetOledFade(fade)).await
    }

    pub async fn set_autoswitch(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetAutoswitch(on)).await
    }

    pub async fn set_hdcp_mode(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetHdcpMode(mode.to_string())).await
    }

    pub async fn set_scale_mode(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetScaleMode(mode.to_string())).await
    }

    pub async fn set_audio_mode(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetAudioMode(mode.to_string())).await
    }

    pub async fn adjust_audio_delay(&self, step: AudioDelayStep) -> Result<()> {
        self.apply(Intent::AdjustAudioDelay(step)).await
    }

    pub async fn reset_audio_delay(&self) -> Result<()> {
        self.apply(Intent::ResetAudioDelay).await
    }

    pub async fn set_led_mode(&self, mode: &str) -> Result<()> {
        self.apply(Intent::SetLedMode(mode.to_string())).await
    }

    pub async fn set_led_brightness(&self, value: i32) -> Result<()> {
        self.apply(Intent::SetLedBrightness(value)).await
    }

    pub async fn set_analog_volume(&self, volume: i32) -> Result<()> {
        self.apply(Intent::SetAnalogVolume(volume)).await
    }

    pub async fn set_analog_bass(&self, bass: i32) -> Result<()> {
        self.apply(Intent::SetAnalogBass(bass)).await
    }

    pub async fn set_analog_treble(&self, treble: i32) -> Result<()> {
        self.apply(Intent::SetAnalogTreble(treble)).await
    }

    pub async fn mute_tx_audio(&self, tx: u8, muted: bool) -> Result<()> {
        self.apply(Intent::MuteTxAudio { tx, muted }).await
    }

    pub async fn set_tx_plus5(&self, tx: u8, on: bool) -> Result<()> {
        self.apply(Intent::SetTxPlus5 { tx, on }).await
    }

    pub async fn set_htpc_mode(&self, input: u8, on: bool) -> Result<()> {
        self.apply(Intent::SetHtpcMode { input, on }).await
    }

    pub async fn set_avi_custom(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetAviCustom(on)).await
    }

    pub async fn set_avi_disable(&self, on: bool) -> Result<()> {
        self.apply(Intent::SetAviDisable(on)).await
    }

    pub async fn reboot(&self) -> Result<()> {
        self.apply(Intent::Reboot).await
    }

    /// Factory reset with mode 1, 2 or 3. Other modes are rejected before
    /// any connection is made.
    pub async fn factory_reset(&self, mode: u8) -> Result<()> {
        self.apply(Intent::FactoryReset(mode)).await
    }

    pub async fn hotplug(&self) -> Result<()> {
        self.apply(Intent::Hotplug).await
    }

    pub async fn firmware_version(&self) -> Result<String> {
        self.execute(&Intent::QueryFirmware).await
    }

    pub async fn device_status(&self) -> Result<String> {
        self.execute(&Intent::QueryStatus).await
    }
}

/// Strip prompt markers and surrounding whitespace from a reply line.
pub fn normalize_reply(raw: &str) -> String {
    raw.trim_matches(|c: char| c == PROMPT || c.is_whitespace())
        .to_string()
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Connection(format!("connection refused: {addr}"))
        }
        _ => Error::Connection(format!("{addr}: {e}")),
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
