// hdfury command-line tool -- exercises device sessions against real
// hardware from the shell.
//
// Usage:
//   hdfury-cli models
//   hdfury-cli --host 192.168.1.100 --model vrroom version
//   hdfury-cli --host 192.168.1.100 source "HDMI 2"
//   hdfury-cli --host 192.168.1.100 send "get status"
//   hdfury-cli --config-dir ~/.hdfury --host 192.168.1.100 --name Den add
//   hdfury-cli --config-dir ~/.hdfury devices
//   hdfury-cli --config-dir ~/.hdfury --device hdfury-192-168-1-100 watch --seconds 60

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hdfury::{
    models, DeviceConfig, DeviceSession, DeviceStore, HdfuryClient, Intent, JsonFileStore,
    ModelId, SessionBuilder, SessionSnapshot, StatusCode,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// hdfury command-line tool -- control HDFury devices over TCP.
#[derive(Parser)]
#[command(name = "hdfury-cli", version, about)]
struct Cli {
    /// Directory holding config.json with the configured devices.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Device IP address or hostname.
    #[arg(long)]
    host: Option<String>,

    /// TCP port. Defaults to the model's port.
    #[arg(long)]
    port: Option<u16>,

    /// Model family (vrroom, vertex2, vertex, diva, maestro, arcana2, dr8k).
    #[arg(long, default_value = "vrroom")]
    model: ModelId,

    /// Friendly name used when adding a device.
    #[arg(long)]
    name: Option<String>,

    /// Identifier of a configured device (see `devices`), instead of --host.
    #[arg(long, conflicts_with = "host")]
    device: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported model families.
    Models,

    /// List configured devices.
    Devices,

    /// Add the device given by --host/--port/--model/--name to the config.
    Add,

    /// Send one raw command line and print the reply.
    Send {
        /// Command text, e.g. "get ver".
        line: String,
    },

    /// Query the firmware version.
    Version,

    /// Query the device status.
    Status,

    /// Select an input, or list the inputs when no name is given.
    Source { name: Option<String> },

    /// Reboot the device.
    Reboot,

    /// Start a session and print every state change.
    Watch {
        /// Stop after this many seconds (default: until Ctrl-C).
        #[arg(long)]
        seconds: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolve the target device from --device or --host.
async fn resolve_device(cli: &Cli) -> Result<DeviceConfig> {
    if let Some(identifier) = &cli.device {
        let store = JsonFileStore::open(&cli.config_dir).await?;
        return store.get(identifier).await.with_context(|| {
            format!(
                "no device '{identifier}' in {}",
                store.path().display()
            )
        });
    }

    let Some(host) = &cli.host else {
        bail!("--host or --device is required for this command");
    };
    let model = models::get(cli.model);
    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| format!("HDFury {}", model.display_name));
    Ok(DeviceConfig::new(
        &name,
        host,
        cli.port.unwrap_or(model.default_port),
        cli.model,
    ))
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let mut line = format!(
        "[{}] {} -- {}",
        snapshot.availability, snapshot.name, snapshot.title
    );
    if !snapshot.subtitle.is_empty() {
        line.push_str(&format!(" ({})", snapshot.subtitle));
    }
    if let Some(source) = &snapshot.current_source {
        line.push_str(&format!(" source={source}"));
    }
    println!("{line}");
    if !snapshot.detail.is_empty() {
        println!("    {}", snapshot.detail);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_models() -> Result<()> {
    println!(
        "{:<10}  {:<12}  {:>5}  {:>6}  Sources",
        "Id", "Model", "Port", "Inputs"
    );
    println!(
        "{:<10}  {:<12}  {:>5}  {:>6}  -------",
        "-".repeat(10),
        "-".repeat(12),
        "-----",
        "------"
    );
    for model in hdfury::supported_models() {
        let sources = model.source_list();
        println!(
            "{:<10}  {:<12}  {:>5}  {:>6}  {}",
            model.id.as_str(),
            model.display_name,
            model.default_port,
            model.input_count,
            if sources.is_empty() {
                "-".to_string()
            } else {
                sources.join(", ")
            }
        );
    }
    Ok(())
}

async fn cmd_devices(cli: &Cli) -> Result<()> {
    let store = JsonFileStore::open(&cli.config_dir).await?;
    let devices = store.all().await;
    if devices.is_empty() {
        println!("No devices configured in {}.", store.path().display());
        return Ok(());
    }
    for device in &devices {
        println!(
            "{:<24}  {:<20}  {}:{}  {}",
            device.identifier, device.name, device.host, device.port, device.model_id
        );
    }
    Ok(())
}

async fn cmd_add(cli: &Cli) -> Result<()> {
    let device = resolve_device(cli).await?;
    let store = JsonFileStore::open(&cli.config_dir).await?;

    // Probe first so a typo'd address is not persisted.
    let client = HdfuryClient::new(&device.host, device.port, device.model());
    client
        .connect()
        .await
        .with_context(|| format!("cannot reach {}:{}", device.host, device.port))?;
    client.disconnect().await;

    if store.add(device.clone()).await? {
        println!("Added {} ({})", device.name, device.identifier);
    } else {
        println!("{} is already configured", device.identifier);
    }
    Ok(())
}

async fn cmd_send(device: &DeviceConfig, line: &str) -> Result<()> {
    let client = HdfuryClient::new(&device.host, device.port, device.model());
    let reply = client.send_command(line).await;
    client.disconnect().await;
    println!("{}", reply?);
    Ok(())
}

async fn start_session(device: &DeviceConfig) -> Result<DeviceSession> {
    let session = SessionBuilder::from_device_config(device).build()?;
    session.start().await;
    let snapshot = session.snapshot().await;
    if !snapshot.is_available() {
        session.stop().await;
        bail!("{}: {} {}", snapshot.name, snapshot.title, snapshot.detail);
    }
    Ok(session)
}

async fn cmd_intent(device: &DeviceConfig, intent: Intent) -> Result<()> {
    let session = start_session(device).await?;
    let query = intent.is_query();
    let status = session.handle_command(Some(intent)).await;
    let snapshot = session.snapshot().await;
    session.stop().await;

    if status != StatusCode::Ok {
        bail!("command failed: {status}");
    }
    if query {
        println!("{}", snapshot.detail);
    } else {
        println!("{status}");
    }
    Ok(())
}

fn cmd_source_list(device: &DeviceConfig) -> Result<()> {
    let sources = device.model().source_list();
    if sources.is_empty() {
        println!("{} has no selectable inputs.", device.model().display_name);
    }
    for source in sources {
        println!("{source}");
    }
    Ok(())
}

async fn cmd_watch(device: &DeviceConfig, seconds: Option<u64>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionSnapshot>();
    let session = SessionBuilder::from_device_config(device)
        .observer(tx)
        .build()?;
    session.start().await;

    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            snapshot = rx.recv() => match snapshot {
                Some(snapshot) => print_snapshot(&snapshot),
                None => break,
            },
        }
    }

    session.stop().await;
    while let Ok(snapshot) = rx.try_recv() {
        print_snapshot(&snapshot);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Models => return cmd_models(),
        Command::Devices => return cmd_devices(&cli).await,
        Command::Add => return cmd_add(&cli).await,
        _ => {}
    }

    let device = resolve_device(&cli).await?;

    match &cli.command {
        Command::Send { line } => cmd_send(&device, line).await,
        Command::Version => cmd_intent(&device, Intent::QueryFirmware).await,
        Command::Status => cmd_intent(&device, Intent::QueryStatus).await,
        Command::Source { name: None } => cmd_source_list(&device),
        Command::Source { name: Some(name) } => {
            cmd_intent(&device, Intent::SelectSource(name.clone())).await
        }
        Command::Reboot => cmd_intent(&device, Intent::Reboot).await,
        Command::Watch { seconds } => cmd_watch(&device, *seconds).await,
        Command::Models => unreachable!("models handled above"),
        Command::Devices => unreachable!("devices handled above"),
        Command::Add => unreachable!("add handled above"),
    }
}
