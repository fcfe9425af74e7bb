//! Tessellate Daemon
//!
//! Main daemon process for the Tessellate tiling overlay.
//!
//! Responsibilities:
//! - Accept the compositor bridge on a Unix socket
//! - Mirror compositor state reported by the bridge
//! - Drive the tiling controller and its debounce timers
//! - Send computed layouts back to the bridge

mod config;
mod scheduler;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use scheduler::TokioScheduler;
use session::{Session, SessionSettings};
use std::path::{Path, PathBuf};
use tessellate_controller::{TimerId, TimerTask};
use tessellate_ipc::{
    decode_line, encode_line, socket_path, BridgeCommand, BridgeEvent, MAX_MESSAGE_SIZE,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "tessellate", version, about = "Dynamic tiling overlay daemon")]
struct Args {
    /// Configuration file; the standard locations are searched when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bridge socket path.
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Log level override: trace, debug, info, warn, error.
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Events that the daemon event loop processes.
pub enum DaemonEvent {
    /// A bridge connected; commands for it go through the sender.
    BridgeConnected(mpsc::Sender<BridgeCommand>),
    /// An event from the connected bridge.
    Bridge(BridgeEvent),
    /// The bridge connection closed.
    BridgeDisconnected,
    /// A scheduler timer elapsed.
    TimerFired(TimerId, TimerTask),
    /// Shutdown signal.
    Shutdown,
}

/// Capacity of the main event channel.
const EVENT_QUEUE: usize = 256;

/// Capacity of the per-bridge command channel.
const COMMAND_QUEUE: usize = 256;

fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Bind the bridge socket, replacing a stale socket file.
///
/// Returns `Ok(None)` when another daemon already listens on the path.
async fn bind_socket(path: &Path) -> Result<Option<UnixListener>> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Ok(None);
        }
        debug!("Removing stale socket {}", path.display());
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket: {}", path.display()))?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind socket: {}", path.display()))?;
    Ok(Some(listener))
}

/// Accept bridges one at a time.
async fn run_bridge_server(listener: UnixListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!("Failed to accept bridge connection: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        info!("Bridge connected");
        if let Err(e) = handle_bridge(stream, &event_tx).await {
            warn!("Bridge handler error: {:#}", e);
        }
        if event_tx.send(DaemonEvent::BridgeDisconnected).await.is_err() {
            break; // Daemon shutting down
        }
    }
}

/// Pump one bridge connection until it closes.
async fn handle_bridge(stream: UnixStream, event_tx: &mpsc::Sender<DaemonEvent>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (command_tx, mut command_rx) = mpsc::channel::<BridgeCommand>(COMMAND_QUEUE);

    let writer_task = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            let line = match encode_line(&command) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Dropping bridge command: {}", e);
                    continue;
                }
            };
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Failed to write to bridge: {}", e);
                break;
            }
        }
    });

    let reply_tx = command_tx.clone();
    if event_tx
        .send(DaemonEvent::BridgeConnected(command_tx))
        .await
        .is_err()
    {
        writer_task.abort();
        return Ok(());
    }

    let result = read_bridge_events(reader, event_tx, &reply_tx).await;
    drop(reply_tx);
    writer_task.abort();
    result
}

/// Read newline-delimited events, forwarding each to the event loop.
async fn read_bridge_events(
    reader: tokio::net::unix::OwnedReadHalf,
    event_tx: &mpsc::Sender<DaemonEvent>,
    reply_tx: &mpsc::Sender<BridgeCommand>,
) -> Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        // Bound each line so a misbehaving bridge cannot grow the buffer
        let bytes_read = (&mut reader)
            .take(MAX_MESSAGE_SIZE as u64)
            .read_line(&mut line)
            .await
            .context("Failed to read from bridge")?;
        if bytes_read == 0 {
            return Ok(()); // Bridge disconnected
        }
        if !line.ends_with('\n') && bytes_read >= MAX_MESSAGE_SIZE {
            anyhow::bail!("Bridge message exceeds {} bytes", MAX_MESSAGE_SIZE);
        }
        if line.trim().is_empty() {
            continue;
        }

        match decode_line::<BridgeEvent>(&line) {
            Ok(event) => {
                debug!("Bridge event: {:?}", event);
                if event_tx.send(DaemonEvent::Bridge(event)).await.is_err() {
                    return Ok(()); // Daemon shutting down
                }
            }
            Err(e) => {
                warn!("Invalid bridge event: {}", e);
                let _ = reply_tx
                    .send(BridgeCommand::error(format!("Invalid event: {}", e)))
                    .await;
            }
        }
    }
}

/// Forward commands to the connected bridge, if any.
async fn send_commands(bridge: &Option<mpsc::Sender<BridgeCommand>>, commands: Vec<BridgeCommand>) {
    let Some(bridge) = bridge else {
        if !commands.is_empty() {
            debug!("No bridge connected, dropping {} command(s)", commands.len());
        }
        return;
    };
    for command in commands {
        if bridge.send(command).await.is_err() {
            warn!("Bridge command channel closed");
            return;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for log level)
    let loaded = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });
    let config_warnings = config.validate();

    let log_level = parse_log_level(args.log_level.as_deref().unwrap_or(&config.behavior.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("Tessellate daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: engine={:?}, timer_delay_ms={}, gap={}, outer_gap={}, rules={}",
        config.tiling.engine_type,
        config.tiling.timer_delay_ms,
        config.layout.gap,
        config.layout.outer_gap,
        config.window_rules.len()
    );

    let socket = args
        .socket
        .clone()
        .or_else(|| config.behavior.socket_path.clone())
        .unwrap_or_else(socket_path);
    let Some(listener) = bind_socket(&socket).await? else {
        error!("Another tessellate daemon is already listening on {}", socket.display());
        return Ok(());
    };
    info!("Bridge socket listening on {}", socket.display());

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(EVENT_QUEUE);

    let mut session = Session::new(
        SessionSettings::from_config(&config),
        TokioScheduler::new(event_tx.clone()),
    );

    let server_tx = event_tx.clone();
    let server = tokio::spawn(async move {
        run_bridge_server(listener, server_tx).await;
    });

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }
    drop(event_tx);

    let mut bridge: Option<mpsc::Sender<BridgeCommand>> = None;

    // Main event loop
    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::BridgeConnected(sender) => {
                bridge = Some(sender);
            }
            DaemonEvent::Bridge(bridge_event) => {
                let commands = session.handle_event(bridge_event);
                send_commands(&bridge, commands).await;
            }
            DaemonEvent::TimerFired(timer, task) => {
                let commands = session.timer_fired(timer, task);
                send_commands(&bridge, commands).await;
            }
            DaemonEvent::BridgeDisconnected => {
                info!(
                    "Bridge disconnected ({} clients, {} drivers)",
                    session.client_count(),
                    session.controller().manager().driver_count()
                );
                bridge = None;
            }
            DaemonEvent::Shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    server.abort();
    let scheduler = session.scheduler_mut();
    debug!("Cancelling {} pending timer(s)", scheduler.active());
    scheduler.cancel_all();
    if let Err(e) = std::fs::remove_file(&socket) {
        warn!("Failed to remove socket {}: {}", socket.display(), e);
    }

    info!("Tessellate daemon shutting down.");
    Ok(())
}
