//! Tessellate Bridge Protocol
//!
//! Shared types for communication between the compositor bridge script and
//! the daemon over a Unix domain socket.
//!
//! The protocol is newline-delimited JSON: every message is one JSON object
//! on its own line. Events flow from the bridge to the daemon, commands flow
//! back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// File name of the bridge socket inside the runtime directory.
pub const SOCKET_NAME: &str = "tessellate.sock";

/// Maximum size of a single protocol line in bytes, newline included.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default socket location: `$XDG_RUNTIME_DIR/tessellate.sock`, or the
/// temp directory when no runtime directory is set.
pub fn socket_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_NAME)
}

/// Errors raised while framing protocol lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message of {0} bytes exceeds the size limit")]
    TooLarge(usize),

    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a message into one protocol line, trailing newline included.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(line.len()));
    }
    Ok(line)
}

/// Parse one protocol line. Surrounding whitespace is ignored.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(line.len()));
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// A rectangle in compositor coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IpcRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IpcRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A tile a client sits in, as reported by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub screen: usize,
    /// 0 is the screen's root tile, `n` its `n - 1`th child.
    pub index: usize,
    /// Whether the tile was created by the tiler.
    pub managed: bool,
    pub geometry: IpcRect,
}

/// A client window as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: u64,
    #[serde(default)]
    pub resource_class: String,
    #[serde(default)]
    pub caption: String,
    pub screen: usize,
    /// Activities the client is on. Empty means none.
    #[serde(default)]
    pub activities: Vec<String>,
    pub desktop: u32,
    #[serde(default)]
    pub tile: Option<TileInfo>,
}

/// Per-client change notifications the daemon can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DesktopChanged,
    ActivitiesChanged,
    ScreenChanged,
    TileChanged,
}

/// Events sent from the bridge to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// First message of a session: full compositor state.
    Hello {
        activity: String,
        desktop: u32,
        /// Tiling area of each screen, indexed by screen number.
        screens: Vec<IpcRect>,
        /// Clients that already exist.
        #[serde(default)]
        clients: Vec<ClientInfo>,
    },
    /// Screens were added, removed or resized.
    ScreensChanged { screens: Vec<IpcRect> },
    /// The current activity or virtual desktop changed.
    CurrentChanged { activity: String, desktop: u32 },
    ClientAdded { client: ClientInfo },
    ClientRemoved { id: u64 },
    DesktopChanged { id: u64, desktop: u32 },
    ActivitiesChanged { id: u64, activities: Vec<String> },
    ScreenChanged { id: u64, screen: usize },
    /// The client's tile reference changed; `None` means no tile.
    TileChanged {
        id: u64,
        #[serde(default)]
        tile: Option<TileInfo>,
    },
    /// An activity was deleted.
    ActivityRemoved { activity: String },
}

/// A tile of a computed layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTile {
    pub index: usize,
    pub geometry: IpcRect,
    /// Windows in the tile, front-most first.
    pub windows: Vec<u64>,
}

/// Commands sent from the daemon to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// Start forwarding `signal` for client `id`.
    Subscribe { id: u64, signal: SignalKind },
    /// Replace the managed tiles of a screen.
    SetLayout { screen: usize, tiles: Vec<LayoutTile> },
    /// The daemon could not process a line.
    Error { message: String },
}

impl BridgeCommand {
    /// Create an error command.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
