//! Tessellate Controller
//!
//! Reconciliation core of the Tessellate tiling overlay.
//!
//! This crate keeps one tiling driver per (screen, activity, virtual desktop)
//! domain in sync with the compositor's clients:
//! - [`Desktop`] identifies a tiling domain
//! - [`DriverManager`] lazily owns one driver per domain and routes
//!   add/remove/place/rebuild operations to it
//! - [`Controller`] installs per-client hooks, diffs domain membership on
//!   change events and debounces tile changes
//!
//! The compositor is reached only through [`WorkspaceContext`],
//! [`EventSource`] and [`Scheduler`].

mod client;
mod controller;
mod desktop;
mod driver;
mod error;
mod hooks;
mod host;
mod manager;
mod tile;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientId, ClientSignal};
pub use controller::{Controller, ControllerConfig, DEFAULT_TILE_CHECK_DELAY};
pub use desktop::Desktop;
pub use driver::{DriverFactory, EngineDriver, EngineDriverFactory, TilingDriver};
pub use error::{ControllerError, DriverError};
pub use host::{EventSource, Host, Scheduler, TimerId, TimerTask, WorkspaceContext};
pub use manager::DriverManager;
pub use tile::{Tile, TileId, TileRef};

pub use tessellate_layout::{Direction, EngineSettings, EngineType, Rect};
