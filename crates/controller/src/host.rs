//! Interfaces the controller needs from its host compositor.

use crate::client::{ClientId, ClientSignal};
use crate::tile::Tile;
use std::time::Duration;

/// Current workspace state and the per-screen tile roots.
pub trait WorkspaceContext {
    fn current_activity(&self) -> &str;

    fn current_desktop(&self) -> u32;

    /// Number of screens; screens are indexed `0..num_screens()`.
    fn num_screens(&self) -> usize;

    /// The root tile a screen's layout is built into.
    fn root_tile_mut(&mut self, screen: usize) -> Option<&mut Tile>;
}

/// Delivers client change notifications to the controller.
///
/// After `subscribe(client, signal)` the host must route that client's
/// `signal` notifications to [`Controller::handle_signal`].
///
/// [`Controller::handle_signal`]: crate::Controller::handle_signal
pub trait EventSource {
    fn subscribe(&mut self, client: ClientId, signal: ClientSignal);
}

/// Handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Work to perform when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Re-evaluate a client's tile after it settled.
    TileCheck(ClientId),
}

impl TimerTask {
    pub fn client(&self) -> ClientId {
        match self {
            TimerTask::TileCheck(client) => *client,
        }
    }
}

/// One-shot timers.
///
/// When a timer fires the host must call
/// [`Controller::on_tile_check_due`] with the timer's id. Cancelled timers
/// must not fire.
///
/// [`Controller::on_tile_check_due`]: crate::Controller::on_tile_check_due
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId;

    fn cancel(&mut self, timer: TimerId);
}

/// Borrowed host collaborators passed to every controller operation.
pub struct Host<'a> {
    pub workspace: &'a mut dyn WorkspaceContext,
    pub events: &'a mut dyn EventSource,
    pub scheduler: &'a mut dyn Scheduler,
}
