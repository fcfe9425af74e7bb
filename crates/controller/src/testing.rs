//! Hand-written fakes of the host collaborators, shared by the unit tests.

use crate::client::{Client, ClientId, ClientSignal};
use crate::driver::{DriverFactory, TilingDriver};
use crate::error::DriverError;
use crate::host::{EventSource, Scheduler, TimerId, TimerTask, WorkspaceContext};
use crate::tile::{Tile, TileId, TileRef};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;
use tessellate_layout::{Direction, EngineType, Rect};

pub const ACTIVITY: &str = "main";
pub const DESKTOP: u32 = 1;

/// A workspace with `screens` side-by-side 1920x1080 screens.
pub struct FakeWorkspace {
    pub activity: String,
    pub desktop: u32,
    pub screens: usize,
    pub roots: Vec<Tile>,
}

impl FakeWorkspace {
    pub fn new(screens: usize) -> Self {
        Self {
            activity: ACTIVITY.to_string(),
            desktop: DESKTOP,
            screens,
            roots: (0..screens)
                .map(|s| Tile::root(s, Rect::new(s as i32 * 1920, 0, 1920, 1080)))
                .collect(),
        }
    }
}

impl WorkspaceContext for FakeWorkspace {
    fn current_activity(&self) -> &str {
        &self.activity
    }

    fn current_desktop(&self) -> u32 {
        self.desktop
    }

    fn num_screens(&self) -> usize {
        self.screens
    }

    fn root_tile_mut(&mut self, screen: usize) -> Option<&mut Tile> {
        self.roots.get_mut(screen)
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub subscriptions: Vec<(ClientId, ClientSignal)>,
}

impl EventSource for RecordingEvents {
    fn subscribe(&mut self, client: ClientId, signal: ClientSignal) {
        self.subscriptions.push((client, signal));
    }
}

/// Timers fire only when a test asks for it.
#[derive(Default)]
pub struct ManualScheduler {
    next_id: u64,
    pub pending: Vec<(TimerId, Duration, TimerTask)>,
    pub cancelled: Vec<TimerId>,
}

impl ManualScheduler {
    /// Pop the oldest pending timer.
    pub fn pop_due(&mut self) -> Option<(TimerId, TimerTask)> {
        if self.pending.is_empty() {
            return None;
        }
        let (id, _, task) = self.pending.remove(0);
        Some((id, task))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push((id, delay, task));
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.retain(|(id, _, _)| *id != timer);
        self.cancelled.push(timer);
    }
}

/// Operations observed by [`RecordingFactory`] drivers. `driver` is the
/// creation index of the driver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Build {
        driver: usize,
        root: TileId,
    },
    Add {
        driver: usize,
        client: ClientId,
    },
    Remove {
        driver: usize,
        client: ClientId,
    },
    Put {
        driver: usize,
        client: ClientId,
        tile: TileId,
        direction: Option<Direction>,
    },
}

#[derive(Default)]
struct Recorder {
    calls: Vec<DriverCall>,
    created: usize,
    fail_adds_on: Option<usize>,
    fail_builds: bool,
}

/// Builds drivers that log every call into a shared recorder.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    recorder: Rc<RefCell<Recorder>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.recorder.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.recorder.borrow_mut().calls.clear();
    }

    /// Make `add_client` fail on the driver created `driver`th.
    pub fn fail_adds_on(&self, driver: usize) {
        self.recorder.borrow_mut().fail_adds_on = Some(driver);
    }

    pub fn fail_builds(&self) {
        self.recorder.borrow_mut().fail_builds = true;
    }
}

impl DriverFactory for RecordingFactory {
    fn new_driver(&self, engine_type: EngineType) -> Box<dyn TilingDriver> {
        let mut recorder = self.recorder.borrow_mut();
        let instance = recorder.created;
        recorder.created += 1;
        Box::new(RecordingDriver {
            instance,
            engine_type,
            clients: HashSet::new(),
            recorder: Rc::clone(&self.recorder),
        })
    }
}

struct RecordingDriver {
    instance: usize,
    engine_type: EngineType,
    clients: HashSet<ClientId>,
    recorder: Rc<RefCell<Recorder>>,
}

impl RecordingDriver {
    fn record(&self, call: DriverCall) {
        self.recorder.borrow_mut().calls.push(call);
    }
}

impl TilingDriver for RecordingDriver {
    fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    fn contains_client(&self, client: ClientId) -> bool {
        self.clients.contains(&client)
    }

    fn build_layout(&mut self, root: &mut Tile) -> Result<(), DriverError> {
        self.record(DriverCall::Build {
            driver: self.instance,
            root: root.id,
        });
        if self.recorder.borrow().fail_builds {
            return Err(DriverError::Rejected("build".into()));
        }
        Ok(())
    }

    fn add_client(&mut self, client: &Client) -> Result<(), DriverError> {
        if self.recorder.borrow().fail_adds_on == Some(self.instance) {
            return Err(DriverError::Rejected(format!("client {}", client.id)));
        }
        self.record(DriverCall::Add {
            driver: self.instance,
            client: client.id,
        });
        self.clients.insert(client.id);
        Ok(())
    }

    fn remove_client(&mut self, client: &Client) -> Result<(), DriverError> {
        self.record(DriverCall::Remove {
            driver: self.instance,
            client: client.id,
        });
        self.clients.remove(&client.id);
        Ok(())
    }

    fn put_client_in_tile(
        &mut self,
        client: &Client,
        tile: &TileRef,
        direction: Option<Direction>,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::Put {
            driver: self.instance,
            client: client.id,
            tile: tile.id,
            direction,
        });
        self.clients.insert(client.id);
        Ok(())
    }
}

/// A managed child tile of a screen.
pub fn managed_tile(screen: usize, slot: usize) -> TileRef {
    TileRef {
        id: TileId::child(screen, slot),
        managed: true,
        geometry: Rect::new(0, 0, 960, 1080),
    }
}
