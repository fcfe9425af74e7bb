//! Daemon-side mirror of the compositor and the controller wired to it.
//!
//! A [`Session`] lives for one bridge connection. Every bridge event is
//! applied to the mirror first, then handed to the controller. Screens the
//! controller rebuilt are sent back as `set_layout` commands.

use crate::config::{should_tile, CompiledWindowRule, Config};
use std::collections::{BTreeSet, HashMap, HashSet};
use tessellate_controller::{
    Client, ClientId, ClientSignal, Controller, ControllerConfig, ControllerError, EngineSettings,
    EventSource, Host, Rect, Scheduler, Tile, TileId, TileRef, TimerId, TimerTask,
    WorkspaceContext,
};
use tessellate_ipc::{
    BridgeCommand, BridgeEvent, ClientInfo, IpcRect, LayoutTile, SignalKind, TileInfo,
};
use tracing::{debug, info, trace, warn};

/// Compositor state as last reported by the bridge.
#[derive(Debug, Default)]
pub struct MirrorWorkspace {
    activity: String,
    desktop: u32,
    roots: Vec<Tile>,
    /// Screens whose root tile was handed out for a rebuild.
    rebuilt: BTreeSet<usize>,
}

impl MirrorWorkspace {
    pub fn set_current(&mut self, activity: String, desktop: u32) {
        self.activity = activity;
        self.desktop = desktop;
    }

    /// Replace the screens. Existing layouts are discarded.
    pub fn set_screens(&mut self, areas: &[IpcRect]) {
        self.roots = areas
            .iter()
            .enumerate()
            .map(|(screen, area)| Tile::root(screen, to_rect(*area)))
            .collect();
        let count = self.roots.len();
        self.rebuilt.retain(|&screen| screen < count);
    }

    pub fn root(&self, screen: usize) -> Option<&Tile> {
        self.roots.get(screen)
    }

    fn take_rebuilt(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.rebuilt)
    }
}

impl WorkspaceContext for MirrorWorkspace {
    fn current_activity(&self) -> &str {
        &self.activity
    }

    fn current_desktop(&self) -> u32 {
        self.desktop
    }

    fn num_screens(&self) -> usize {
        self.roots.len()
    }

    fn root_tile_mut(&mut self, screen: usize) -> Option<&mut Tile> {
        let root = self.roots.get_mut(screen)?;
        self.rebuilt.insert(screen);
        Some(root)
    }
}

/// Signals the controller subscribed to. New subscriptions are queued as
/// `subscribe` commands for the bridge.
#[derive(Debug, Default)]
pub struct BridgeSubscriptions {
    active: HashSet<(ClientId, ClientSignal)>,
    outbox: Vec<BridgeCommand>,
}

impl BridgeSubscriptions {
    pub fn is_subscribed(&self, client: ClientId, signal: ClientSignal) -> bool {
        self.active.contains(&(client, signal))
    }

    fn forget_client(&mut self, client: ClientId) {
        self.active.retain(|(id, _)| *id != client);
    }

    fn take_outbox(&mut self) -> Vec<BridgeCommand> {
        std::mem::take(&mut self.outbox)
    }
}

impl EventSource for BridgeSubscriptions {
    fn subscribe(&mut self, client: ClientId, signal: ClientSignal) {
        if self.active.insert((client, signal)) {
            self.outbox.push(BridgeCommand::Subscribe {
                id: client,
                signal: signal_kind(signal),
            });
        }
    }
}

/// Tile changes the bridge is expected to report while it applies a
/// layout the session sent.
///
/// The controller's rebuild flag only covers the synchronous rebuild; these
/// echoes arrive later and must not reach the tile handler either.
#[derive(Debug, Default)]
struct LayoutEchoes {
    /// Tile each moved window should end up in; `None` for windows the
    /// layout dropped.
    expected: HashMap<ClientId, Option<TileId>>,
    /// Windows of the last layout sent per screen.
    placed: HashMap<usize, HashSet<ClientId>>,
}

impl LayoutEchoes {
    /// Expect echoes for a layout about to be sent. Windows already in
    /// their assigned tile produce no echo and are not tracked.
    fn record(&mut self, root: &Tile, clients: &HashMap<ClientId, Client>) {
        let mirrored = |id: &ClientId| clients.get(id).and_then(|c| c.tile).map(|t| t.id);

        let mut placed = HashSet::new();
        for tile in &root.children {
            for id in &tile.windows {
                placed.insert(*id);
                if mirrored(id) == Some(tile.id) {
                    self.expected.remove(id);
                } else {
                    self.expected.insert(*id, Some(tile.id));
                }
            }
        }

        let screen = root.id.screen;
        let elsewhere = |id: &ClientId| {
            self.placed
                .iter()
                .any(|(other, windows)| *other != screen && windows.contains(id))
        };
        if let Some(previous) = self.placed.get(&screen) {
            for id in previous.difference(&placed) {
                // Placed on another screen; that layout decides the echo
                if mirrored(id).is_some() && !elsewhere(id) {
                    self.expected.insert(*id, None);
                }
            }
        }
        self.placed.insert(screen, placed);
    }

    /// Whether a reported tile belongs to a layout still being applied.
    /// The window is released once it reports its expected tile.
    fn absorb(&mut self, id: ClientId, tile: Option<TileId>) -> bool {
        let Some(expected) = self.expected.get(&id) else {
            return false;
        };
        if *expected == tile {
            self.expected.remove(&id);
        }
        true
    }

    fn forget_client(&mut self, id: ClientId) {
        self.expected.remove(&id);
        for windows in self.placed.values_mut() {
            windows.remove(&id);
        }
    }

    fn is_pending(&self, id: ClientId) -> bool {
        self.expected.contains_key(&id)
    }
}

/// Resolved settings a session is built from.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub controller: ControllerConfig,
    pub engine: EngineSettings,
    /// Default for windows no rule matches.
    pub tile_new_windows: bool,
    pub rules: Vec<CompiledWindowRule>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            controller: config.controller_config(),
            engine: config.engine_settings(),
            tile_new_windows: config.tiling.tile_new_windows,
            rules: config.compile_rules(),
        }
    }
}

/// The controller together with everything it needs from the compositor.
pub struct Session<S: Scheduler> {
    settings: SessionSettings,
    controller: Controller,
    workspace: MirrorWorkspace,
    subscriptions: BridgeSubscriptions,
    scheduler: S,
    clients: HashMap<ClientId, Client>,
    echoes: LayoutEchoes,
}

impl<S: Scheduler> Session<S> {
    pub fn new(settings: SessionSettings, scheduler: S) -> Self {
        let controller = Controller::with_engine_settings(settings.controller, settings.engine);
        Self {
            settings,
            controller,
            workspace: MirrorWorkspace::default(),
            subscriptions: BridgeSubscriptions::default(),
            scheduler,
            clients: HashMap::new(),
            echoes: LayoutEchoes::default(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[cfg(test)]
    pub fn workspace(&self) -> &MirrorWorkspace {
        &self.workspace
    }

    #[cfg(test)]
    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Whether the bridge has yet to report `id` in the tile a sent layout
    /// assigned to it.
    #[cfg(test)]
    pub fn awaits_layout_echo(&self, id: ClientId) -> bool {
        self.echoes.is_pending(id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Apply one bridge event and return the commands it produced.
    ///
    /// Controller errors are logged; the session keeps running.
    pub fn handle_event(&mut self, event: BridgeEvent) -> Vec<BridgeCommand> {
        if let Err(e) = self.apply(event) {
            warn!("Failed to reconcile bridge event: {}", e);
        }
        self.flush()
    }

    /// A scheduler timer fired.
    pub fn timer_fired(&mut self, timer: TimerId, task: TimerTask) -> Vec<BridgeCommand> {
        let result = match task {
            TimerTask::TileCheck(id) => self.with_client(id, |controller, host, client| {
                controller.on_tile_check_due(host, timer, client)
            }),
        };
        if let Err(e) = result {
            warn!("Tile check {:?} failed: {}", timer, e);
        }
        self.flush()
    }

    fn apply(&mut self, event: BridgeEvent) -> Result<(), ControllerError> {
        match event {
            BridgeEvent::Hello {
                activity,
                desktop,
                screens,
                clients,
            } => {
                self.reset();
                info!(
                    "Bridge hello: activity {}, desktop {}, {} screen(s), {} client(s)",
                    activity,
                    desktop,
                    screens.len(),
                    clients.len()
                );
                self.workspace.set_current(activity, desktop);
                self.workspace.set_screens(&screens);
                for client in &clients {
                    self.add_client(client)?;
                }
                self.with_host(|controller, host| controller.on_current_changed(host))
            }
            BridgeEvent::ScreensChanged { screens } => {
                debug!("Screens changed: {}", screens.len());
                self.workspace.set_screens(&screens);
                self.with_host(|controller, host| controller.on_current_changed(host))
            }
            BridgeEvent::CurrentChanged { activity, desktop } => {
                debug!("Current changed to activity {} desktop {}", activity, desktop);
                self.workspace.set_current(activity, desktop);
                self.with_host(|controller, host| controller.on_current_changed(host))
            }
            BridgeEvent::ClientAdded { client } => self.add_client(&client),
            BridgeEvent::ClientRemoved { id } => {
                let Some(mut client) = self.clients.remove(&id) else {
                    trace!("Removal of unknown client {}", id);
                    return Ok(());
                };
                self.subscriptions.forget_client(id);
                self.echoes.forget_client(id);
                self.with_host(|controller, host| controller.on_client_removed(host, &mut client))
            }
            BridgeEvent::DesktopChanged { id, desktop } => {
                self.client_changed(id, ClientSignal::DesktopChanged, |client| {
                    client.desktop = desktop;
                })
            }
            BridgeEvent::ActivitiesChanged { id, activities } => {
                self.client_changed(id, ClientSignal::ActivitiesChanged, |client| {
                    client.activities = activities;
                })
            }
            BridgeEvent::ScreenChanged { id, screen } => {
                self.client_changed(id, ClientSignal::ScreenChanged, |client| {
                    client.screen = screen;
                })
            }
            BridgeEvent::TileChanged { id, tile } => {
                let tile = tile.map(tile_ref);
                if self.echoes.absorb(id, tile.map(|t| t.id)) {
                    trace!("Tile change of client {} applies a sent layout", id);
                    if let Some(client) = self.clients.get_mut(&id) {
                        client.tile = tile;
                    }
                    return Ok(());
                }
                self.client_changed(id, ClientSignal::TileChanged, |client| {
                    client.tile = tile;
                })
            }
            BridgeEvent::ActivityRemoved { activity } => {
                self.controller.on_activity_removed(&activity);
                Ok(())
            }
        }
    }

    /// Drop all state of a previous bridge.
    fn reset(&mut self) {
        self.controller =
            Controller::with_engine_settings(self.settings.controller, self.settings.engine);
        self.clients.clear();
        self.subscriptions = BridgeSubscriptions::default();
        self.workspace = MirrorWorkspace::default();
        self.echoes = LayoutEchoes::default();
    }

    fn add_client(&mut self, info: &ClientInfo) -> Result<(), ControllerError> {
        if self.clients.contains_key(&info.id) {
            debug!("Client {} reported twice", info.id);
            return Ok(());
        }
        let tile = should_tile(
            &self.settings.rules,
            &info.resource_class,
            &info.caption,
            self.settings.tile_new_windows,
        );
        self.clients.insert(info.id, client_from_info(info));
        self.with_client(info.id, |controller, host, client| {
            controller.on_client_added(host, client, tile)
        })
    }

    /// Update a client's mirrored state and forward the signal when the
    /// controller subscribed to it.
    fn client_changed(
        &mut self,
        id: ClientId,
        signal: ClientSignal,
        update: impl FnOnce(&mut Client),
    ) -> Result<(), ControllerError> {
        let subscribed = self.subscriptions.is_subscribed(id, signal);
        self.with_client(id, |controller, host, client| {
            update(client);
            if subscribed {
                controller.handle_signal(host, client, signal)
            } else {
                Ok(())
            }
        })
    }

    fn with_host<R>(&mut self, f: impl FnOnce(&mut Controller, &mut Host<'_>) -> R) -> R {
        let mut host = Host {
            workspace: &mut self.workspace,
            events: &mut self.subscriptions,
            scheduler: &mut self.scheduler,
        };
        f(&mut self.controller, &mut host)
    }

    /// Run `f` on a known client. Unknown clients are skipped.
    fn with_client(
        &mut self,
        id: ClientId,
        f: impl FnOnce(&mut Controller, &mut Host<'_>, &mut Client) -> Result<(), ControllerError>,
    ) -> Result<(), ControllerError> {
        let Some(client) = self.clients.get_mut(&id) else {
            trace!("Ignoring event for unknown client {}", id);
            return Ok(());
        };
        let mut host = Host {
            workspace: &mut self.workspace,
            events: &mut self.subscriptions,
            scheduler: &mut self.scheduler,
        };
        f(&mut self.controller, &mut host, client)
    }

    /// Collect queued subscriptions and the layouts of rebuilt screens.
    fn flush(&mut self) -> Vec<BridgeCommand> {
        let mut commands = self.subscriptions.take_outbox();
        for screen in self.workspace.take_rebuilt() {
            if let Some(root) = self.workspace.root(screen) {
                self.echoes.record(root, &self.clients);
                commands.push(layout_command(root));
            }
        }
        commands
    }
}

fn layout_command(root: &Tile) -> BridgeCommand {
    BridgeCommand::SetLayout {
        screen: root.id.screen,
        tiles: root
            .children
            .iter()
            .map(|tile| LayoutTile {
                index: tile.id.index,
                geometry: to_ipc_rect(tile.geometry),
                windows: tile.windows.clone(),
            })
            .collect(),
    }
}

fn client_from_info(info: &ClientInfo) -> Client {
    let mut client = Client::new(info.id, info.screen, info.activities.clone(), info.desktop);
    client.resource_class = info.resource_class.clone();
    client.caption = info.caption.clone();
    client.tile = info.tile.map(tile_ref);
    client
}

fn tile_ref(info: TileInfo) -> TileRef {
    TileRef {
        id: TileId {
            screen: info.screen,
            index: info.index,
        },
        managed: info.managed,
        geometry: to_rect(info.geometry),
    }
}

fn signal_kind(signal: ClientSignal) -> SignalKind {
    match signal {
        ClientSignal::DesktopChanged => SignalKind::DesktopChanged,
        ClientSignal::ActivitiesChanged => SignalKind::ActivitiesChanged,
        ClientSignal::ScreenChanged => SignalKind::ScreenChanged,
        ClientSignal::TileChanged => SignalKind::TileChanged,
    }
}

fn to_rect(rect: IpcRect) -> Rect {
    Rect::new(rect.x, rect.y, rect.width, rect.height)
}

fn to_ipc_rect(rect: Rect) -> IpcRect {
    IpcRect::new(rect.x, rect.y, rect.width, rect.height)
}
