//! The reconciliation context: driver registry plus per-client hook state.

use crate::client::{Client, ClientId};
use crate::driver::{DriverFactory, EngineDriverFactory};
use crate::error::ControllerError;
use crate::host::{Host, TimerId};
use crate::manager::DriverManager;
use std::collections::HashMap;
use std::time::Duration;
use tessellate_layout::{EngineSettings, EngineType};
use tracing::debug;

/// Delay before a tile change is evaluated.
pub const DEFAULT_TILE_CHECK_DELAY: Duration = Duration::from_millis(10);

/// Resolved settings the controller runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Engine for newly created drivers.
    pub engine_type: EngineType,
    /// How long a tile change must settle before it is evaluated.
    pub tile_check_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            engine_type: EngineType::default(),
            tile_check_delay: DEFAULT_TILE_CHECK_DELAY,
        }
    }
}

/// Keeps drivers in sync with the compositor's clients.
///
/// All operations run on the host's event thread; handlers take the host
/// collaborators explicitly through [`Host`].
pub struct Controller {
    pub(crate) manager: DriverManager,
    pub(crate) tile_check_delay: Duration,
    /// At most one pending tile check per client.
    pub(crate) pending_tile_checks: HashMap<ClientId, TimerId>,
}

impl Controller {
    pub fn new(config: ControllerConfig, factory: Box<dyn DriverFactory>) -> Self {
        Self {
            manager: DriverManager::new(factory, config.engine_type),
            tile_check_delay: config.tile_check_delay,
            pending_tile_checks: HashMap::new(),
        }
    }

    /// A controller whose drivers run the built-in layout engines.
    pub fn with_engine_settings(config: ControllerConfig, settings: EngineSettings) -> Self {
        Self::new(config, Box::new(EngineDriverFactory::new(settings)))
    }

    pub fn manager(&self) -> &DriverManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut DriverManager {
        &mut self.manager
    }

    pub fn has_pending_tile_check(&self, client: ClientId) -> bool {
        self.pending_tile_checks.contains_key(&client)
    }

    /// A client appeared. Hooks are attached; when `tile` is set and the
    /// client belongs to at least one domain it is tiled right away.
    pub fn on_client_added(
        &mut self,
        host: &mut Host<'_>,
        client: &mut Client,
        tile: bool,
    ) -> Result<(), ControllerError> {
        self.attach_client_hooks(host, client);
        if !tile || client.activities.is_empty() {
            debug!("Client {} ({}) left floating", client.id, client.resource_class);
            return Ok(());
        }

        self.manager.add_client(client, None)?;
        self.manager.rebuild_layout(&mut *host.workspace, None)
    }

    /// A client went away. A pending tile check is cancelled and every
    /// driver holding the client releases it, including a current-context
    /// driver it was dropped into outside its own membership.
    pub fn on_client_removed(
        &mut self,
        host: &mut Host<'_>,
        client: &mut Client,
    ) -> Result<(), ControllerError> {
        if let Some(timer) = self.pending_tile_checks.remove(&client.id) {
            host.scheduler.cancel(timer);
        }
        if !client.is_tiled {
            return Ok(());
        }

        let released = self.manager.release_everywhere(client)?;
        debug!("Client {} closed, released by {} driver(s)", client.id, released);
        self.manager
            .rebuild_layout(&mut *host.workspace, Some(client.screen))
    }

    /// The current activity or virtual desktop changed.
    pub fn on_current_changed(&mut self, host: &mut Host<'_>) -> Result<(), ControllerError> {
        self.manager.rebuild_layout(&mut *host.workspace, None)
    }

    /// An activity was deleted; its drivers are dropped.
    pub fn on_activity_removed(&mut self, activity: &str) -> usize {
        self.manager.evict_activity(activity)
    }
}
