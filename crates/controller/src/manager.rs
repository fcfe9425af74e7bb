//! Registry of per-domain tiling drivers.

use crate::client::{Client, ClientId};
use crate::desktop::Desktop;
use crate::driver::{DriverFactory, TilingDriver};
use crate::error::ControllerError;
use crate::host::WorkspaceContext;
use crate::tile::TileRef;
use std::cell::Cell;
use std::collections::HashMap;
use tessellate_layout::{Direction, EngineType};
use tracing::{debug, info};

/// Marks a layout build as running until dropped.
struct LayoutBuild<'a>(&'a Cell<bool>);

impl<'a> LayoutBuild<'a> {
    fn begin(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for LayoutBuild<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owns one driver per [`Desktop`] and routes operations to them.
///
/// Drivers are created on first use and live until their activity is
/// evicted.
pub struct DriverManager {
    drivers: HashMap<Desktop, Box<dyn TilingDriver>>,
    factory: Box<dyn DriverFactory>,
    engine_type: EngineType,
    building_layout: Cell<bool>,
}

/// Look up the driver of a domain, creating it on a miss.
fn resolve<'a>(
    drivers: &'a mut HashMap<Desktop, Box<dyn TilingDriver>>,
    factory: &dyn DriverFactory,
    engine_type: EngineType,
    desktop: &Desktop,
) -> &'a mut dyn TilingDriver {
    drivers
        .entry(desktop.clone())
        .or_insert_with(|| {
            debug!("Creating {:?} driver for desktop {}", engine_type, desktop);
            factory.new_driver(engine_type)
        })
        .as_mut()
}

impl DriverManager {
    pub fn new(factory: Box<dyn DriverFactory>, engine_type: EngineType) -> Self {
        Self {
            drivers: HashMap::new(),
            factory,
            engine_type,
            building_layout: Cell::new(false),
        }
    }

    /// Engine type used for drivers created from now on.
    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    /// Number of drivers created so far.
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Whether a rebuild pass is running.
    pub fn is_building_layout(&self) -> bool {
        self.building_layout.get()
    }

    /// Whether the driver of `desktop` exists and manages `client`.
    pub fn is_managed_by(&self, desktop: &Desktop, client: ClientId) -> bool {
        self.drivers
            .get(desktop)
            .is_some_and(|driver| driver.contains_client(client))
    }

    /// The driver of a domain, created on first reference.
    pub fn driver_for(&mut self, desktop: &Desktop) -> &mut dyn TilingDriver {
        resolve(
            &mut self.drivers,
            self.factory.as_ref(),
            self.engine_type,
            desktop,
        )
    }

    /// Rebuild the current-context layout of one screen, or of every
    /// screen when `screen` is `None`.
    ///
    /// The first failing domain aborts the pass.
    pub fn rebuild_layout(
        &mut self,
        workspace: &mut dyn WorkspaceContext,
        screen: Option<usize>,
    ) -> Result<(), ControllerError> {
        let _build = LayoutBuild::begin(&self.building_layout);

        let desktops = match screen {
            Some(screen) => vec![Desktop::current(&*workspace, screen)],
            None => Desktop::current_screens(&*workspace),
        };

        for desktop in &desktops {
            let root = workspace
                .root_tile_mut(desktop.screen)
                .ok_or(ControllerError::MissingRootTile(desktop.screen))?;
            resolve(
                &mut self.drivers,
                self.factory.as_ref(),
                self.engine_type,
                desktop,
            )
            .build_layout(root)
            .map_err(ControllerError::driver(desktop))?;
        }

        debug!("Rebuilt layout for {} desktop(s)", desktops.len());
        Ok(())
    }

    /// Register a client with the drivers of `desktops`, or of its current
    /// membership when `None`.
    pub fn add_client(
        &mut self,
        client: &mut Client,
        desktops: Option<&[Desktop]>,
    ) -> Result<(), ControllerError> {
        let derived;
        let desktops = match desktops {
            Some(desktops) => desktops,
            None => {
                derived = Desktop::from_client(client);
                &derived
            }
        };

        for desktop in desktops {
            self.driver_for(desktop)
                .add_client(client)
                .map_err(ControllerError::driver(desktop))?;
        }
        client.is_tiled = true;
        Ok(())
    }

    /// Unregister a client from the drivers of `desktops`, or of its
    /// current membership when `None`.
    pub fn remove_client(
        &mut self,
        client: &mut Client,
        desktops: Option<&[Desktop]>,
    ) -> Result<(), ControllerError> {
        let derived;
        let desktops = match desktops {
            Some(desktops) => desktops,
            None => {
                derived = Desktop::from_client(client);
                &derived
            }
        };

        for desktop in desktops {
            self.driver_for(desktop)
                .remove_client(client)
                .map_err(ControllerError::driver(desktop))?;
        }
        client.is_tiled = false;
        Ok(())
    }

    /// Unregister a client from every driver that holds it, whichever path
    /// admitted it. Returns how many drivers released it.
    pub fn release_everywhere(&mut self, client: &mut Client) -> Result<usize, ControllerError> {
        let mut released = 0;
        for (desktop, driver) in self.drivers.iter_mut() {
            if !driver.contains_client(client.id) {
                continue;
            }
            driver
                .remove_client(client)
                .map_err(ControllerError::driver(desktop))?;
            released += 1;
        }
        client.is_tiled = false;
        Ok(released)
    }

    /// Place a client at a tile of the current-context domain of its screen.
    pub fn put_client_in_tile(
        &mut self,
        workspace: &dyn WorkspaceContext,
        client: &mut Client,
        tile: &TileRef,
        direction: Option<Direction>,
    ) -> Result<(), ControllerError> {
        let desktop = Desktop::current(workspace, client.screen);
        self.driver_for(&desktop)
            .put_client_in_tile(client, tile, direction)
            .map_err(ControllerError::driver(&desktop))?;
        client.is_tiled = true;
        Ok(())
    }

    /// Drop every driver belonging to an activity. Returns how many were
    /// dropped.
    pub fn evict_activity(&mut self, activity: &str) -> usize {
        let before = self.drivers.len();
        self.drivers.retain(|desktop, _| desktop.activity != activity);
        let evicted = before - self.drivers.len();
        if evicted > 0 {
            info!("Evicted {} driver(s) of activity {}", evicted, activity);
        }
        evicted
    }

    #[cfg(test)]
    pub(crate) fn set_building_layout(&self, building: bool) {
        self.building_layout.set(building);
    }
}
