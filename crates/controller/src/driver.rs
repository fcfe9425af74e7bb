//! Tiling drivers: the per-domain owners of a layout.

use crate::client::{Client, ClientId};
use crate::error::DriverError;
use crate::tile::{Tile, TileId, TileRef};
use std::collections::HashMap;
use tessellate_layout::{new_engine, Direction, EngineSettings, EngineType, TilingEngine};
use tracing::trace;

/// The layout owner of one tiling domain.
pub trait TilingDriver {
    /// The engine type the driver was built with.
    fn engine_type(&self) -> EngineType;

    /// Whether the client is registered with this driver.
    fn contains_client(&self, client: ClientId) -> bool;

    /// Recompute the layout and apply it to `root`.
    fn build_layout(&mut self, root: &mut Tile) -> Result<(), DriverError>;

    fn add_client(&mut self, client: &Client) -> Result<(), DriverError>;

    fn remove_client(&mut self, client: &Client) -> Result<(), DriverError>;

    /// Place a client at a tile, optionally biased by a direction.
    fn put_client_in_tile(
        &mut self,
        client: &Client,
        tile: &TileRef,
        direction: Option<Direction>,
    ) -> Result<(), DriverError>;
}

/// Builds drivers for the registry.
pub trait DriverFactory {
    fn new_driver(&self, engine_type: EngineType) -> Box<dyn TilingDriver>;
}

/// A driver backed by one of the layout engines.
pub struct EngineDriver {
    engine: Box<dyn TilingEngine>,
    /// Windows of each tile produced by the last build.
    built_tiles: HashMap<TileId, Vec<ClientId>>,
}

impl EngineDriver {
    pub fn new(engine: Box<dyn TilingEngine>) -> Self {
        Self {
            engine,
            built_tiles: HashMap::new(),
        }
    }

    pub fn client_count(&self) -> usize {
        self.engine.window_count()
    }

    /// A window of the tile other than `client` that is still in the layout.
    fn anchor_in(&self, tile: TileId, client: ClientId) -> Option<ClientId> {
        self.built_tiles
            .get(&tile)?
            .iter()
            .copied()
            .find(|&w| w != client && self.engine.contains(w))
    }
}

impl TilingDriver for EngineDriver {
    fn engine_type(&self) -> EngineType {
        self.engine.engine_type()
    }

    fn contains_client(&self, client: ClientId) -> bool {
        self.engine.contains(client)
    }

    fn build_layout(&mut self, root: &mut Tile) -> Result<(), DriverError> {
        let slots = self.engine.arrange(root.geometry);
        root.replace_children(&slots);
        self.built_tiles = root
            .children
            .iter()
            .map(|tile| (tile.id, tile.windows.clone()))
            .collect();
        trace!("Built {} tiles on screen {}", slots.len(), root.id.screen);
        Ok(())
    }

    fn add_client(&mut self, client: &Client) -> Result<(), DriverError> {
        if self.engine.contains(client.id) {
            return Ok(());
        }
        self.engine.add_window(client.id)?;
        Ok(())
    }

    fn remove_client(&mut self, client: &Client) -> Result<(), DriverError> {
        if !self.engine.contains(client.id) {
            return Ok(());
        }
        self.engine.remove_window(client.id)?;
        Ok(())
    }

    fn put_client_in_tile(
        &mut self,
        client: &Client,
        tile: &TileRef,
        direction: Option<Direction>,
    ) -> Result<(), DriverError> {
        let anchor = self.anchor_in(tile.id, client.id);
        if self.engine.contains(client.id) {
            self.engine.remove_window(client.id)?;
        }
        match anchor {
            Some(anchor) => self.engine.put_window_near(client.id, anchor, direction)?,
            None => self.engine.add_window(client.id)?,
        }
        Ok(())
    }
}

/// Builds [`EngineDriver`]s sharing one set of engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineDriverFactory {
    settings: EngineSettings,
}

impl EngineDriverFactory {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl DriverFactory for EngineDriverFactory {
    fn new_driver(&self, engine_type: EngineType) -> Box<dyn TilingDriver> {
        Box::new(EngineDriver::new(new_engine(engine_type, &self.settings)))
    }
}
