//! Compositor tile tree as seen by the drivers.

use crate::client::ClientId;
use serde::{Deserialize, Serialize};
use tessellate_layout::{Rect, Slot};

/// Position of a tile in a screen's tile tree.
///
/// Index 0 is the screen's root tile; index `n` is the root's `n - 1`th child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub screen: usize,
    pub index: usize,
}

impl TileId {
    pub fn root(screen: usize) -> Self {
        Self { screen, index: 0 }
    }

    pub fn child(screen: usize, slot: usize) -> Self {
        Self {
            screen,
            index: slot + 1,
        }
    }

    pub fn is_root(&self) -> bool {
        self.index == 0
    }
}

/// Snapshot of a tile a client refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRef {
    pub id: TileId,
    /// Whether the tile belongs to the tiler rather than being a
    /// compositor default tile.
    pub managed: bool,
    pub geometry: Rect,
}

/// A node of a screen's tile tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub managed: bool,
    pub geometry: Rect,
    /// Windows placed in this tile, front-most first.
    pub windows: Vec<ClientId>,
    pub children: Vec<Tile>,
}

impl Tile {
    /// An empty managed root tile covering a screen's tiling area.
    pub fn root(screen: usize, geometry: Rect) -> Self {
        Self {
            id: TileId::root(screen),
            managed: true,
            geometry,
            windows: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn to_ref(&self) -> TileRef {
        TileRef {
            id: self.id,
            managed: self.managed,
            geometry: self.geometry,
        }
    }

    /// Look up a tile in this subtree.
    pub fn find(&self, id: TileId) -> Option<&Tile> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Replace the children with one managed tile per slot.
    pub fn replace_children(&mut self, slots: &[Slot]) {
        let screen = self.id.screen;
        self.children = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| Tile {
                id: TileId::child(screen, i),
                managed: true,
                geometry: slot.rect,
                windows: slot.windows.clone(),
                children: Vec::new(),
            })
            .collect();
    }

    /// The tile holding a window, if any.
    pub fn tile_of(&self, client: ClientId) -> Option<&Tile> {
        if self.windows.contains(&client) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.tile_of(client))
    }
}
