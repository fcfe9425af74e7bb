//! Compositor clients and the bookkeeping the controller attaches to them.

use crate::desktop::Desktop;
use crate::tile::TileRef;
use serde::{Deserialize, Serialize};

/// Unique identifier for a client window.
pub type ClientId = tessellate_layout::WindowId;

/// Change notifications a client can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSignal {
    DesktopChanged,
    ActivitiesChanged,
    ScreenChanged,
    TileChanged,
}

impl ClientSignal {
    /// Every signal the controller subscribes to.
    pub const ALL: [ClientSignal; 4] = [
        ClientSignal::DesktopChanged,
        ClientSignal::ActivitiesChanged,
        ClientSignal::ScreenChanged,
        ClientSignal::TileChanged,
    ];

    /// Whether the signal can change the client's domain membership.
    pub fn is_membership(self) -> bool {
        !matches!(self, ClientSignal::TileChanged)
    }
}

/// A client window.
///
/// The public fields mirror compositor state and are updated by whoever
/// owns the client. The remaining fields are controller bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: ClientId,
    pub resource_class: String,
    pub caption: String,
    pub screen: usize,
    pub activities: Vec<String>,
    pub desktop: u32,
    /// The compositor tile the client currently sits in, if any.
    pub tile: Option<TileRef>,

    pub(crate) is_tiled: bool,
    pub(crate) previous_desktops: Option<Vec<Desktop>>,
    pub(crate) hooks_registered: bool,
}

impl Client {
    pub fn new(id: ClientId, screen: usize, activities: Vec<String>, desktop: u32) -> Self {
        Self {
            id,
            resource_class: String::new(),
            caption: String::new(),
            screen,
            activities,
            desktop,
            tile: None,
            is_tiled: false,
            previous_desktops: None,
            hooks_registered: false,
        }
    }

    /// Whether at least one driver manages this client.
    pub fn is_tiled(&self) -> bool {
        self.is_tiled
    }

    /// Membership snapshot taken when hooks were attached, updated on
    /// every reconciled membership change.
    pub fn previous_desktops(&self) -> Option<&[Desktop]> {
        self.previous_desktops.as_deref()
    }

    pub fn hooks_registered(&self) -> bool {
        self.hooks_registered
    }

    /// Whether the client currently sits in a tile managed by the tiler.
    pub fn in_managed_tile(&self) -> bool {
        self.tile.as_ref().is_some_and(|tile| tile.managed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileId;
    use tessellate_layout::Rect;

    #[test]
    fn test_new_client_is_untracked() {
        let client = Client::new(5, 0, vec!["a".into()], 1);
        assert!(!client.is_tiled());
        assert!(!client.hooks_registered());
        assert!(client.previous_desktops().is_none());
        assert!(!client.in_managed_tile());
    }

    #[test]
    fn test_in_managed_tile() {
        let mut client = Client::new(5, 0, vec!["a".into()], 1);
        client.tile = Some(TileRef {
            id: TileId::root(0),
            managed: false,
            geometry: Rect::default(),
        });
        assert!(!client.in_managed_tile());

        client.tile.as_mut().unwrap().managed = true;
        assert!(client.in_managed_tile());
    }

    #[test]
    fn test_membership_signals() {
        let membership: Vec<_> = ClientSignal::ALL
            .iter()
            .filter(|s| s.is_membership())
            .collect();
        assert_eq!(membership.len(), 3);
        assert!(!ClientSignal::TileChanged.is_membership());
    }
}
