//! Tiling domain identity.

use crate::client::Client;
use crate::host::WorkspaceContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One independent tiling context: a screen, an activity and a virtual desktop.
///
/// Equality and hashing are structural, so a `Desktop` is used directly as
/// the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Desktop {
    pub screen: usize,
    pub activity: String,
    pub desktop: u32,
}

impl Desktop {
    pub fn new(screen: usize, activity: impl Into<String>, desktop: u32) -> Self {
        Self {
            screen,
            activity: activity.into(),
            desktop,
        }
    }

    /// Domains a client belongs to: one per activity, on its current
    /// screen and virtual desktop.
    ///
    /// A client without activities yields no domains.
    pub fn from_client(client: &Client) -> Vec<Desktop> {
        client
            .activities
            .iter()
            .map(|activity| Desktop::new(client.screen, activity.as_str(), client.desktop))
            .collect()
    }

    /// The current-context domain of every screen.
    pub fn current_screens(workspace: &dyn WorkspaceContext) -> Vec<Desktop> {
        (0..workspace.num_screens())
            .map(|screen| Desktop::current(workspace, screen))
            .collect()
    }

    /// The current-context domain of a single screen.
    pub fn current(workspace: &dyn WorkspaceContext, screen: usize) -> Desktop {
        Desktop::new(
            screen,
            workspace.current_activity(),
            workspace.current_desktop(),
        )
    }
}

impl fmt::Display for Desktop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.screen, self.activity, self.desktop)
    }
}
