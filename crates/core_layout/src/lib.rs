//! Tessellate Layout Engines
//!
//! Platform-agnostic tiling engines used by the Tessellate controller.
//!
//! An engine owns the ordering of the windows of one tiling domain and
//! turns it into a list of [`Slot`]s for a given screen area:
//! - [`ScrollingEngine`] arranges windows in columns on an infinite
//!   horizontal strip, with the screen acting as a viewport
//! - [`MonocleEngine`] stacks every window into a single full-area slot

mod monocle;
mod scrolling;

pub use monocle::MonocleEngine;
pub use scrolling::{Column, ScrollingEngine};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a window, as reported by the compositor.
pub type WindowId = u64;

/// Errors that can occur during layout operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Column index {0} is out of bounds (max: {1})")]
    ColumnOutOfBounds(usize, usize),

    #[error("Window {0} not found in layout")]
    WindowNotFound(WindowId),

    #[error("Window {0} is already part of the layout")]
    AlreadyPresent(WindowId),
}

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Placement hint used when a window is dropped next to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Whether the hint asks for a new column rather than stacking.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Which engine a driver is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// Scrollable columns (see [`ScrollingEngine`]).
    #[default]
    Scrolling,
    /// One window at a time filling the whole area.
    Monocle,
}

/// Focus centering mode.
/// Determines how the viewport adjusts when focus changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CenteringMode {
    /// Center the focused column in the viewport.
    #[default]
    Center,
    /// Only scroll if the focused column would be outside the viewport.
    JustInView,
}

/// One region produced by [`TilingEngine::arrange`].
///
/// A slot becomes one compositor tile; `windows` are the windows that
/// tile holds, front-most first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub rect: Rect,
    pub windows: Vec<WindowId>,
}

impl Slot {
    pub fn new(rect: Rect, windows: Vec<WindowId>) -> Self {
        Self { rect, windows }
    }
}

/// Knobs shared by every engine built from the same configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Gap between columns in pixels.
    pub gap: i32,
    /// Gap at the edges of the area in pixels.
    pub outer_gap: i32,
    /// Width of newly created columns.
    pub default_column_width: i32,
    /// How the viewport follows the focused column.
    pub centering_mode: CenteringMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gap: 10,
            outer_gap: 10,
            default_column_width: 800,
            centering_mode: CenteringMode::default(),
        }
    }
}

/// The layout model of a single tiling domain.
pub trait TilingEngine {
    /// The engine type this instance was built as.
    fn engine_type(&self) -> EngineType;

    /// Append a window using the engine's default insertion rule.
    fn add_window(&mut self, window: WindowId) -> Result<(), LayoutError>;

    /// Remove a window from the layout.
    fn remove_window(&mut self, window: WindowId) -> Result<(), LayoutError>;

    /// Insert `window` next to `anchor`, optionally biased by a direction.
    fn put_window_near(
        &mut self,
        window: WindowId,
        anchor: WindowId,
        direction: Option<Direction>,
    ) -> Result<(), LayoutError>;

    /// Check whether a window is part of the layout.
    fn contains(&self, window: WindowId) -> bool;

    /// Number of windows in the layout.
    fn window_count(&self) -> usize;

    /// Compute the slots covering `area`.
    fn arrange(&mut self, area: Rect) -> Vec<Slot>;
}

/// Build a new engine of the requested type.
pub fn new_engine(engine_type: EngineType, settings: &EngineSettings) -> Box<dyn TilingEngine> {
    match engine_type {
        EngineType::Scrolling => Box::new(ScrollingEngine::with_settings(settings)),
        EngineType::Monocle => Box::new(MonocleEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_engine_respects_type() {
        let settings = EngineSettings::default();
        assert_eq!(
            new_engine(EngineType::Scrolling, &settings).engine_type(),
            EngineType::Scrolling
        );
        assert_eq!(
            new_engine(EngineType::Monocle, &settings).engine_type(),
            EngineType::Monocle
        );
    }

    #[test]
    fn test_engine_type_default() {
        assert_eq!(EngineType::default(), EngineType::Scrolling);
    }

    #[test]
    fn test_direction_is_horizontal() {
        assert!(Direction::Left.is_horizontal());
        assert!(Direction::Right.is_horizontal());
        assert!(!Direction::Up.is_horizontal());
        assert!(!Direction::Down.is_horizontal());
    }
}
