//! Monocle engine: every window fills the whole area.

use crate::{Direction, EngineType, LayoutError, Rect, Slot, TilingEngine, WindowId};

/// Windows of one domain, front-most first.
#[derive(Debug, Clone, Default)]
pub struct MonocleEngine {
    windows: Vec<WindowId>,
}

impl MonocleEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TilingEngine for MonocleEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Monocle
    }

    fn add_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        if self.contains(window) {
            return Err(LayoutError::AlreadyPresent(window));
        }
        self.windows.insert(0, window);
        Ok(())
    }

    fn remove_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        let pos = self
            .windows
            .iter()
            .position(|&w| w == window)
            .ok_or(LayoutError::WindowNotFound(window))?;
        self.windows.remove(pos);
        Ok(())
    }

    // Direction has no meaning when everything shares one slot.
    fn put_window_near(
        &mut self,
        window: WindowId,
        anchor: WindowId,
        _direction: Option<Direction>,
    ) -> Result<(), LayoutError> {
        if !self.contains(anchor) {
            return Err(LayoutError::WindowNotFound(anchor));
        }
        self.add_window(window)
    }

    fn contains(&self, window: WindowId) -> bool {
        self.windows.contains(&window)
    }

    fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn arrange(&mut self, area: Rect) -> Vec<Slot> {
        if self.windows.is_empty() {
            return Vec::new();
        }
        vec![Slot::new(area, self.windows.clone())]
    }
}
