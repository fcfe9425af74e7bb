//! Scrollable column engine.
//!
//! Windows are arranged in columns on an infinite horizontal strip:
//! - The screen area acts as a viewport sliding over the strip
//! - New windows append as a column right of the focused one
//! - Windows stacked in one column split its height evenly

use crate::{
    CenteringMode, Direction, EngineSettings, EngineType, LayoutError, Rect, Slot,
    TilingEngine, WindowId,
};

/// A column in the infinite strip.
/// A column contains one or more vertically stacked windows.
#[derive(Debug, Clone)]
pub struct Column {
    /// Width of the column in pixels.
    pub width: i32,
    /// Windows in this column (vertically stacked).
    pub windows: Vec<WindowId>,
}

impl Column {
    /// Create a new column with a single window.
    pub fn new(window_id: WindowId, width: i32) -> Self {
        Self {
            width,
            windows: vec![window_id],
        }
    }

    /// Check if the column is empty.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Get the number of windows in this column.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Remove a window from this column.
    pub fn remove_window(&mut self, window_id: WindowId) -> bool {
        if let Some(pos) = self.windows.iter().position(|&w| w == window_id) {
            self.windows.remove(pos);
            true
        } else {
            false
        }
    }
}

/// The scrollable strip of one tiling domain.
#[derive(Debug, Clone)]
pub struct ScrollingEngine {
    /// Columns, ordered left to right.
    pub columns: Vec<Column>,
    /// Index of the focused column.
    pub focused_column: usize,
    /// Index of the focused window within the focused column.
    pub focused_window_in_column: usize,
    /// Current scroll offset (x position of viewport's left edge on the strip).
    pub scroll_offset: f64,
    /// Gap between columns in pixels.
    pub gap: i32,
    /// Gap at the edges of the viewport.
    pub outer_gap: i32,
    /// Default width for new columns.
    pub default_column_width: i32,
    /// Centering mode for focus changes.
    pub centering_mode: CenteringMode,
}

impl Default for ScrollingEngine {
    fn default() -> Self {
        Self::with_settings(&EngineSettings::default())
    }
}

impl ScrollingEngine {
    /// Create an empty strip with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty strip from shared engine settings.
    pub fn with_settings(settings: &EngineSettings) -> Self {
        Self {
            columns: Vec::new(),
            focused_column: 0,
            focused_window_in_column: 0,
            scroll_offset: 0.0,
            gap: settings.gap,
            outer_gap: settings.outer_gap,
            default_column_width: settings.default_column_width,
            centering_mode: settings.centering_mode,
        }
    }

    /// Get the total width of the strip (sum of all column widths + gaps).
    pub fn total_width(&self) -> i32 {
        if self.columns.is_empty() {
            return 0;
        }

        let column_widths: i32 = self.columns.iter().map(|c| c.width).sum();
        let gaps = self.gap * (self.columns.len() as i32 - 1);
        let outer_gaps = self.outer_gap * 2;

        column_widths + gaps + outer_gaps
    }

    /// Find the column holding a window.
    pub fn column_of(&self, window_id: WindowId) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.windows.contains(&window_id))
    }

    /// Insert a window as a new column at `index`, focusing it.
    fn insert_column_at(&mut self, window_id: WindowId, index: usize) {
        let index = index.min(self.columns.len());
        self.columns
            .insert(index, Column::new(window_id, self.default_column_width));
        self.focused_column = index;
        self.focused_window_in_column = 0;
    }

    /// Insert a new window as a new column to the right of the focused column.
    pub fn insert_window(&mut self, window_id: WindowId) -> Result<(), LayoutError> {
        if self.contains(window_id) {
            return Err(LayoutError::AlreadyPresent(window_id));
        }
        let index = if self.columns.is_empty() {
            0
        } else {
            self.focused_column + 1
        };
        self.insert_column_at(window_id, index);
        Ok(())
    }

    /// Insert a window into an existing column (stacking), below `after`
    /// when given, at the bottom otherwise.
    pub fn insert_window_in_column(
        &mut self,
        window_id: WindowId,
        column_index: usize,
        after: Option<usize>,
    ) -> Result<(), LayoutError> {
        if self.contains(window_id) {
            return Err(LayoutError::AlreadyPresent(window_id));
        }
        let Some(column) = self.columns.get_mut(column_index) else {
            return Err(LayoutError::ColumnOutOfBounds(
                column_index,
                self.columns.len().saturating_sub(1),
            ));
        };

        let position = after
            .map(|p| (p + 1).min(column.windows.len()))
            .unwrap_or(column.windows.len());
        column.windows.insert(position, window_id);
        self.focused_column = column_index;
        self.focused_window_in_column = position;
        Ok(())
    }

    /// Remove a window from the strip.
    pub fn remove_window(&mut self, window_id: WindowId) -> Result<(), LayoutError> {
        let Some(col_idx) = self.column_of(window_id) else {
            return Err(LayoutError::WindowNotFound(window_id));
        };

        self.columns[col_idx].remove_window(window_id);
        if self.columns[col_idx].is_empty() {
            self.columns.remove(col_idx);
            if self.focused_column > col_idx {
                self.focused_column -= 1;
            }
            if self.focused_column >= self.columns.len() {
                self.focused_column = self.columns.len().saturating_sub(1);
            }
        }

        let col_len = self
            .columns
            .get(self.focused_column)
            .map_or(0, |c| c.len());
        if self.focused_window_in_column >= col_len {
            self.focused_window_in_column = col_len.saturating_sub(1);
        }
        Ok(())
    }

    /// Calculate the x-coordinate of a column's left edge on the strip.
    fn column_x(&self, column_index: usize) -> i32 {
        let mut x = self.outer_gap;
        for (i, col) in self.columns.iter().enumerate() {
            if i == column_index {
                return x;
            }
            x += col.width + self.gap;
        }
        x
    }

    /// Ensure the focused column is visible in the viewport.
    /// Adjusts scroll_offset according to the centering mode.
    pub fn ensure_focused_visible(&mut self, viewport_width: i32) {
        let Some(col_width) = self.columns.get(self.focused_column).map(|c| c.width) else {
            return;
        };
        let col_x = self.column_x(self.focused_column);

        match self.centering_mode {
            CenteringMode::Center => {
                let col_center = col_x + col_width / 2;
                self.scroll_offset = (col_center - viewport_width / 2) as f64;
            }
            CenteringMode::JustInView => {
                let viewport_left = self.scroll_offset as i32;
                let viewport_right = viewport_left + viewport_width;

                if col_x < viewport_left {
                    self.scroll_offset = (col_x - self.outer_gap) as f64;
                } else if col_x + col_width > viewport_right {
                    self.scroll_offset =
                        (col_x + col_width + self.outer_gap - viewport_width) as f64;
                }
            }
        }

        let max_scroll = (self.total_width() - viewport_width).max(0);
        self.scroll_offset = self.scroll_offset.clamp(0.0, max_scroll as f64);
    }

    /// Compute one slot per window for the given viewport.
    ///
    /// Slots are emitted column by column, top to bottom, in strip order.
    /// Off-screen columns keep their strip position relative to the
    /// viewport, so their rects may lie outside `viewport`.
    pub fn compute_slots(&self, viewport: Rect) -> Vec<Slot> {
        let mut slots = Vec::new();

        let viewport_left = self.scroll_offset as i32;
        let usable_height = viewport.height - self.outer_gap * 2;
        let mut current_x = self.outer_gap;

        for column in &self.columns {
            let col_screen_x = current_x - viewport_left + viewport.x;

            let window_count = column.windows.len() as i32;
            let window_gaps = self.gap * (window_count - 1).max(0);
            let window_height = if window_count > 0 {
                (usable_height - window_gaps) / window_count
            } else {
                0
            };

            let mut current_y = viewport.y + self.outer_gap;
            for (win_idx, &window_id) in column.windows.iter().enumerate() {
                // Last window absorbs rounding
                let height = if win_idx == column.windows.len() - 1 {
                    viewport.y + viewport.height - self.outer_gap - current_y
                } else {
                    window_height
                };

                slots.push(Slot::new(
                    Rect::new(col_screen_x, current_y, column.width, height),
                    vec![window_id],
                ));
                current_y += height + self.gap;
            }

            current_x += column.width + self.gap;
        }

        slots
    }
}

impl TilingEngine for ScrollingEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Scrolling
    }

    fn add_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        self.insert_window(window)
    }

    fn remove_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        ScrollingEngine::remove_window(self, window)
    }

    fn put_window_near(
        &mut self,
        window: WindowId,
        anchor: WindowId,
        direction: Option<Direction>,
    ) -> Result<(), LayoutError> {
        if self.contains(window) {
            return Err(LayoutError::AlreadyPresent(window));
        }
        let col_idx = self
            .column_of(anchor)
            .ok_or(LayoutError::WindowNotFound(anchor))?;
        let anchor_pos = self.columns[col_idx]
            .windows
            .iter()
            .position(|&w| w == anchor);

        match direction {
            Some(Direction::Left) => {
                self.insert_column_at(window, col_idx);
                Ok(())
            }
            Some(Direction::Right) => {
                self.insert_column_at(window, col_idx + 1);
                Ok(())
            }
            Some(Direction::Up) => {
                let before = anchor_pos.and_then(|p| p.checked_sub(1));
                match before {
                    Some(p) => self.insert_window_in_column(window, col_idx, Some(p)),
                    None => {
                        self.columns[col_idx].windows.insert(0, window);
                        self.focused_column = col_idx;
                        self.focused_window_in_column = 0;
                        Ok(())
                    }
                }
            }
            Some(Direction::Down) | None => {
                self.insert_window_in_column(window, col_idx, anchor_pos)
            }
        }
    }

    fn contains(&self, window: WindowId) -> bool {
        self.column_of(window).is_some()
    }

    fn window_count(&self) -> usize {
        self.columns.iter().map(|c| c.len()).sum()
    }

    fn arrange(&mut self, area: Rect) -> Vec<Slot> {
        self.ensure_focused_visible(area.width);
        self.compute_slots(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip() -> ScrollingEngine {
        ScrollingEngine::with_settings(&EngineSettings {
            gap: 10,
            outer_gap: 10,
            default_column_width: 400,
            centering_mode: CenteringMode::Center,
        })
    }

    #[test]
    fn test_create_empty_strip() {
        let engine = ScrollingEngine::new();
        assert!(engine.columns.is_empty());
        assert_eq!(engine.columns.len(), 0);
        assert_eq!(engine.total_width(), 0);
        assert_eq!(engine.window_count(), 0);
    }

    #[test]
    fn test_insert_multiple_windows() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        engine.insert_window(2).unwrap();
        engine.insert_window(3).unwrap();

        assert_eq!(engine.columns.len(), 3);
        assert_eq!(engine.focused_column, 2);
        assert_eq!(engine.columns[2].windows, vec![3]);
        // 10 + 400 + 10 + 400 + 10 + 400 + 10
        assert_eq!(engine.total_width(), 1240);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        assert_eq!(engine.insert_window(1), Err(LayoutError::AlreadyPresent(1)));
        assert_eq!(engine.window_count(), 1);
    }

    #[test]
    fn test_remove_window() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        engine.insert_window(2).unwrap();
        engine.insert_window(3).unwrap();

        engine.remove_window(2).unwrap();
        assert_eq!(engine.columns.len(), 2);
        assert!(engine.contains(1));
        assert!(!engine.contains(2));
        assert!(engine.contains(3));

        assert_eq!(engine.remove_window(2), Err(LayoutError::WindowNotFound(2)));
    }

    #[test]
    fn test_remove_last_window_empties_strip() {
        let mut engine = strip();
        engine.insert_window(7).unwrap();
        engine.remove_window(7).unwrap();
        assert!(engine.columns.is_empty());
        assert_eq!(engine.focused_column, 0);
    }

    #[test]
    fn test_stacked_windows_share_column() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        engine.insert_window_in_column(2, 0, None).unwrap();
        engine.insert_window_in_column(3, 0, None).unwrap();

        assert_eq!(engine.columns.len(), 1);
        let slots = engine.compute_slots(Rect::new(0, 0, 500, 600));
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| s.rect.x == slots[0].rect.x));
        // Last window absorbs rounding down to the outer gap
        let last = slots[2].rect;
        assert_eq!(last.y + last.height, 590);
    }

    #[test]
    fn test_insert_in_missing_column() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        assert_eq!(
            engine.insert_window_in_column(2, 4, None),
            Err(LayoutError::ColumnOutOfBounds(4, 0))
        );
    }

    #[test]
    fn test_put_window_near_directions() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        engine.insert_window(2).unwrap();

        engine.put_window_near(3, 2, Some(Direction::Left)).unwrap();
        assert_eq!(engine.column_of(3), Some(1));
        assert_eq!(engine.column_of(2), Some(2));

        engine.put_window_near(4, 1, Some(Direction::Right)).unwrap();
        assert_eq!(engine.column_of(4), Some(1));

        engine.put_window_near(5, 1, None).unwrap();
        assert_eq!(engine.columns[0].windows, vec![1, 5]);

        engine.put_window_near(6, 1, Some(Direction::Up)).unwrap();
        assert_eq!(engine.columns[0].windows, vec![6, 1, 5]);
    }

    #[test]
    fn test_put_window_near_unknown_anchor() {
        let mut engine = strip();
        assert_eq!(
            engine.put_window_near(1, 99, None),
            Err(LayoutError::WindowNotFound(99))
        );
    }

    #[test]
    fn test_arrange_centers_focused_column() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        engine.insert_window(2).unwrap();
        engine.insert_window(3).unwrap();
        engine.focused_column = 0;
        engine.scroll_offset = 500.0;

        let slots = engine.arrange(Rect::new(0, 0, 500, 600));

        // Column 0 center is 210, viewport center 250: clamped to 0
        assert_eq!(engine.scroll_offset, 0.0);
        assert_eq!(slots[0].rect.x, 10);
        assert_eq!(slots[0].windows, vec![1]);
    }

    #[test]
    fn test_arrange_offsets_by_area_origin() {
        let mut engine = strip();
        engine.insert_window(1).unwrap();
        let slots = engine.arrange(Rect::new(1920, 0, 1920, 1080));
        assert_eq!(slots.len(), 1);
        assert!(slots[0].rect.x >= 1920);
        assert_eq!(slots[0].rect.y, 10);
    }

    #[test]
    fn test_just_in_view_keeps_visible_column() {
        let mut engine = strip();
        engine.centering_mode = CenteringMode::JustInView;
        engine.insert_window(1).unwrap();
        engine.insert_window(2).unwrap();
        engine.focused_column = 0;

        engine.ensure_focused_visible(1000);
        assert_eq!(engine.scroll_offset, 0.0);
    }
}
