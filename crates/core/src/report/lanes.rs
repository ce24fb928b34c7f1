//! Vertical cursors for the two report columns.
//!
//! The sidebar and main column fill top-down independently. Anything spanning both
//! columns first reconciles the cursors so it starts below whichever column ran longer.

/// Height of a card whose body is `lines` wrapped lines: `max(min, base + lines * line_height)`.
pub fn block_height(min: f64, base: f64, lines: usize, line_height: f64) -> f64 {
    (base + lines as f64 * line_height).max(min)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnCursors {
    pub sidebar: f64,
    pub main: f64,
}

impl ColumnCursors {
    pub fn new(top: f64) -> Self {
        Self {
            sidebar: top,
            main: top,
        }
    }

    /// Reserves `height` in the sidebar; returns the block's top edge.
    pub fn place_sidebar(&mut self, height: f64, gap: f64) -> f64 {
        let top = self.sidebar;
        self.sidebar += height + gap;
        top
    }

    /// Reserves `height` in the main column; returns the block's top edge.
    pub fn place_main(&mut self, height: f64, gap: f64) -> f64 {
        let top = self.main;
        self.main += height + gap;
        top
    }

    /// Walks the sidebar cursor down in `step` increments until it is level with the main
    /// column, keeping spanning blocks on a coarse grid.
    pub fn step_sidebar_to_main(&mut self, step: f64) {
        if step <= 0.0 {
            self.sidebar = self.sidebar.max(self.main);
            return;
        }
        while self.sidebar < self.main {
            self.sidebar += step;
        }
    }

    /// Levels both cursors at the lower of the two and returns that position.
    pub fn reconcile(&mut self) -> f64 {
        let y = self.sidebar.max(self.main);
        self.sidebar = y;
        self.main = y;
        y
    }

    /// Reserves a block spanning both columns, starting no higher than `floor`.
    pub fn place_spanning(&mut self, floor: f64, height: f64, gap: f64) -> f64 {
        let top = self.reconcile().max(floor);
        let next = top + height + gap;
        self.sidebar = next;
        self.main = next;
        top
    }

    /// Reserves a spanning block `gap_before` below both columns, pulled up into that gap
    /// when it would otherwise end past `bottom`. It never rises above the reconciled cursor.
    pub fn place_spanning_within(&mut self, gap_before: f64, height: f64, gap_after: f64, bottom: f64) -> f64 {
        let level = self.reconcile();
        let top = (level + gap_before).min(bottom - height).max(level);
        let next = top + height + gap_after;
        self.sidebar = next;
        self.main = next;
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_respects_minimum_and_grows_with_lines() {
        assert_eq!(block_height(56.0, 32.0, 1, 14.0), 56.0);
        assert_eq!(block_height(56.0, 32.0, 3, 14.0), 74.0);
        assert!(block_height(56.0, 32.0, 4, 14.0) > block_height(56.0, 32.0, 3, 14.0));
    }

    #[test]
    fn columns_advance_independently() {
        let mut cursors = ColumnCursors::new(150.0);
        assert_eq!(cursors.place_sidebar(56.0, 16.0), 150.0);
        assert_eq!(cursors.place_sidebar(74.0, 16.0), 222.0);
        assert_eq!(cursors.place_main(120.0, 30.0), 150.0);
        assert_eq!(cursors.sidebar, 312.0);
        assert_eq!(cursors.main, 300.0);
    }

    #[test]
    fn spanning_block_starts_below_the_longer_column() {
        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_sidebar(400.0, 16.0);
        cursors.place_main(100.0, 30.0);

        let top = cursors.place_spanning(150.0, 80.0, 24.0);
        assert_eq!(top, 566.0);
        assert_eq!(cursors.sidebar, 670.0);
        assert_eq!(cursors.main, 670.0);

        // Main ran longer this time.
        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_main(500.0, 30.0);
        let top = cursors.place_spanning(150.0, 10.0, 0.0);
        assert_eq!(top, 680.0);
    }

    #[test]
    fn sidebar_steps_on_a_grid_until_level() {
        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_main(50.0, 0.0);
        cursors.step_sidebar_to_main(12.0);
        // 150 + 5 * 12 = 210 is the first grid position at or below 200.
        assert_eq!(cursors.sidebar, 210.0);
        assert!(cursors.sidebar >= cursors.main);
    }

    #[test]
    fn bounded_spanning_block_gives_up_its_gap_before_overlapping() {
        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_main(400.0, 0.0);
        assert_eq!(cursors.place_spanning_within(30.0, 200.0, 18.0, 800.0), 580.0);

        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_main(420.0, 0.0);
        // 570 + 30 + 230 overflows 800, so the block rises to 570 but no further.
        assert_eq!(cursors.place_spanning_within(30.0, 230.0, 18.0, 800.0), 570.0);

        let mut cursors = ColumnCursors::new(150.0);
        cursors.place_sidebar(500.0, 0.0);
        assert_eq!(cursors.place_spanning_within(30.0, 300.0, 18.0, 800.0), 650.0);
        assert_eq!(cursors.main, 968.0);
    }

    #[test]
    fn reconcile_is_a_no_op_when_level() {
        let mut cursors = ColumnCursors::new(100.0);
        assert_eq!(cursors.reconcile(), 100.0);
        assert_eq!(cursors, ColumnCursors::new(100.0));
    }
}
