//! Grid layout for the diagram nodes.
//!
//! Positions are computed once, in a grid, when the size of the selected
//! table set changes. Property edits never trigger a recompute, so manual
//! repositioning survives everything except adding or removing a table from
//! the diagram.

use std::collections::BTreeMap;

/// Layout configuration.
#[derive(Clone, Debug)]
pub struct GridConfig {
    /// Starting X position.
    pub start_x: f64,
    /// Starting Y position.
    pub start_y: f64,
    /// Estimated table width for spacing calculations.
    pub table_width: f64,
    /// Estimated table height for spacing calculations.
    pub table_height: f64,
    /// Horizontal spacing between tables.
    pub horizontal_spacing: f64,
    /// Vertical spacing between rows.
    pub vertical_spacing: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start_x: 100.0,
            start_y: 100.0,
            table_width: 280.0,
            table_height: 250.0,
            horizontal_spacing: 80.0,
            vertical_spacing: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GridLayout {
    config: GridConfig,
    positions: BTreeMap<String, (f64, f64)>,
    laid_out_count: usize,
}

impl GridLayout {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            positions: BTreeMap::new(),
            laid_out_count: 0,
        }
    }

    pub fn position(&self, table: &str) -> Option<(f64, f64)> {
        self.positions.get(table).copied()
    }

    /// Record a manual reposition.
    pub fn set_position(&mut self, table: &str, position: (f64, f64)) {
        self.positions.insert(table.to_string(), position);
    }

    /// Reconcile with the current selected-table set. A changed set size
    /// recomputes the whole grid; otherwise existing positions are kept and
    /// only tables without one get a slot.
    pub fn sync(&mut self, tables: &[String]) {
        if tables.len() != self.laid_out_count {
            self.positions.clear();
            for (index, table) in tables.iter().enumerate() {
                self.positions
                    .insert(table.clone(), self.grid_slot(index, tables.len()));
            }
            self.laid_out_count = tables.len();
            return;
        }
        for (index, table) in tables.iter().enumerate() {
            if !self.positions.contains_key(table) {
                let slot = self.grid_slot(index, tables.len());
                self.positions.insert(table.clone(), slot);
            }
        }
        self.positions.retain(|table, _| tables.contains(table));
    }

    fn grid_slot(&self, index: usize, total: usize) -> (f64, f64) {
        let columns = grid_columns(total);
        let col = index % columns;
        let row = index / columns;
        (
            self.config.start_x
                + col as f64 * (self.config.table_width + self.config.horizontal_spacing),
            self.config.start_y
                + row as f64 * (self.config.table_height + self.config.vertical_spacing),
        )
    }
}

fn grid_columns(total: usize) -> usize {
    (total as f64).sqrt().ceil().max(1.0) as usize
}
