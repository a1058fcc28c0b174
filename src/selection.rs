/// LiveGrid Selection Engine
///
/// Selection is a pair of ordered sets: selected row positions and selected
/// cell positions. Positions refer to the current processed sequence and are
/// stored verbatim, including negative or out-of-range values. Validation and
/// row-identity tracking are policies of the store, not of this engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Selection mode of a single select call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Selection disabled; select calls are no-ops
    #[default]
    None,
    /// Selecting replaces the previous selection
    Single,
    /// Selections toggle independently and accumulate
    Multiple,
    /// Extends from the anchor to the target (shift-click)
    Range,
}

/// Position of one cell: row in the processed sequence, column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: i64,
    pub col: i64,
}

impl CellPosition {
    pub fn new(row: i64, col: i64) -> Self {
        CellPosition { row, col }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub mode: SelectionMode,
    pub selected_rows: BTreeSet<i64>,
    pub selected_cells: BTreeSet<CellPosition>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor_row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor_cell: Option<CellPosition>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_rows.is_empty() && self.selected_cells.is_empty()
    }

    pub fn is_row_selected(&self, index: i64) -> bool {
        self.selected_rows.contains(&index)
    }

    pub fn is_cell_selected(&self, row: i64, col: i64) -> bool {
        self.selected_cells.contains(&CellPosition::new(row, col))
    }

    /// Select a row position under `mode`. Returns true if state changed.
    ///
    /// `Range` fills the positions between the anchor and `index` that lie in
    /// `[0, row_count)`; the anchor and `index` themselves are kept verbatim.
    pub fn select_row(&mut self, index: i64, mode: SelectionMode, row_count: usize) -> bool {
        match mode {
            SelectionMode::None => return false,
            SelectionMode::Single => {
                if self.selected_rows.contains(&index) {
                    self.selected_rows.remove(&index);
                } else {
                    self.selected_rows.clear();
                    self.selected_rows.insert(index);
                }
                self.anchor_row = Some(index);
            }
            SelectionMode::Multiple => {
                if !self.selected_rows.remove(&index) {
                    self.selected_rows.insert(index);
                }
                self.anchor_row = Some(index);
            }
            SelectionMode::Range => match self.anchor_row {
                Some(anchor) => {
                    let before = self.selected_rows.len();
                    self.selected_rows.extend(bounded_span(anchor, index, row_count));
                    self.selected_rows.insert(anchor);
                    self.selected_rows.insert(index);
                    let changed = self.selected_rows.len() != before || self.mode != mode;
                    self.mode = mode;
                    return changed;
                }
                None => {
                    self.selected_rows.clear();
                    self.selected_rows.insert(index);
                    self.anchor_row = Some(index);
                }
            },
        }
        self.mode = mode;
        true
    }

    /// Select a cell under `mode`; `Range` selects the rectangle between the
    /// anchor cell and the target, clipped to `row_count` × `col_count`.
    pub fn select_cell(&mut self, row: i64, col: i64, mode: SelectionMode, row_count: usize, col_count: usize) -> bool {
        let cell = CellPosition::new(row, col);
        match mode {
            SelectionMode::None => return false,
            SelectionMode::Single => {
                if self.selected_cells.contains(&cell) {
                    self.selected_cells.remove(&cell);
                } else {
                    self.selected_cells.clear();
                    self.selected_cells.insert(cell);
                }
                self.anchor_cell = Some(cell);
            }
            SelectionMode::Multiple => {
                if !self.selected_cells.remove(&cell) {
                    self.selected_cells.insert(cell);
                }
                self.anchor_cell = Some(cell);
            }
            SelectionMode::Range => match self.anchor_cell {
                Some(anchor) => {
                    let before = self.selected_cells.len();
                    for r in bounded_span(anchor.row, row, row_count) {
                        for c in bounded_span(anchor.col, col, col_count) {
                            self.selected_cells.insert(CellPosition::new(r, c));
                        }
                    }
                    self.selected_cells.insert(anchor);
                    self.selected_cells.insert(cell);
                    let changed = self.selected_cells.len() != before || self.mode != mode;
                    self.mode = mode;
                    return changed;
                }
                None => {
                    self.selected_cells.clear();
                    self.selected_cells.insert(cell);
                    self.anchor_cell = Some(cell);
                }
            },
        }
        self.mode = mode;
        true
    }

    /// Toggle one row without disturbing the rest of the selection.
    pub fn toggle_row(&mut self, index: i64) -> bool {
        if !self.selected_rows.remove(&index) {
            self.selected_rows.insert(index);
        }
        self.anchor_row = Some(index);
        self.mode = SelectionMode::Multiple;
        true
    }

    /// Select every row position in `[0, row_count)`.
    pub fn select_all(&mut self, row_count: usize) -> bool {
        let before = self.selected_rows.len();
        self.selected_rows.extend(0..row_count as i64);
        let changed = self.selected_rows.len() != before || self.mode != SelectionMode::Multiple;
        self.mode = SelectionMode::Multiple;
        changed
    }

    /// Flip membership of every position in `[0, row_count)`. Entries outside
    /// that range are left as they are.
    pub fn invert(&mut self, row_count: usize) -> bool {
        if row_count == 0 {
            return false;
        }
        for index in 0..row_count as i64 {
            if !self.selected_rows.remove(&index) {
                self.selected_rows.insert(index);
            }
        }
        self.mode = SelectionMode::Multiple;
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.is_empty() || self.anchor_row.is_some() || self.anchor_cell.is_some();
        self.selected_rows.clear();
        self.selected_cells.clear();
        self.anchor_row = None;
        self.anchor_cell = None;
        changed
    }
}

/// Positions between `a` and `b` inclusive that fall inside `[0, count)`.
fn bounded_span(a: i64, b: i64, count: usize) -> RangeInclusive<i64> {
    let last = i64::try_from(count).unwrap_or(i64::MAX) - 1;
    a.min(b).max(0)..=a.max(b).min(last)
}
