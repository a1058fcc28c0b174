/// LiveGrid Viewport Window Calculator
///
/// Maps a scroll position to the range of rows that must be materialized.
/// This is the hot path of the grid (it runs on every scroll tick), so it
/// never looks at row data:
///
/// - fixed row heights: O(1) arithmetic
/// - variable row heights: O(log n) binary search over a prefix-sum index that
///   is rebuilt only when heights or the row count change
///
/// # Examples
///
/// ```
/// use livegrid::viewport::{compute_window, ViewportWindow};
///
/// // 1000 rows of 20px, 200px viewport scrolled to 400px, 2 rows of overscan
/// let window = compute_window(1000, 20.0, 200.0, 400.0, 2);
/// assert_eq!(window, ViewportWindow { start: 18, end: 32 });
/// ```

use serde::{Deserialize, Serialize};

/// Absorbs floating point error when an offset lands exactly on a row edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Half-open range `[start, end)` of materialized row positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewportWindow {
    pub start: usize,
    pub end: usize,
}

impl ViewportWindow {
    pub const EMPTY: ViewportWindow = ViewportWindow { start: 0, end: 0 };

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Shift the window by `base` (page-relative → absolute positions).
    pub fn offset_by(self, base: usize) -> ViewportWindow {
        ViewportWindow {
            start: self.start + base,
            end: self.end + base,
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Window for uniformly sized rows.
///
/// `start = max(0, floor(scroll / row_height) - overscan)` and
/// `end = min(total, start + ceil(viewport / row_height) + 2 * overscan)`.
/// At least one visible row is assumed, and `start` is clamped to the last
/// row when the offset is past the end.
pub fn compute_window(
    total_rows: usize,
    row_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
    overscan: usize,
) -> ViewportWindow {
    if total_rows == 0 || !(row_height > 0.0) || !row_height.is_finite() {
        return ViewportWindow::EMPTY;
    }
    let first = (sanitize(scroll_offset) / row_height + EDGE_EPSILON).floor() as usize;
    let start = first.saturating_sub(overscan).min(total_rows - 1);
    let visible = ((sanitize(viewport_height) / row_height).ceil() as usize).max(1);
    let end = start
        .saturating_add(visible)
        .saturating_add(overscan.saturating_mul(2))
        .min(total_rows);
    ViewportWindow { start, end }
}

/// Prefix-sum index over variable row heights.
///
/// `offsets[i]` is the top edge of row `i`; the final entry is the total
/// content height.
#[derive(Debug, Clone, PartialEq)]
pub struct RowHeights {
    offsets: Vec<f64>,
}

impl RowHeights {
    pub fn from_heights<I>(heights: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let iter = heights.into_iter();
        let mut offsets = Vec::with_capacity(iter.size_hint().0 + 1);
        let mut total = 0.0;
        offsets.push(total);
        for h in iter {
            total += sanitize(h);
            offsets.push(total);
        }
        RowHeights { offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_height(&self) -> f64 {
        self.offsets[self.offsets.len() - 1]
    }

    /// Top edge of row `index` (the total height when past the end).
    pub fn offset_of(&self, index: usize) -> f64 {
        self.offsets[index.min(self.len())]
    }

    pub fn height_of(&self, index: usize) -> f64 {
        if index >= self.len() {
            0.0
        } else {
            self.offsets[index + 1] - self.offsets[index]
        }
    }

    /// Row containing `offset`, clamped to the last row.
    pub fn index_at(&self, offset: f64) -> usize {
        let n = self.len();
        if n == 0 {
            return 0;
        }
        let offset = sanitize(offset) + EDGE_EPSILON;
        let count = self.offsets[..n].partition_point(|&top| top <= offset);
        count.saturating_sub(1).min(n - 1)
    }

    pub fn compute_window(&self, viewport_height: f64, scroll_offset: f64, overscan: usize) -> ViewportWindow {
        let n = self.len();
        if n == 0 {
            return ViewportWindow::EMPTY;
        }
        let scroll = sanitize(scroll_offset);
        let first = self.index_at(scroll);
        let last = self.index_at(scroll + sanitize(viewport_height)).max(first);
        ViewportWindow {
            start: first.saturating_sub(overscan),
            end: last.saturating_add(1).saturating_add(overscan).min(n),
        }
    }
}

/// Where a row should land when scrolling to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    /// Row at the top of the viewport
    #[default]
    Start,
    Center,
    /// Row at the bottom of the viewport
    End,
    /// Scroll the minimum distance that brings the row fully into view
    Auto,
}

/// Scroll geometry of one grid viewport.
#[derive(Debug, Clone)]
pub struct Viewport {
    row_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
    overscan: usize,
    /// Explicit heights by page position; rows past the end use `row_height`
    custom_heights: Vec<f64>,
    prefix: Option<RowHeights>,
}

impl Viewport {
    pub fn new(row_height: f64, viewport_height: f64, overscan: usize) -> Self {
        Viewport {
            row_height,
            viewport_height: sanitize(viewport_height),
            scroll_offset: 0.0,
            overscan,
            custom_heights: Vec::new(),
            prefix: None,
        }
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn has_variable_heights(&self) -> bool {
        !self.custom_heights.is_empty()
    }

    pub fn set_viewport(&mut self, scroll_offset: f64, viewport_height: f64) -> bool {
        let scroll_offset = sanitize(scroll_offset);
        let viewport_height = sanitize(viewport_height);
        if scroll_offset == self.scroll_offset && viewport_height == self.viewport_height {
            return false;
        }
        self.scroll_offset = scroll_offset;
        self.viewport_height = viewport_height;
        true
    }

    pub fn set_scroll_offset(&mut self, scroll_offset: f64) -> bool {
        self.set_viewport(scroll_offset, self.viewport_height)
    }

    /// Replace all explicit row heights. An empty vector returns to fixed heights.
    pub fn set_row_heights(&mut self, heights: Vec<f64>) -> bool {
        if heights == self.custom_heights {
            return false;
        }
        self.custom_heights = heights;
        self.prefix = None;
        true
    }

    /// Set the height of one row, filling any gap with the fixed estimate.
    /// Indices at or past `total_rows` are ignored.
    pub fn set_row_height(&mut self, index: usize, height: f64, total_rows: usize) -> bool {
        if index >= total_rows || self.custom_heights.get(index) == Some(&height) {
            return false;
        }
        if index >= self.custom_heights.len() {
            self.custom_heights.resize(index + 1, self.row_height);
        }
        self.custom_heights[index] = height;
        self.prefix = None;
        true
    }

    /// Make sure the prefix-sum index matches `total_rows`. Cheap when it
    /// already does; this is the only place the index is rebuilt.
    pub fn prepare(&mut self, total_rows: usize) {
        if self.custom_heights.is_empty() {
            self.prefix = None;
            return;
        }
        if self.prefix.as_ref().map(RowHeights::len) == Some(total_rows) {
            return;
        }
        let row_height = self.row_height;
        let heights = (0..total_rows).map(|i| self.custom_heights.get(i).copied().unwrap_or(row_height));
        self.prefix = Some(RowHeights::from_heights(heights));
        log::debug!("rebuilt row height index for {} rows", total_rows);
    }

    fn prefix_for(&self, total_rows: usize) -> Option<&RowHeights> {
        self.prefix.as_ref().filter(|p| p.len() == total_rows)
    }

    pub fn offset_of(&self, index: usize, total_rows: usize) -> f64 {
        match self.prefix_for(total_rows) {
            Some(prefix) => prefix.offset_of(index),
            None => index.min(total_rows) as f64 * self.row_height,
        }
    }

    pub fn height_of(&self, index: usize, total_rows: usize) -> f64 {
        match self.prefix_for(total_rows) {
            Some(prefix) => prefix.height_of(index),
            None => self.row_height,
        }
    }

    pub fn content_height(&self, total_rows: usize) -> f64 {
        self.offset_of(total_rows, total_rows)
    }

    /// Window of page positions to materialize for `total_rows` rows.
    pub fn window(&self, total_rows: usize) -> ViewportWindow {
        match self.prefix_for(total_rows) {
            Some(prefix) => prefix.compute_window(self.viewport_height, self.scroll_offset, self.overscan),
            None => compute_window(
                total_rows,
                self.row_height,
                self.viewport_height,
                self.scroll_offset,
                self.overscan,
            ),
        }
    }

    /// Scroll so that row `index` is placed according to `align`.
    /// Returns true if the scroll offset changed.
    pub fn scroll_to_index(&mut self, index: usize, total_rows: usize, align: ScrollAlign) -> bool {
        let top = self.offset_of(index, total_rows);
        let height = self.height_of(index, total_rows);
        let bottom_aligned = (top + height - self.viewport_height).max(0.0);
        let target = match align {
            ScrollAlign::Start => top,
            ScrollAlign::End => bottom_aligned,
            ScrollAlign::Center => (top + height / 2.0 - self.viewport_height / 2.0).max(0.0),
            ScrollAlign::Auto => {
                if top < self.scroll_offset {
                    top
                } else if top + height > self.scroll_offset + self.viewport_height {
                    bottom_aligned
                } else {
                    self.scroll_offset
                }
            }
        };
        self.set_scroll_offset(target)
    }
}
