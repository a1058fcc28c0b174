/// LiveGrid Pagination Controller
///
/// In client mode the controller slices the processed sequence into pages of
/// `page_size` rows. In server mode the caller feeds one page of data at a
/// time and reports the remote row count; nothing is sliced locally.
///
/// A page size of 0 turns pagination off: a single page spans every row.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Sentinel used by `visible_page_buttons` for an ellipsis slot.
pub const ELLIPSIS: i64 = -1;

/// Smallest button window that can hold first, last, current and two ellipses.
const MIN_PAGE_BUTTONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    #[default]
    Client,
    Server,
}

/// Number of pages for `total_rows` rows at `page_size` rows per page.
pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    if total_rows == 0 {
        0
    } else if page_size == 0 {
        1
    } else {
        total_rows.div_ceil(page_size)
    }
}

/// Row range covered by page `page` (empty when the page does not exist).
pub fn page_bounds(total_rows: usize, page_size: usize, page: usize) -> Range<usize> {
    if page_size == 0 {
        return if page == 0 { 0..total_rows } else { total_rows..total_rows };
    }
    let start = page.saturating_mul(page_size).min(total_rows);
    let end = start.saturating_add(page_size).min(total_rows);
    start..end
}

/// Page numbers to show around `current`, with `ELLIPSIS` for skipped runs.
/// The first and last page are always present and the result never holds
/// more than `max(max_buttons, 5)` entries.
///
/// ```
/// use livegrid::pagination::{visible_page_buttons, ELLIPSIS};
///
/// assert_eq!(visible_page_buttons(0, 3, 7), vec![0, 1, 2]);
/// assert_eq!(visible_page_buttons(10, 20, 7), vec![0, ELLIPSIS, 9, 10, 11, ELLIPSIS, 19]);
/// ```
pub fn visible_page_buttons(current: usize, total_pages: usize, max_buttons: usize) -> Vec<i64> {
    let max_buttons = max_buttons.max(MIN_PAGE_BUTTONS);
    if total_pages <= max_buttons {
        return (0..total_pages as i64).collect();
    }

    let last = total_pages - 1;
    let current = current.min(last);
    // Slots left after first, last and the two ellipsis positions
    let window = max_buttons - 4;
    let start = current
        .saturating_sub(window / 2)
        .clamp(2, total_pages - 2 - window);
    let end = start + window;

    let mut buttons = Vec::with_capacity(max_buttons);
    buttons.push(0);
    // A gap of one page is cheaper to show than to elide
    buttons.push(if start == 2 { 1 } else { ELLIPSIS });
    buttons.extend((start..end).map(|p| p as i64));
    buttons.push(if end == last - 1 { (last - 1) as i64 } else { ELLIPSIS });
    buttons.push(last as i64);
    buttons
}

/// Read-only pagination state published in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub mode: PaginationMode,
    pub page_size: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub page_start: usize,
    pub page_end: usize,
    pub page_buttons: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    mode: PaginationMode,
    page_size: usize,
    current_page: usize,
    total_rows: usize,
    max_page_buttons: usize,
}

impl Pagination {
    pub fn new(page_size: usize, mode: PaginationMode, max_page_buttons: usize) -> Self {
        Pagination {
            mode,
            page_size,
            current_page: 0,
            total_rows: 0,
            max_page_buttons,
        }
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_rows, self.page_size)
    }

    pub fn is_enabled(&self) -> bool {
        self.page_size > 0
    }

    /// Update the row count. A current page that no longer exists is clamped
    /// to the last page. Returns true if the current page moved.
    pub fn set_total_rows(&mut self, total_rows: usize) -> bool {
        self.total_rows = total_rows;
        let last = self.total_pages().saturating_sub(1);
        if self.current_page > last {
            self.current_page = last;
            return true;
        }
        false
    }

    /// Change the page size and reset to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let changed = self.page_size != page_size || self.current_page != 0;
        self.page_size = page_size;
        self.current_page = 0;
        changed
    }

    /// Jump to `page`. Pages outside `[0, total_pages)` are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page >= self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(0)
    }

    pub fn last_page(&mut self) -> bool {
        match self.total_pages().checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    /// Row range of the current page within the processed sequence.
    /// In server mode the local data is already the page.
    pub fn current_range(&self, local_rows: usize) -> Range<usize> {
        match self.mode {
            PaginationMode::Server => 0..local_rows,
            PaginationMode::Client => page_bounds(local_rows, self.page_size, self.current_page),
        }
    }

    /// Page containing a processed-sequence position (client mode).
    pub fn page_of(&self, position: usize) -> usize {
        if self.page_size == 0 {
            0
        } else {
            position / self.page_size
        }
    }

    pub fn visible_page_buttons(&self) -> Vec<i64> {
        visible_page_buttons(self.current_page, self.total_pages(), self.max_page_buttons)
    }

    pub fn state(&self, local_rows: usize) -> PaginationState {
        let range = self.current_range(local_rows);
        PaginationState {
            mode: self.mode,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages(),
            total_rows: self.total_rows,
            page_start: range.start,
            page_end: range.end,
            page_buttons: self.visible_page_buttons(),
        }
    }
}
