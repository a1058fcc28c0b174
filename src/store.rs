/// Grid State Store - the single mutation entry point of the grid
///
/// The store owns the raw rows, the column registry and every piece of view
/// state (sort, filter, grouping, selection, pagination, viewport). Derived
/// state is produced by a fixed pipeline:
///
/// ```text
/// rows ─▶ filter ─▶ sort ─▶ group (+ totals) ─▶ flatten ─▶ paginate ─▶ window
/// ```
///
/// # Dirty Tracking
///
/// Each mutation marks the earliest pipeline stage whose inputs changed.
/// `recompute()` reruns that stage and everything after it, and nothing
/// before it. Scrolling only dirties the window stage, so it never touches row
/// data; toggling a group re-flattens without rebuilding the tree.
///
/// # Notification
///
/// Every effective mutation bumps the generation counter, recomputes and
/// hands a fresh `GridSnapshot` to the subscribers. Inside `batch` the
/// recompute and the notification are deferred until the closure returns.
///
/// # Selection Identity
///
/// Selected positions refer to the current processed sequence. Under
/// `SelectionIdentity::RowId` the store records the stable ids of selected
/// data rows before a pipeline rerun and moves the selection to their new
/// positions afterwards.

use crate::column::{ColumnDefinition, ColumnRegistry, RenderDescriptor};
use crate::config::{GridConfig, OutOfRangePolicy, SelectionIdentity};
use crate::error::{GridError, GridResult};
use crate::filter::{filter_indices, FilterSpec};
use crate::group::{apply_expansion, build_groups, compute_aggregates, find_node, flatten};
use crate::group::{AggregateValues, AggregationMap, ExpansionState, GroupNode};
use crate::pagination::{page_bounds, Pagination, PaginationMode, PaginationState};
use crate::selection::{CellPosition, SelectionMode, SelectionState};
use crate::snapshot::{DisplayRow, GridSnapshot};
use crate::sort::{sort_indices, SortDirection, SortSpec};
use crate::value::{records_from_json, CellValue, Record};
use crate::viewport::{ScrollAlign, Viewport, ViewportWindow};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug};
use std::ops::Range;
use std::rc::Rc;

/// Stable identity of an ingested row.
pub type RowId = u64;

pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&GridSnapshot)>;

/// Pipeline stages in execution order. `Clean` means nothing to rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Filter,
    Sort,
    Group,
    Flatten,
    Paginate,
    Window,
    Clean,
}

/// Row ids of the selection, taken before a pipeline rerun.
#[derive(Debug, Default)]
struct SelectionIds {
    rows: Vec<RowId>,
    cells: Vec<(RowId, i64)>,
    anchor_row: Option<RowId>,
    anchor_cell: Option<(RowId, i64)>,
}

pub struct GridStore {
    config: GridConfig,
    columns: ColumnRegistry,
    rows: Rc<Vec<Record>>,
    /// Parallel to `rows`
    row_ids: Vec<RowId>,
    next_row_id: RowId,

    sort: SortSpec,
    filter: FilterSpec,
    quick_filter: Option<String>,
    group_by: Vec<String>,
    aggregations: AggregationMap,
    expansion: ExpansionState,
    selection: Rc<SelectionState>,
    /// Selected row ids with no current position (RowId identity only)
    parked_ids: BTreeSet<RowId>,
    pagination: Pagination,
    viewport: Viewport,

    // Stage outputs
    filtered: Vec<usize>,
    sorted: Vec<usize>,
    group_tree: Rc<Vec<GroupNode>>,
    totals: Rc<AggregateValues>,
    processed: Rc<Vec<DisplayRow>>,
    page_range: Range<usize>,
    window: ViewportWindow,

    dirty: Stage,
    generation: u64,
    batch_depth: usize,
    pending_notify: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl GridStore {
    pub fn new(config: GridConfig) -> Self {
        let mut store = GridStore {
            columns: ColumnRegistry::default(),
            rows: Rc::new(Vec::new()),
            row_ids: Vec::new(),
            next_row_id: 0,
            sort: SortSpec::default(),
            filter: FilterSpec::default(),
            quick_filter: None,
            group_by: Vec::new(),
            aggregations: AggregationMap::new(),
            expansion: ExpansionState::new(config.groups_expanded),
            selection: Rc::new(SelectionState::default()),
            parked_ids: BTreeSet::new(),
            pagination: Pagination::new(config.page_size, config.pagination_mode, config.max_page_buttons),
            viewport: Viewport::new(config.row_height, config.viewport_height, config.overscan),
            filtered: Vec::new(),
            sorted: Vec::new(),
            group_tree: Rc::new(Vec::new()),
            totals: Rc::new(AggregateValues::new()),
            processed: Rc::new(Vec::new()),
            page_range: 0..0,
            window: ViewportWindow::EMPTY,
            dirty: Stage::Filter,
            generation: 0,
            batch_depth: 0,
            pending_notify: false,
            subscribers: Vec::new(),
            next_subscription: 0,
            config,
        };
        store.recompute();
        store
    }

    pub fn with_columns(columns: Vec<ColumnDefinition>, config: GridConfig) -> Self {
        let mut store = Self::new(config);
        store.columns.replace(columns);
        store.invalidate(Stage::Filter);
        store.recompute();
        store
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn invalidate(&mut self, stage: Stage) {
        self.dirty = self.dirty.min(stage);
    }

    /// Record an effective mutation dirtying `stage` onward.
    fn commit(&mut self, stage: Stage) {
        self.invalidate(stage);
        self.generation += 1;
        if self.batch_depth > 0 {
            self.pending_notify = true;
            return;
        }
        self.recompute();
        self.notify();
    }

    /// Rerun every dirty stage. A no-op when nothing is dirty.
    pub fn recompute(&mut self) {
        let stage = self.dirty;
        if stage == Stage::Clean {
            return;
        }
        self.dirty = Stage::Clean;

        let remap = stage <= Stage::Flatten
            && self.config.selection_identity == SelectionIdentity::RowId
            && (!self.selection.is_empty() || !self.parked_ids.is_empty());
        let captured = if remap { Some(self.capture_selection_ids()) } else { None };

        if stage <= Stage::Filter {
            self.filtered = filter_indices(&self.rows, &self.columns, &self.filter, self.quick_filter.as_deref());
            log::debug!("filter: {} of {} rows pass", self.filtered.len(), self.rows.len());
        }
        if stage <= Stage::Sort {
            self.sorted = sort_indices(&self.rows, &self.columns, &self.filtered, &self.sort);
            log::debug!("sort: {} rows by {} keys", self.sorted.len(), self.sort.keys().len());
        }
        if stage <= Stage::Group {
            self.run_group();
        }
        if stage <= Stage::Flatten {
            self.run_flatten();
        }
        if stage <= Stage::Paginate {
            self.run_paginate();
        }
        self.run_window();

        if let Some(ids) = captured {
            self.restore_selection_ids(ids);
        }
    }

    fn run_group(&mut self) {
        self.totals = Rc::new(compute_aggregates(&self.rows, &self.columns, &self.filtered, &self.aggregations));
        self.group_tree = Rc::new(build_groups(
            &self.rows,
            &self.columns,
            &self.sorted,
            &self.group_by,
            &self.aggregations,
            &self.expansion,
        ));
        log::debug!("group: {} top-level groups", self.group_tree.len());
    }

    fn run_flatten(&mut self) {
        let processed = if self.group_tree.is_empty() {
            self.sorted
                .iter()
                .map(|&source| DisplayRow::Data { source, depth: 0 })
                .collect()
        } else {
            apply_expansion(Rc::make_mut(&mut self.group_tree).as_mut_slice(), &self.expansion);
            flatten(&self.group_tree)
        };
        self.processed = Rc::new(processed);
        log::debug!("flatten: {} display rows", self.processed.len());
    }

    fn run_paginate(&mut self) {
        let len = self.processed.len();
        if self.pagination.mode() == PaginationMode::Client {
            self.pagination.set_total_rows(len);
        }
        self.page_range = self.pagination.current_range(len);
        log::debug!(
            "paginate: page {} of {} covers {:?}",
            self.pagination.current_page(),
            self.pagination.total_pages(),
            self.page_range
        );
    }

    fn run_window(&mut self) {
        let page_len = self.page_range.len();
        self.viewport.prepare(page_len);
        self.window = self.viewport.window(page_len).offset_by(self.page_range.start);
        log::trace!("window: {:?} at scroll {}", self.window, self.viewport.scroll_offset());
    }

    fn row_id_at(&self, position: i64) -> Option<RowId> {
        let position = usize::try_from(position).ok()?;
        let source = self.processed.get(position)?.source()?;
        self.row_ids.get(source).copied()
    }

    fn capture_selection_ids(&self) -> SelectionIds {
        let selection = &self.selection;
        let mut rows: Vec<RowId> = selection
            .selected_rows
            .iter()
            .filter_map(|&p| self.row_id_at(p))
            .collect();
        rows.extend(self.parked_ids.iter().copied());
        SelectionIds {
            rows,
            cells: selection
                .selected_cells
                .iter()
                .filter_map(|c| Some((self.row_id_at(c.row)?, c.col)))
                .collect(),
            anchor_row: selection.anchor_row.and_then(|p| self.row_id_at(p)),
            anchor_cell: selection
                .anchor_cell
                .and_then(|c| Some((self.row_id_at(c.row)?, c.col))),
        }
    }

    fn restore_selection_ids(&mut self, ids: SelectionIds) {
        let positions: HashMap<RowId, i64> = self
            .processed
            .iter()
            .enumerate()
            .filter_map(|(pos, row)| Some((*self.row_ids.get(row.source()?)?, pos as i64)))
            .collect();
        let known: BTreeSet<RowId> = self.row_ids.iter().copied().collect();

        let mut parked = BTreeSet::new();
        let mut selected_rows = BTreeSet::new();
        for id in ids.rows {
            match positions.get(&id) {
                Some(&pos) => {
                    selected_rows.insert(pos);
                }
                // Hidden by a filter or a collapsed group
                None if known.contains(&id) => {
                    parked.insert(id);
                }
                None => {}
            }
        }

        let selection = Rc::make_mut(&mut self.selection);
        selection.selected_rows = selected_rows;
        selection.selected_cells = ids
            .cells
            .iter()
            .filter_map(|(id, col)| Some(CellPosition::new(*positions.get(id)?, *col)))
            .collect();
        selection.anchor_row = ids.anchor_row.and_then(|id| positions.get(&id).copied());
        selection.anchor_cell = ids
            .anchor_cell
            .and_then(|(id, col)| Some(CellPosition::new(*positions.get(&id)?, col)));
        self.parked_ids = parked;
    }

    // ========================================================================
    // Subscriptions and batching
    // ========================================================================

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&snapshot);
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&GridSnapshot) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Apply several mutations with a single recompute and notification.
    pub fn batch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut GridStore) -> R,
    {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.pending_notify {
            self.pending_notify = false;
            self.recompute();
            self.notify();
        }
        result
    }

    // ========================================================================
    // Data and columns
    // ========================================================================

    /// Replace every row. Rows get fresh ids, so a RowId-tracked selection
    /// is dropped.
    pub fn set_data(&mut self, rows: Vec<Record>) -> bool {
        let start = self.next_row_id;
        self.next_row_id += rows.len() as RowId;
        self.row_ids = (start..self.next_row_id).collect();
        self.rows = Rc::new(rows);
        if self.config.selection_identity == SelectionIdentity::RowId {
            self.parked_ids.clear();
            Rc::make_mut(&mut self.selection).clear();
        }
        log::debug!("set_data: {} rows", self.rows.len());
        self.commit(Stage::Filter);
        true
    }

    pub fn set_data_json(&mut self, json: &str) -> GridResult<bool> {
        let rows = records_from_json(json)?;
        Ok(self.set_data(rows))
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDefinition>) -> bool {
        self.columns.replace(columns);
        self.commit(Stage::Filter);
        true
    }

    pub fn resize_column(&mut self, column_id: &str, width: f64) -> bool {
        if !self.columns.resize(column_id, width) {
            log::debug!("resize_column ignored for {}", column_id);
            return false;
        }
        self.commit(Stage::Clean);
        true
    }

    pub fn set_column_visible(&mut self, column_id: &str, visible: bool) -> bool {
        if !self.columns.set_visible(column_id, visible) {
            return false;
        }
        // The quick filter only searches visible columns
        let stage = if self.quick_filter.is_some() { Stage::Filter } else { Stage::Clean };
        self.commit(stage);
        true
    }

    pub fn move_column(&mut self, column_id: &str, to: usize) -> bool {
        if !self.columns.move_column(column_id, to) {
            return false;
        }
        self.commit(Stage::Clean);
        true
    }

    pub fn register_renderer<F>(&mut self, column_id: &str, renderer: F) -> bool
    where
        F: Fn(&CellValue, &Record) -> RenderDescriptor + 'static,
    {
        if self.columns.get(column_id).is_none() {
            log::debug!("register_renderer ignored for unknown column {}", column_id);
            return false;
        }
        self.columns.register_renderer(column_id, renderer);
        self.commit(Stage::Clean);
        true
    }

    /// Render the cell of `column_id` at a processed position. None for
    /// group headers, unknown columns and positions past the end.
    pub fn render_cell(&self, position: usize, column_id: &str) -> Option<RenderDescriptor> {
        let source = self.processed.get(position)?.source()?;
        let record = self.rows.get(source)?;
        self.columns.render(column_id, record)
    }

    // ========================================================================
    // Sort
    // ========================================================================

    pub fn update_sort(&mut self, column_id: &str, direction: Option<SortDirection>, multi: bool) -> bool {
        if !self.columns.is_sortable(column_id) {
            log::debug!("update_sort ignored for {}", column_id);
            return false;
        }
        if !self.sort.set(column_id, direction, multi) {
            return false;
        }
        self.commit(Stage::Sort);
        true
    }

    /// Cycle a column through ascending, descending and unsorted.
    pub fn toggle_sort(&mut self, column_id: &str, multi: bool) -> bool {
        if !self.columns.is_sortable(column_id) {
            log::debug!("toggle_sort ignored for {}", column_id);
            return false;
        }
        if !self.sort.cycle(column_id, multi) {
            return false;
        }
        self.commit(Stage::Sort);
        true
    }

    pub fn clear_sort(&mut self) -> bool {
        if !self.sort.clear() {
            return false;
        }
        self.commit(Stage::Sort);
        true
    }

    // ========================================================================
    // Filter
    // ========================================================================

    /// Set the filter of one column. A blank value removes it.
    pub fn update_filter(&mut self, column_id: &str, value: &str) -> bool {
        if !self.columns.is_filterable(column_id) {
            log::debug!("update_filter ignored for {}", column_id);
            return false;
        }
        if !self.filter.set(column_id, value) {
            return false;
        }
        self.commit(Stage::Filter);
        true
    }

    pub fn clear_filters(&mut self) -> bool {
        if !self.filter.clear() {
            return false;
        }
        self.commit(Stage::Filter);
        true
    }

    pub fn set_quick_filter(&mut self, text: &str) -> bool {
        let text = text.trim();
        let quick = if text.is_empty() { None } else { Some(text.to_string()) };
        if quick == self.quick_filter {
            return false;
        }
        self.quick_filter = quick;
        self.commit(Stage::Filter);
        true
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    pub fn set_group_by(&mut self, column_ids: Vec<String>) -> bool {
        if column_ids == self.group_by {
            return false;
        }
        self.group_by = column_ids;
        self.commit(Stage::Group);
        true
    }

    pub fn set_aggregations(&mut self, aggregations: AggregationMap) -> bool {
        if aggregations == self.aggregations {
            return false;
        }
        self.aggregations = aggregations;
        self.commit(Stage::Group);
        true
    }

    /// Flip one group node. Unknown ids are ignored.
    pub fn toggle_group(&mut self, id: &str) -> bool {
        self.recompute();
        if find_node(&self.group_tree, id).is_none() {
            log::debug!("toggle_group ignored for unknown node {}", id);
            return false;
        }
        self.expansion.toggle(id);
        self.commit(Stage::Flatten);
        true
    }

    pub fn set_group_expanded(&mut self, id: &str, expanded: bool) -> bool {
        self.recompute();
        if find_node(&self.group_tree, id).is_none() || !self.expansion.set(id, expanded) {
            return false;
        }
        self.commit(Stage::Flatten);
        true
    }

    pub fn expand_all(&mut self) -> bool {
        if !self.expansion.reset(true) {
            return false;
        }
        self.commit(Stage::Flatten);
        true
    }

    pub fn collapse_all(&mut self) -> bool {
        if !self.expansion.reset(false) {
            return false;
        }
        self.commit(Stage::Flatten);
        true
    }

    // ========================================================================
    // Selection
    // ========================================================================

    fn check_position(&self, index: i64, len: usize) -> GridResult<()> {
        if self.config.out_of_range == OutOfRangePolicy::Reject && (index < 0 || index as usize >= len) {
            return Err(GridError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn commit_selection(&mut self, changed: bool) -> bool {
        if changed {
            self.commit(Stage::Clean);
        }
        changed
    }

    pub fn select_row(&mut self, position: i64, mode: SelectionMode) -> GridResult<bool> {
        self.recompute();
        self.check_position(position, self.processed.len())?;
        let len = self.processed.len();
        let changed = Rc::make_mut(&mut self.selection).select_row(position, mode, len);
        Ok(self.commit_selection(changed))
    }

    pub fn select_cell(&mut self, row: i64, col: i64, mode: SelectionMode) -> GridResult<bool> {
        self.recompute();
        self.check_position(row, self.processed.len())?;
        self.check_position(col, self.columns.len())?;
        let (rows, cols) = (self.processed.len(), self.columns.len());
        let changed = Rc::make_mut(&mut self.selection).select_cell(row, col, mode, rows, cols);
        Ok(self.commit_selection(changed))
    }

    pub fn toggle_row(&mut self, position: i64) -> GridResult<bool> {
        self.recompute();
        self.check_position(position, self.processed.len())?;
        let changed = Rc::make_mut(&mut self.selection).toggle_row(position);
        Ok(self.commit_selection(changed))
    }

    /// Select every position of the processed sequence.
    pub fn select_all(&mut self) -> bool {
        self.recompute();
        let len = self.processed.len();
        let changed = Rc::make_mut(&mut self.selection).select_all(len);
        self.commit_selection(changed)
    }

    pub fn invert_selection(&mut self) -> bool {
        self.recompute();
        let len = self.processed.len();
        let changed = Rc::make_mut(&mut self.selection).invert(len);
        self.commit_selection(changed)
    }

    pub fn clear_selection(&mut self) -> bool {
        let parked = !self.parked_ids.is_empty();
        self.parked_ids.clear();
        let changed = Rc::make_mut(&mut self.selection).clear() || parked;
        self.commit_selection(changed)
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    pub fn set_viewport(&mut self, scroll_offset: f64, viewport_height: f64) -> bool {
        if !self.viewport.set_viewport(scroll_offset, viewport_height) {
            return false;
        }
        self.commit(Stage::Window);
        true
    }

    /// Explicit heights for the rows of the current page, by page position.
    pub fn set_row_heights(&mut self, heights: Vec<f64>) -> bool {
        if !self.viewport.set_row_heights(heights) {
            return false;
        }
        self.commit(Stage::Window);
        true
    }

    /// Height of one row of the current page, by page position.
    pub fn set_row_height(&mut self, position: usize, height: f64) -> bool {
        self.recompute();
        if !self.viewport.set_row_height(position, height, self.page_range.len()) {
            return false;
        }
        self.commit(Stage::Window);
        true
    }

    pub fn scroll_to_index(&mut self, position: usize) -> bool {
        self.scroll_to_index_aligned(position, ScrollAlign::Start)
    }

    /// Scroll so that processed position `position` is rendered, moving to
    /// its page first when pagination is on. Positions past the end scroll
    /// to the last row.
    pub fn scroll_to_index_aligned(&mut self, position: usize, align: ScrollAlign) -> bool {
        self.recompute();
        let len = self.processed.len();
        if len == 0 {
            return false;
        }
        let position = position.min(len - 1);

        let mut stage = Stage::Window;
        let mut page_start = self.page_range.start;
        let mut page_len = self.page_range.len();
        if self.pagination.mode() == PaginationMode::Client && self.pagination.is_enabled() {
            let page = self.pagination.page_of(position);
            if self.pagination.go_to_page(page) {
                stage = Stage::Paginate;
                let bounds = page_bounds(len, self.pagination.page_size(), page);
                page_start = bounds.start;
                page_len = bounds.len();
            }
        }

        self.viewport.prepare(page_len);
        let local = position.saturating_sub(page_start);
        let scrolled = self.viewport.scroll_to_index(local, page_len, align);
        if stage == Stage::Window && !scrolled {
            return false;
        }
        self.commit(stage);
        true
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    fn change_page<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Pagination) -> bool,
    {
        self.recompute();
        if !f(&mut self.pagination) {
            return false;
        }
        self.viewport.set_scroll_offset(0.0);
        self.commit(Stage::Paginate);
        true
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        self.change_page(|p| p.set_page_size(page_size))
    }

    /// Jump to a page. Pages outside the valid range are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.change_page(|p| p.go_to_page(page))
    }

    pub fn next_page(&mut self) -> bool {
        self.change_page(Pagination::next_page)
    }

    pub fn previous_page(&mut self) -> bool {
        self.change_page(Pagination::previous_page)
    }

    pub fn first_page(&mut self) -> bool {
        self.change_page(Pagination::first_page)
    }

    pub fn last_page(&mut self) -> bool {
        self.change_page(Pagination::last_page)
    }

    /// Total row count on the server (server pagination mode only).
    pub fn set_remote_total(&mut self, total_rows: usize) -> bool {
        if self.pagination.mode() != PaginationMode::Server {
            log::debug!("set_remote_total ignored in client pagination mode");
            return false;
        }
        if self.pagination.total_rows() == total_rows {
            return false;
        }
        self.pagination.set_total_rows(total_rows);
        self.commit(Stage::Paginate);
        true
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn snapshot(&self) -> GridSnapshot {
        let page_len = self.page_range.len();
        GridSnapshot {
            generation: self.generation,
            columns: self.columns.shared(),
            rows: Rc::clone(&self.rows),
            processed: Rc::clone(&self.processed),
            rendered_range: self.window,
            page_range: self.page_range.clone(),
            selection: Rc::clone(&self.selection),
            sort: self.sort.clone(),
            filter: self.filter.clone(),
            quick_filter: self.quick_filter.clone(),
            group_by: self.group_by.clone(),
            group_tree: Rc::clone(&self.group_tree),
            totals: Rc::clone(&self.totals),
            pagination: self.pagination.state(self.processed.len()),
            scroll_offset: self.viewport.scroll_offset(),
            content_height: self.viewport.content_height(page_len),
        }
    }

    pub fn processed_rows(&self) -> &[DisplayRow] {
        &self.processed
    }

    pub fn rendered_range(&self) -> ViewportWindow {
        self.window
    }

    pub fn page_range(&self) -> Range<usize> {
        self.page_range.clone()
    }

    pub fn selection_state(&self) -> &SelectionState {
        &self.selection
    }

    pub fn sort_state(&self) -> &SortSpec {
        &self.sort
    }

    pub fn filter_state(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn quick_filter(&self) -> Option<&str> {
        self.quick_filter.as_deref()
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn group_tree(&self) -> &[GroupNode] {
        &self.group_tree
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn totals(&self) -> &AggregateValues {
        &self.totals
    }

    pub fn pagination_state(&self) -> PaginationState {
        self.pagination.state(self.processed.len())
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Record behind a processed position (None for group headers).
    pub fn record_at(&self, position: usize) -> Option<&Record> {
        let source = self.processed.get(position)?.source()?;
        self.rows.get(source)
    }

    pub fn row_id(&self, position: usize) -> Option<RowId> {
        self.row_id_at(i64::try_from(position).ok()?)
    }
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl Debug for GridStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridStore")
            .field("generation", &self.generation)
            .field("rows", &self.rows.len())
            .field("columns", &self.columns.len())
            .field("processed", &self.processed.len())
            .field("window", &self.window)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
