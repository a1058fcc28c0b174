/// Immutable grid snapshots
///
/// A `GridSnapshot` is what the store publishes after every effective
/// mutation. It shares its buffers with the store through `Rc`, so producing
/// one costs a handful of reference-count bumps. The store replaces buffers
/// instead of mutating them while a snapshot holds them.
///
/// `WindowView` is the serializable form sent to clients: only the rendered
/// rows are materialized.

use crate::column::ColumnDefinition;
use crate::filter::FilterSpec;
use crate::group::{find_node, AggregateValues, GroupNode};
use crate::pagination::PaginationState;
use crate::selection::{CellPosition, SelectionState};
use crate::sort::SortSpec;
use crate::value::{CellValue, Record};
use crate::viewport::ViewportWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::rc::Rc;

/// One entry of the processed sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DisplayRow {
    /// A data row, by index into the raw rows
    Data { source: usize, depth: usize },
    /// A group header
    Group {
        id: String,
        depth: usize,
        expanded: bool,
        row_count: usize,
    },
}

impl DisplayRow {
    pub fn source(&self) -> Option<usize> {
        match self {
            DisplayRow::Data { source, .. } => Some(*source),
            DisplayRow::Group { .. } => None,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            DisplayRow::Data { depth, .. } | DisplayRow::Group { depth, .. } => *depth,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, DisplayRow::Group { .. })
    }
}

#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pub generation: u64,
    pub columns: Rc<Vec<ColumnDefinition>>,
    pub rows: Rc<Vec<Record>>,
    pub processed: Rc<Vec<DisplayRow>>,
    /// Materialized positions, absolute in the processed sequence
    pub rendered_range: ViewportWindow,
    pub page_range: Range<usize>,
    pub selection: Rc<SelectionState>,
    pub sort: SortSpec,
    pub filter: FilterSpec,
    pub quick_filter: Option<String>,
    pub group_by: Vec<String>,
    pub group_tree: Rc<Vec<GroupNode>>,
    /// Grand totals over every filtered row
    pub totals: Rc<AggregateValues>,
    pub pagination: PaginationState,
    pub scroll_offset: f64,
    /// Scrollable height of the current page
    pub content_height: f64,
}

impl GridSnapshot {
    pub fn processed_rows(&self) -> &[DisplayRow] {
        &self.processed
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Record behind a processed position (None for group headers).
    pub fn record_at(&self, position: usize) -> Option<&Record> {
        let source = self.processed.get(position)?.source()?;
        self.rows.get(source)
    }

    /// Rendered rows with their absolute positions.
    pub fn rendered_rows(&self) -> impl Iterator<Item = (usize, &DisplayRow)> + '_ {
        let range = self.rendered_range;
        self.processed[range.start..range.end]
            .iter()
            .enumerate()
            .map(move |(offset, row)| (range.start + offset, row))
    }

    pub fn window_view(&self) -> WindowView {
        let visible: Vec<&ColumnDefinition> = self.columns.iter().filter(|c| c.visible).collect();
        let rows = self
            .rendered_rows()
            .filter_map(|(position, row)| match row {
                DisplayRow::Data { source, depth } => {
                    let record = self.rows.get(*source)?;
                    let cells = visible
                        .iter()
                        .map(|c| (c.id.clone(), c.value(record).clone()))
                        .collect();
                    Some(WindowRow::Data {
                        position,
                        source: *source,
                        depth: *depth,
                        selected: self.selection.is_row_selected(position as i64),
                        cells,
                    })
                }
                DisplayRow::Group { id, depth, expanded, row_count } => {
                    let node = find_node(&self.group_tree, id);
                    Some(WindowRow::Group {
                        position,
                        id: id.clone(),
                        column_id: node.map(|n| n.column_id.clone()).unwrap_or_default(),
                        key: node.map(|n| n.key.clone()).unwrap_or_default(),
                        depth: *depth,
                        expanded: *expanded,
                        row_count: *row_count,
                        aggregations: node.map(|n| n.aggregations.clone()).unwrap_or_default(),
                    })
                }
            })
            .collect();

        WindowView {
            generation: self.generation,
            columns: self.columns.as_ref().clone(),
            total_rows: self.processed.len(),
            start: self.rendered_range.start,
            end: self.rendered_range.end,
            rows,
            selected_rows: self.selection.selected_rows.iter().copied().collect(),
            selected_cells: self.selection.selected_cells.iter().copied().collect(),
            sort: self.sort.clone(),
            filter: self.filter.clone(),
            quick_filter: self.quick_filter.clone(),
            group_by: self.group_by.clone(),
            totals: self.totals.as_ref().clone(),
            pagination: self.pagination.clone(),
            scroll_offset: self.scroll_offset,
            content_height: self.content_height,
        }
    }
}

/// One materialized row of a `WindowView`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WindowRow {
    Data {
        position: usize,
        source: usize,
        depth: usize,
        selected: bool,
        /// Visible column id → value
        cells: BTreeMap<String, CellValue>,
    },
    Group {
        position: usize,
        id: String,
        column_id: String,
        key: CellValue,
        depth: usize,
        expanded: bool,
        row_count: usize,
        aggregations: AggregateValues,
    },
}

/// Serializable view of the rendered window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowView {
    pub generation: u64,
    pub columns: Vec<ColumnDefinition>,
    pub total_rows: usize,
    pub start: usize,
    pub end: usize,
    pub rows: Vec<WindowRow>,
    pub selected_rows: Vec<i64>,
    pub selected_cells: Vec<CellPosition>,
    pub sort: SortSpec,
    pub filter: FilterSpec,
    pub quick_filter: Option<String>,
    pub group_by: Vec<String>,
    pub totals: AggregateValues,
    pub pagination: PaginationState,
    pub scroll_offset: f64,
    pub content_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::pagination::{Pagination, PaginationMode};

    fn snapshot(processed: Vec<DisplayRow>, rendered: ViewportWindow) -> GridSnapshot {
        let rows: Vec<Record> = (0..3)
            .map(|i| {
                let mut r = Record::new();
                r.insert("n".to_string(), CellValue::from(i as f64));
                r.insert("hidden".to_string(), CellValue::from("x"));
                r
            })
            .collect();
        let len = processed.len();
        GridSnapshot {
            generation: 4,
            columns: Rc::new(vec![
                ColumnDefinition::new("n", ColumnType::Number),
                ColumnDefinition::new("hidden", ColumnType::String).visible(false),
            ]),
            rows: Rc::new(rows),
            processed: Rc::new(processed),
            rendered_range: rendered,
            page_range: 0..len,
            selection: Rc::new(SelectionState::default()),
            sort: SortSpec::default(),
            filter: FilterSpec::default(),
            quick_filter: None,
            group_by: Vec::new(),
            group_tree: Rc::new(Vec::new()),
            totals: Rc::new(AggregateValues::new()),
            pagination: Pagination::new(0, PaginationMode::Client, 7).state(len),
            scroll_offset: 0.0,
            content_height: 0.0,
        }
    }

    #[test]
    fn test_record_at_skips_group_headers() {
        let snap = snapshot(
            vec![
                DisplayRow::Group { id: "g".into(), depth: 0, expanded: true, row_count: 1 },
                DisplayRow::Data { source: 2, depth: 1 },
            ],
            ViewportWindow { start: 0, end: 2 },
        );
        assert!(snap.record_at(0).is_none());
        assert_eq!(snap.record_at(1).map(|r| &r["n"]), Some(&CellValue::Number(2.0)));
        assert!(snap.record_at(5).is_none());
    }

    #[test]
    fn test_window_view_materializes_only_rendered_rows() {
        let processed = (0..3).map(|source| DisplayRow::Data { source, depth: 0 }).collect();
        let snap = snapshot(processed, ViewportWindow { start: 1, end: 3 });
        let view = snap.window_view();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.total_rows, 3);
        let WindowRow::Data { position, cells, .. } = &view.rows[0] else {
            panic!("expected data row");
        };
        assert_eq!(*position, 1);
        // Hidden columns are not sent
        assert_eq!(cells.len(), 1);
        assert_eq!(cells["n"], CellValue::Number(1.0));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["rows"][0]["type"], "data");
        assert_eq!(json["generation"], 4);
    }
}
