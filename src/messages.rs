/// Command/event protocol for driving a grid from outside the process
///
/// Every store mutator has a `GridCommand` variant; commands are JSON objects
/// tagged by `type`:
///
/// ```
/// use livegrid::messages::GridCommand;
///
/// let cmd: GridCommand = serde_json::from_str(r#"{"type": "ToggleSort", "column_id": "age"}"#).unwrap();
/// assert_eq!(cmd, GridCommand::ToggleSort { column_id: "age".to_string(), multi: false });
/// ```
use crate::column::ColumnDefinition;
use crate::error::GridResult;
use crate::group::AggregationMap;
use crate::selection::SelectionMode;
use crate::snapshot::WindowView;
use crate::sort::SortDirection;
use crate::store::GridStore;
use crate::value::Record;
use crate::viewport::ScrollAlign;
use serde::{Deserialize, Serialize};

/// A store mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GridCommand {
    SetData {
        rows: Vec<Record>,
    },
    SetColumns {
        columns: Vec<ColumnDefinition>,
    },

    UpdateSort {
        column_id: String,
        /// null removes the column from the sort
        direction: Option<SortDirection>,
        #[serde(default)]
        multi: bool,
    },
    ToggleSort {
        column_id: String,
        #[serde(default)]
        multi: bool,
    },
    ClearSort,

    UpdateFilter {
        column_id: String,
        value: String,
    },
    ClearFilters,
    SetQuickFilter {
        text: String,
    },

    SetGroupBy {
        column_ids: Vec<String>,
    },
    SetAggregations {
        aggregations: AggregationMap,
    },
    ToggleGroup {
        id: String,
    },
    SetGroupExpanded {
        id: String,
        expanded: bool,
    },
    ExpandAll,
    CollapseAll,

    SelectRow {
        position: i64,
        mode: SelectionMode,
    },
    SelectCell {
        row: i64,
        col: i64,
        mode: SelectionMode,
    },
    ToggleRow {
        position: i64,
    },
    SelectAll,
    InvertSelection,
    ClearSelection,

    SetViewport {
        scroll_offset: f64,
        viewport_height: f64,
    },
    SetRowHeights {
        heights: Vec<f64>,
    },
    SetRowHeight {
        position: usize,
        height: f64,
    },
    ScrollToIndex {
        position: usize,
        #[serde(default)]
        align: ScrollAlign,
    },

    SetPageSize {
        page_size: usize,
    },
    GoToPage {
        page: usize,
    },
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    SetRemoteTotal {
        total_rows: usize,
    },

    ResizeColumn {
        column_id: String,
        width: f64,
    },
    SetColumnVisible {
        column_id: String,
        visible: bool,
    },
    MoveColumn {
        column_id: String,
        to: usize,
    },
}

impl GridCommand {
    /// Apply the command. Returns whether the store changed.
    pub fn apply(self, store: &mut GridStore) -> GridResult<bool> {
        let changed = match self {
            GridCommand::SetData { rows } => store.set_data(rows),
            GridCommand::SetColumns { columns } => store.set_columns(columns),
            GridCommand::UpdateSort {
                column_id,
                direction,
                multi,
            } => store.update_sort(&column_id, direction, multi),
            GridCommand::ToggleSort { column_id, multi } => store.toggle_sort(&column_id, multi),
            GridCommand::ClearSort => store.clear_sort(),
            GridCommand::UpdateFilter { column_id, value } => store.update_filter(&column_id, &value),
            GridCommand::ClearFilters => store.clear_filters(),
            GridCommand::SetQuickFilter { text } => store.set_quick_filter(&text),
            GridCommand::SetGroupBy { column_ids } => store.set_group_by(column_ids),
            GridCommand::SetAggregations { aggregations } => store.set_aggregations(aggregations),
            GridCommand::ToggleGroup { id } => store.toggle_group(&id),
            GridCommand::SetGroupExpanded { id, expanded } => store.set_group_expanded(&id, expanded),
            GridCommand::ExpandAll => store.expand_all(),
            GridCommand::CollapseAll => store.collapse_all(),
            GridCommand::SelectRow { position, mode } => store.select_row(position, mode)?,
            GridCommand::SelectCell { row, col, mode } => store.select_cell(row, col, mode)?,
            GridCommand::ToggleRow { position } => store.toggle_row(position)?,
            GridCommand::SelectAll => store.select_all(),
            GridCommand::InvertSelection => store.invert_selection(),
            GridCommand::ClearSelection => store.clear_selection(),
            GridCommand::SetViewport {
                scroll_offset,
                viewport_height,
            } => store.set_viewport(scroll_offset, viewport_height),
            GridCommand::SetRowHeights { heights } => store.set_row_heights(heights),
            GridCommand::SetRowHeight { position, height } => store.set_row_height(position, height),
            GridCommand::ScrollToIndex { position, align } => store.scroll_to_index_aligned(position, align),
            GridCommand::SetPageSize { page_size } => store.set_page_size(page_size),
            GridCommand::GoToPage { page } => store.go_to_page(page),
            GridCommand::NextPage => store.next_page(),
            GridCommand::PreviousPage => store.previous_page(),
            GridCommand::FirstPage => store.first_page(),
            GridCommand::LastPage => store.last_page(),
            GridCommand::SetRemoteTotal { total_rows } => store.set_remote_total(total_rows),
            GridCommand::ResizeColumn { column_id, width } => store.resize_column(&column_id, width),
            GridCommand::SetColumnVisible { column_id, visible } => {
                store.set_column_visible(&column_id, visible)
            }
            GridCommand::MoveColumn { column_id, to } => store.move_column(&column_id, to),
        };
        Ok(changed)
    }
}

/// Session-level messages from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionMessage {
    /// Start a grid session over a named dataset
    Open { dataset: String },
    /// Ask for the current window without changing anything
    Refresh,
}

/// Anything a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Session(SessionMessage),
    Command(GridCommand),
}

/// Messages sent back to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GridEvent {
    /// Current rendered window
    Snapshot(WindowView),

    /// Error occurred
    Error { message: String },
}

impl GridEvent {
    pub fn snapshot(store: &GridStore) -> Self {
        GridEvent::Snapshot(store.snapshot().window_view())
    }

    pub fn error(message: impl Into<String>) -> Self {
        GridEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::config::{GridConfig, OutOfRangePolicy};
    use crate::error::GridError;

    fn store() -> GridStore {
        let mut store = GridStore::with_columns(
            vec![
                ColumnDefinition::new("name", ColumnType::String),
                ColumnDefinition::new("age", ColumnType::Number),
            ],
            GridConfig {
                out_of_range: OutOfRangePolicy::Reject,
                ..GridConfig::default()
            },
        );
        store
            .set_data_json(r#"[{"name": "b", "age": 40}, {"name": "a", "age": 30}, {"name": "c", "age": 20}]"#)
            .unwrap();
        store
    }

    fn command(json: &str) -> GridCommand {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_commands_drive_store() {
        let mut store = store();
        assert!(command(r#"{"type": "UpdateSort", "column_id": "age", "direction": "asc"}"#)
            .apply(&mut store)
            .unwrap());
        assert_eq!(store.record_at(0).map(|r| r["name"].display()), Some("c".to_string()));

        assert!(command(r#"{"type": "UpdateFilter", "column_id": "age", "value": ">=30"}"#)
            .apply(&mut store)
            .unwrap());
        assert_eq!(store.processed_rows().len(), 2);

        assert!(command(r#"{"type": "SelectRow", "position": 1, "mode": "single"}"#)
            .apply(&mut store)
            .unwrap());
        assert!(store.selection_state().is_row_selected(1));

        assert!(command(r#"{"type": "ClearSort"}"#).apply(&mut store).unwrap());
        assert!(!command(r#"{"type": "ClearSort"}"#).apply(&mut store).unwrap());
    }

    #[test]
    fn test_command_errors_propagate() {
        let mut store = store();
        let result = command(r#"{"type": "SelectRow", "position": 7, "mode": "multiple"}"#).apply(&mut store);
        assert!(matches!(result, Err(GridError::IndexOutOfRange { index: 7, len: 3 })));
    }

    #[test]
    fn test_scroll_command_defaults_to_start() {
        assert_eq!(
            command(r#"{"type": "ScrollToIndex", "position": 12}"#),
            GridCommand::ScrollToIndex {
                position: 12,
                align: ScrollAlign::Start
            }
        );
    }

    #[test]
    fn test_client_message_dispatch() {
        let open: ClientMessage = serde_json::from_str(r#"{"type": "Open", "dataset": "demo"}"#).unwrap();
        assert_eq!(
            open,
            ClientMessage::Session(SessionMessage::Open {
                dataset: "demo".to_string()
            })
        );
        let cmd: ClientMessage = serde_json::from_str(r#"{"type": "NextPage"}"#).unwrap();
        assert_eq!(cmd, ClientMessage::Command(GridCommand::NextPage));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "Explode"}"#).is_err());
    }

    #[test]
    fn test_snapshot_event_json() {
        let store = store();
        let json = serde_json::to_value(GridEvent::snapshot(&store)).unwrap();
        assert_eq!(json["type"], "Snapshot");
        assert_eq!(json["total_rows"], 3);
        assert_eq!(json["rows"].as_array().map(Vec::len), Some(3));

        let error = serde_json::to_value(GridEvent::error("boom")).unwrap();
        assert_eq!(error, serde_json::json!({"type": "Error", "message": "boom"}));
    }
}
