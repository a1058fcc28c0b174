/// LiveGrid - Headless Grid Data Engine
///
/// Owns the rows and view state of a data grid and derives what a renderer
/// needs: sorted, filtered and grouped rows, selection, pagination and the
/// virtualized window of rows to draw. Rendering is left to the host.
///
/// All mutation goes through `GridStore`; readers observe immutable
/// `GridSnapshot`s. The `server` feature exposes stores over WebSocket and the
/// `python` feature builds a Python extension module.

pub mod error;
pub mod value;
pub mod column;
pub mod sort;
pub mod filter;
pub mod group;
pub mod selection;
pub mod pagination;
pub mod viewport;
pub mod snapshot;
pub mod config;
pub mod store;
pub mod messages;

pub use error::{GridError, GridResult};
pub use value::{parse_date, records_from_json, CellValue, Record};
pub use column::{CellAlign, ColumnDefinition, ColumnRegistry, ColumnType, RenderDescriptor};
pub use sort::{SortDirection, SortKey, SortSpec};
pub use filter::FilterSpec;
pub use group::{AggregateFn, AggregateValues, AggregationMap, ExpansionState, GroupNode};
pub use selection::{CellPosition, SelectionMode, SelectionState};
pub use pagination::{PaginationMode, PaginationState};
pub use viewport::{ScrollAlign, ViewportWindow};
pub use snapshot::{DisplayRow, GridSnapshot, WindowRow, WindowView};
pub use config::{GridConfig, OutOfRangePolicy, SelectionIdentity};
pub use store::{GridStore, RowId, SubscriptionId};
pub use messages::{GridCommand, GridEvent};

// Python bindings - only when python feature is enabled
#[cfg(feature = "python")]
mod python_bindings;
#[cfg(feature = "python")]
pub use python_bindings::*;

// WebSocket server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;
