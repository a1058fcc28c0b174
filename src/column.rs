/// LiveGrid Column Registry
///
/// A ColumnDefinition describes one grid column: which record field it reads,
/// how values are typed, and which interactions (sort, filter, resize) it allows.
/// The registry owns the published column list and the per-column cell renderers.
///
/// The column list is shared with snapshots through an `Rc`. Edits such as a
/// resize copy the list first, so a published snapshot never changes under a reader.

use crate::value::{CellValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

pub const DEFAULT_COLUMN_WIDTH: f64 = 150.0;
pub const DEFAULT_MIN_COLUMN_WIDTH: f64 = 40.0;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
}

fn default_true() -> bool {
    true
}

fn default_width() -> f64 {
    DEFAULT_COLUMN_WIDTH
}

fn default_min_width() -> f64 {
    DEFAULT_MIN_COLUMN_WIDTH
}

/// Definition of a single column.
///
/// # Examples
///
/// ```
/// use livegrid::{ColumnDefinition, ColumnType};
///
/// let col = ColumnDefinition::new("age", ColumnType::Number)
///     .with_header("Age")
///     .with_width(80.0);
/// assert_eq!(col.field, "age");
/// assert!(col.sortable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    /// Record field read by this column. Defaults to the column id.
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub header: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    #[serde(default = "default_true")]
    pub resizable: bool,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl ColumnDefinition {
    /// Create a column whose id, field and header are all `id`, with every
    /// interaction enabled.
    pub fn new(id: impl Into<String>, column_type: ColumnType) -> Self {
        let id = id.into();
        ColumnDefinition {
            field: id.clone(),
            header: id.clone(),
            id,
            column_type,
            sortable: true,
            filterable: true,
            resizable: true,
            width: DEFAULT_COLUMN_WIDTH,
            min_width: DEFAULT_MIN_COLUMN_WIDTH,
            visible: true,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Fill in defaults that serde leaves empty.
    fn normalized(mut self) -> Self {
        if self.field.is_empty() {
            self.field = self.id.clone();
        }
        if self.header.is_empty() {
            self.header = self.id.clone();
        }
        self
    }

    /// Value of this column in a record (Null when the field is absent).
    pub fn value<'a>(&self, record: &'a Record) -> &'a CellValue {
        const NULL: &CellValue = &CellValue::Null;
        record.get(&self.field).unwrap_or(NULL)
    }
}

/// Horizontal alignment hint for rendered cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellAlign {
    Left,
    Center,
    Right,
}

/// Typed output of a cell renderer. The rendering layer decides how to paint it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDescriptor {
    pub text: String,
    pub align: CellAlign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl RenderDescriptor {
    pub fn text(text: impl Into<String>, align: CellAlign) -> Self {
        RenderDescriptor {
            text: text.into(),
            align,
            tooltip: None,
        }
    }
}

/// Pure per-column cell renderer.
pub type CellRenderer = Rc<dyn Fn(&CellValue, &Record) -> RenderDescriptor>;

/// Renderer used when a column has none registered.
pub fn default_render(column: &ColumnDefinition, value: &CellValue) -> RenderDescriptor {
    match column.column_type {
        ColumnType::Number => RenderDescriptor::text(value.display(), CellAlign::Right),
        ColumnType::Boolean => {
            let text = match value.as_bool() {
                Some(true) => "✓".to_string(),
                Some(false) => String::new(),
                None => value.display(),
            };
            RenderDescriptor::text(text, CellAlign::Center)
        }
        ColumnType::Date => {
            let text = value
                .as_date()
                .map(|dt| CellValue::Date(dt).display())
                .unwrap_or_else(|| value.display());
            RenderDescriptor::text(text, CellAlign::Left)
        }
        ColumnType::String => RenderDescriptor::text(value.display(), CellAlign::Left),
    }
}

/// Registry of column definitions and renderers.
#[derive(Clone, Default)]
pub struct ColumnRegistry {
    columns: Rc<Vec<ColumnDefinition>>,
    renderers: HashMap<String, CellRenderer>,
}

impl ColumnRegistry {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        ColumnRegistry {
            columns: Rc::new(columns.into_iter().map(ColumnDefinition::normalized).collect()),
            renderers: HashMap::new(),
        }
    }

    /// Replace the column set wholesale. Renderers registered for ids that
    /// survive the change are kept.
    pub fn replace(&mut self, columns: Vec<ColumnDefinition>) {
        self.columns = Rc::new(columns.into_iter().map(ColumnDefinition::normalized).collect());
        let columns = &self.columns;
        self.renderers.retain(|id, _| columns.iter().any(|c| &c.id == id));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Shared handle to the published column list.
    pub fn shared(&self) -> Rc<Vec<ColumnDefinition>> {
        Rc::clone(&self.columns)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn is_sortable(&self, id: &str) -> bool {
        self.get(id).map(|c| c.sortable).unwrap_or(false)
    }

    pub fn is_filterable(&self, id: &str) -> bool {
        self.get(id).map(|c| c.filterable).unwrap_or(false)
    }

    /// Resize a column. Returns false when the column is unknown, not
    /// resizable, or already at the requested width.
    pub fn resize(&mut self, id: &str, width: f64) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let column = &self.columns[pos];
        if !column.resizable || !width.is_finite() {
            return false;
        }
        let width = width.max(column.min_width);
        if column.width == width {
            return false;
        }
        Rc::make_mut(&mut self.columns)[pos].width = width;
        true
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        match self.position(id) {
            Some(pos) if self.columns[pos].visible != visible => {
                Rc::make_mut(&mut self.columns)[pos].visible = visible;
                true
            }
            _ => false,
        }
    }

    /// Move a column to a new position (clamped to the end).
    pub fn move_column(&mut self, id: &str, to: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = to.min(self.columns.len() - 1);
        if from == to {
            return false;
        }
        let columns = Rc::make_mut(&mut self.columns);
        let column = columns.remove(from);
        columns.insert(to, column);
        true
    }

    pub fn register_renderer<F>(&mut self, id: &str, renderer: F)
    where
        F: Fn(&CellValue, &Record) -> RenderDescriptor + 'static,
    {
        self.renderers.insert(id.to_string(), Rc::new(renderer));
    }

    pub fn unregister_renderer(&mut self, id: &str) -> bool {
        self.renderers.remove(id).is_some()
    }

    /// Render one cell of `record` with the column's renderer (or the default).
    pub fn render(&self, id: &str, record: &Record) -> Option<RenderDescriptor> {
        let column = self.get(id)?;
        let value = column.value(record);
        Some(match self.renderers.get(id) {
            Some(renderer) => renderer(value, record),
            None => default_render(column, value),
        })
    }
}

impl Debug for ColumnRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.columns.iter().map(|c| c.id.as_str()).collect();
        write!(
            f,
            "ColumnRegistry {{ columns: {:?}, renderers: {} }}",
            ids,
            self.renderers.len()
        )
    }
}
