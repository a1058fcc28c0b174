/// Python bindings for LiveGrid using PyO3
///
/// Exposes `Grid`, a thin wrapper over `GridStore`. Python values map onto
/// cell values as None → null, bool, int/float → number, str → text and
/// `datetime.date`/`datetime.datetime` → date.

use pyo3::exceptions::{PyIndexError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyList, PyString};
use std::collections::HashMap;

use crate::column::{ColumnDefinition, ColumnType as RustColumnType};
use crate::config::GridConfig;
use crate::error::GridError;
use crate::group::{AggregateFn, AggregationMap};
use crate::messages::GridCommand;
use crate::selection::SelectionMode;
use crate::sort::SortDirection;
use crate::store::GridStore;
use crate::value::{CellValue, Record};
use crate::viewport::ScrollAlign;
use chrono::NaiveDate;

impl From<GridError> for PyErr {
    fn from(err: GridError) -> PyErr {
        match err {
            GridError::IndexOutOfRange { .. } => PyIndexError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

// ============================================================================
// Core Type Conversions
// ============================================================================

/// Python-exposed ColumnType enum
#[pyclass(name = "ColumnType")]
#[derive(Clone, Copy)]
pub struct PyColumnType {
    inner: RustColumnType,
}

#[pymethods]
impl PyColumnType {
    #[classattr]
    const STRING: PyColumnType = PyColumnType { inner: RustColumnType::String };

    #[classattr]
    const NUMBER: PyColumnType = PyColumnType { inner: RustColumnType::Number };

    #[classattr]
    const DATE: PyColumnType = PyColumnType { inner: RustColumnType::Date };

    #[classattr]
    const BOOLEAN: PyColumnType = PyColumnType { inner: RustColumnType::Boolean };

    fn __repr__(&self) -> String {
        match self.inner {
            RustColumnType::String => "ColumnType.STRING".to_string(),
            RustColumnType::Number => "ColumnType.NUMBER".to_string(),
            RustColumnType::Date => "ColumnType.DATE".to_string(),
            RustColumnType::Boolean => "ColumnType.BOOLEAN".to_string(),
        }
    }
}

/// Convert a Python value to a CellValue
fn py_to_cell_value(value: &Bound<'_, PyAny>) -> PyResult<CellValue> {
    if value.is_none() {
        return Ok(CellValue::Null);
    }
    // bool is a subclass of int in Python
    if value.is_instance_of::<PyBool>() {
        return Ok(CellValue::Bool(value.extract()?));
    }
    if value.is_instance_of::<PyString>() {
        return Ok(CellValue::Text(value.extract()?));
    }
    if let Ok(v) = value.extract::<i64>() {
        return Ok(CellValue::from(v));
    }
    if let Ok(v) = value.extract::<f64>() {
        return Ok(CellValue::Number(v));
    }
    if value.hasattr("year")? && value.hasattr("month")? && value.hasattr("day")? {
        let date = NaiveDate::from_ymd_opt(
            value.getattr("year")?.extract()?,
            value.getattr("month")?.extract()?,
            value.getattr("day")?.extract()?,
        )
        .ok_or_else(|| PyValueError::new_err("Invalid date"))?;
        let datetime = if value.hasattr("hour")? {
            date.and_hms_micro_opt(
                value.getattr("hour")?.extract()?,
                value.getattr("minute")?.extract()?,
                value.getattr("second")?.extract()?,
                value.getattr("microsecond")?.extract()?,
            )
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return datetime
            .map(CellValue::Date)
            .ok_or_else(|| PyValueError::new_err("Invalid time"));
    }
    Err(PyTypeError::new_err(format!(
        "Unsupported cell value type: {}",
        value.get_type().name()?
    )))
}

/// Convert a CellValue to a Python object. Dates become ISO strings.
fn cell_value_to_py(py: Python, value: &CellValue) -> PyObject {
    match value {
        CellValue::Null => py.None(),
        CellValue::Bool(b) => (*b).into_py(py),
        CellValue::Number(n) => (*n).into_py(py),
        CellValue::Text(s) => s.as_str().into_py(py),
        CellValue::Date(_) => value.display().into_py(py),
    }
}

fn py_to_record(row: &Bound<'_, PyAny>) -> PyResult<Record> {
    let dict = row
        .downcast::<PyDict>()
        .map_err(|_| PyTypeError::new_err("Rows must be dicts"))?;
    let mut record = Record::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        record.insert(key.extract::<String>()?, py_to_cell_value(&value)?);
    }
    Ok(record)
}

fn parse_direction(direction: Option<&str>) -> PyResult<Option<SortDirection>> {
    match direction.map(|d| d.to_lowercase()).as_deref() {
        None | Some("none") => Ok(None),
        Some("asc") | Some("ascending") => Ok(Some(SortDirection::Asc)),
        Some("desc") | Some("descending") => Ok(Some(SortDirection::Desc)),
        Some(other) => Err(PyValueError::new_err(format!("Unknown sort direction: {}", other))),
    }
}

fn parse_mode(mode: &str) -> PyResult<SelectionMode> {
    match mode.to_lowercase().as_str() {
        "none" => Ok(SelectionMode::None),
        "single" => Ok(SelectionMode::Single),
        "multiple" | "multi" => Ok(SelectionMode::Multiple),
        "range" => Ok(SelectionMode::Range),
        other => Err(PyValueError::new_err(format!("Unknown selection mode: {}", other))),
    }
}

fn parse_align(align: &str) -> PyResult<ScrollAlign> {
    match align.to_lowercase().as_str() {
        "start" => Ok(ScrollAlign::Start),
        "center" => Ok(ScrollAlign::Center),
        "end" => Ok(ScrollAlign::End),
        "auto" => Ok(ScrollAlign::Auto),
        other => Err(PyValueError::new_err(format!("Unknown scroll alignment: {}", other))),
    }
}

fn parse_config(config_json: Option<&str>) -> PyResult<GridConfig> {
    match config_json {
        Some(json) => Ok(GridConfig::from_json(json)?),
        None => Ok(GridConfig::default()),
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Python wrapper for GridStore
#[pyclass(name = "Grid", unsendable)]
pub struct PyGrid {
    inner: GridStore,
}

#[pymethods]
impl PyGrid {
    /// Create a grid from `(id, ColumnType)` pairs and an optional JSON config.
    #[new]
    #[pyo3(signature = (columns, config_json=None))]
    fn new(columns: Vec<(String, PyColumnType)>, config_json: Option<&str>) -> PyResult<Self> {
        let columns = columns
            .into_iter()
            .map(|(id, ty)| ColumnDefinition::new(id, ty.inner))
            .collect();
        Ok(PyGrid {
            inner: GridStore::with_columns(columns, parse_config(config_json)?),
        })
    }

    /// Create a grid from a JSON array of column definitions.
    #[staticmethod]
    #[pyo3(signature = (columns_json, config_json=None))]
    fn from_json(columns_json: &str, config_json: Option<&str>) -> PyResult<Self> {
        let columns: Vec<ColumnDefinition> =
            serde_json::from_str(columns_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(PyGrid {
            inner: GridStore::with_columns(columns, parse_config(config_json)?),
        })
    }

    fn __len__(&self) -> usize {
        self.inner.processed_rows().len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Grid(rows={}, processed={}, generation={})",
            self.inner.rows().len(),
            self.inner.processed_rows().len(),
            self.inner.generation()
        )
    }

    // === Data ===

    fn set_data(&mut self, rows: &Bound<'_, PyList>) -> PyResult<bool> {
        let records = rows.iter().map(|row| py_to_record(&row)).collect::<PyResult<Vec<_>>>()?;
        Ok(self.inner.set_data(records))
    }

    fn set_data_json(&mut self, json: &str) -> PyResult<bool> {
        Ok(self.inner.set_data_json(json)?)
    }

    /// Apply a JSON-encoded command, e.g. `{"type": "NextPage"}`.
    fn apply(&mut self, command_json: &str) -> PyResult<bool> {
        let command: GridCommand =
            serde_json::from_str(command_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(command.apply(&mut self.inner)?)
    }

    // === Sort and filter ===

    #[pyo3(signature = (column_id, direction=None, multi=false))]
    fn update_sort(&mut self, column_id: &str, direction: Option<&str>, multi: bool) -> PyResult<bool> {
        Ok(self.inner.update_sort(column_id, parse_direction(direction)?, multi))
    }

    #[pyo3(signature = (column_id, multi=false))]
    fn toggle_sort(&mut self, column_id: &str, multi: bool) -> bool {
        self.inner.toggle_sort(column_id, multi)
    }

    fn clear_sort(&mut self) -> bool {
        self.inner.clear_sort()
    }

    fn update_filter(&mut self, column_id: &str, value: &str) -> bool {
        self.inner.update_filter(column_id, value)
    }

    fn clear_filters(&mut self) -> bool {
        self.inner.clear_filters()
    }

    fn set_quick_filter(&mut self, text: &str) -> bool {
        self.inner.set_quick_filter(text)
    }

    // === Grouping ===

    fn set_group_by(&mut self, column_ids: Vec<String>) -> bool {
        self.inner.set_group_by(column_ids)
    }

    /// Set aggregations as `{column_id: ["sum", "avg", ...]}`.
    fn set_aggregations(&mut self, aggregations: HashMap<String, Vec<String>>) -> PyResult<bool> {
        let mut map = AggregationMap::new();
        for (column_id, names) in aggregations {
            let funcs = names
                .iter()
                .map(|name| {
                    AggregateFn::parse(name)
                        .ok_or_else(|| PyValueError::new_err(format!("Unknown aggregate function: {}", name)))
                })
                .collect::<PyResult<Vec<_>>>()?;
            map.insert(column_id, funcs);
        }
        Ok(self.inner.set_aggregations(map))
    }

    fn toggle_group(&mut self, id: &str) -> bool {
        self.inner.toggle_group(id)
    }

    fn expand_all(&mut self) -> bool {
        self.inner.expand_all()
    }

    fn collapse_all(&mut self) -> bool {
        self.inner.collapse_all()
    }

    // === Selection ===

    #[pyo3(signature = (position, mode="single"))]
    fn select_row(&mut self, position: i64, mode: &str) -> PyResult<bool> {
        Ok(self.inner.select_row(position, parse_mode(mode)?)?)
    }

    #[pyo3(signature = (row, col, mode="single"))]
    fn select_cell(&mut self, row: i64, col: i64, mode: &str) -> PyResult<bool> {
        Ok(self.inner.select_cell(row, col, parse_mode(mode)?)?)
    }

    fn toggle_row(&mut self, position: i64) -> PyResult<bool> {
        Ok(self.inner.toggle_row(position)?)
    }

    fn select_all(&mut self) -> bool {
        self.inner.select_all()
    }

    fn invert_selection(&mut self) -> bool {
        self.inner.invert_selection()
    }

    fn clear_selection(&mut self) -> bool {
        self.inner.clear_selection()
    }

    fn selected_rows(&self) -> Vec<i64> {
        self.inner.selection_state().selected_rows.iter().copied().collect()
    }

    // === Viewport and pagination ===

    fn set_viewport(&mut self, scroll_offset: f64, viewport_height: f64) -> bool {
        self.inner.set_viewport(scroll_offset, viewport_height)
    }

    fn set_row_heights(&mut self, heights: Vec<f64>) -> bool {
        self.inner.set_row_heights(heights)
    }

    #[pyo3(signature = (position, align="start"))]
    fn scroll_to_index(&mut self, position: usize, align: &str) -> PyResult<bool> {
        Ok(self.inner.scroll_to_index_aligned(position, parse_align(align)?))
    }

    fn rendered_range(&self) -> (usize, usize) {
        let window = self.inner.rendered_range();
        (window.start, window.end)
    }

    fn set_page_size(&mut self, page_size: usize) -> bool {
        self.inner.set_page_size(page_size)
    }

    fn go_to_page(&mut self, page: usize) -> bool {
        self.inner.go_to_page(page)
    }

    fn next_page(&mut self) -> bool {
        self.inner.next_page()
    }

    fn previous_page(&mut self) -> bool {
        self.inner.previous_page()
    }

    fn set_remote_total(&mut self, total_rows: usize) -> bool {
        self.inner.set_remote_total(total_rows)
    }

    fn page_buttons(&self) -> Vec<i64> {
        self.inner.pagination_state().page_buttons
    }

    // === Columns ===

    fn resize_column(&mut self, column_id: &str, width: f64) -> bool {
        self.inner.resize_column(column_id, width)
    }

    fn set_column_visible(&mut self, column_id: &str, visible: bool) -> bool {
        self.inner.set_column_visible(column_id, visible)
    }

    fn move_column(&mut self, column_id: &str, to: usize) -> bool {
        self.inner.move_column(column_id, to)
    }

    // === Reads ===

    fn processed_len(&self) -> usize {
        self.inner.processed_rows().len()
    }

    /// Row at a processed position as a dict; None for group headers.
    fn get_row(&self, py: Python, position: usize) -> PyResult<Option<PyObject>> {
        if position >= self.inner.processed_rows().len() {
            return Err(PyIndexError::new_err(format!("Position {} out of range", position)));
        }
        match self.inner.record_at(position) {
            Some(record) => {
                let dict = PyDict::new_bound(py);
                for (key, value) in record {
                    dict.set_item(key, cell_value_to_py(py, value))?;
                }
                Ok(Some(dict.into_py(py)))
            }
            None => Ok(None),
        }
    }

    /// The rendered window as JSON.
    fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.snapshot().window_view()).map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// Python module for LiveGrid
#[pymodule]
fn livegrid(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyColumnType>()?;
    m.add_class::<PyGrid>()?;
    Ok(())
}
