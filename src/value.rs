/// LiveGrid Cell Values
///
/// A `CellValue` is the dynamically typed payload of one cell. Rows are opaque
/// field→value records; the column registry decides how a value is interpreted
/// (number, date, boolean or text) when sorting, filtering and aggregating.
///
/// Values are serialized untagged, so a row looks like plain JSON:
///
/// ```
/// use livegrid::{CellValue, Record};
///
/// let row: Record = serde_json::from_str(r#"{"name": "Alice", "age": 30, "active": true}"#).unwrap();
/// assert_eq!(row.get("age"), Some(&CellValue::Number(30.0)));
/// assert_eq!(row["name"].display(), "Alice");
/// ```

use crate::error::{GridError, GridResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of raw data: field name → cell value.
pub type Record = HashMap<String, CellValue>;

/// Cell value enum covering every column type the grid understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse the date spellings the grid accepts in text cells and filter inputs.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the value. Text is parsed, booleans count as 1/0 and
    /// dates become epoch milliseconds.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Date(dt) => Some(dt.and_utc().timestamp_millis() as f64),
            _ => None,
        }
    }

    /// Date view of the value. Numbers are read as epoch milliseconds.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(dt) => Some(*dt),
            CellValue::Text(s) => parse_date(s),
            CellValue::Number(n) if n.is_finite() => {
                DateTime::from_timestamp_millis(*n as i64).map(|dt| dt.naive_utc())
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text shown for the value and used for substring matching.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(dt) => {
                if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Canonical key used to partition rows into groups. Equal values of the
    /// same kind always produce the same key (`1` and `1.0` included).
    pub fn group_key(&self) -> String {
        match self {
            CellValue::Null => "\u{0}null".to_string(),
            CellValue::Bool(b) => format!("b:{}", b),
            CellValue::Number(n) => format!("n:{}", format_number(*n)),
            CellValue::Text(s) => format!("s:{}", s),
            CellValue::Date(dt) => format!("d:{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::Date(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Parse a JSON array of row objects.
pub fn records_from_json(json: &str) -> GridResult<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    records_from_json_value(value)
}

pub fn records_from_json_value(value: serde_json::Value) -> GridResult<Vec<Record>> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(GridError::InvalidData(format!(
                "expected a JSON array of row objects, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(GridError::InvalidData(format!(
                "row {} is {}, expected an object",
                i,
                json_kind(&item)
            )));
        }
        records.push(serde_json::from_value(item)?);
    }
    Ok(records)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        assert_eq!(CellValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(CellValue::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(CellValue::Bool(true).as_number(), Some(1.0));
        assert_eq!(CellValue::from("forty").as_number(), None);
        assert_eq!(CellValue::Null.as_number(), None);
    }

    #[test]
    fn test_date_parsing() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(CellValue::from("2024-03-15").as_date(), Some(expected));
        assert_eq!(CellValue::from("2024/03/15").as_date(), Some(expected));
        assert_eq!(CellValue::from("03/15/2024").as_date(), Some(expected));
        assert_eq!(
            CellValue::from("2024-03-15T10:30:00Z").as_date(),
            expected.date().and_hms_opt(10, 30, 0)
        );
        assert_eq!(CellValue::from("not a date").as_date(), None);
        assert_eq!(CellValue::from("2024-13-45").as_date(), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(CellValue::from("Yes").as_bool(), Some(true));
        assert_eq!(CellValue::from("0").as_bool(), Some(false));
        assert_eq!(CellValue::from("maybe").as_bool(), None);
        assert_eq!(CellValue::Number(2.0).as_bool(), Some(true));
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Number(30.0).display(), "30");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
        assert_eq!(CellValue::Null.display(), "");
        assert_eq!(CellValue::Bool(false).display(), "false");
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(CellValue::Date(date).display(), "2024-01-02");
        let datetime = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(8, 5, 0).unwrap();
        assert_eq!(CellValue::Date(datetime).display(), "2024-01-02 08:05:00");
    }

    #[test]
    fn test_group_key_normalizes_numbers() {
        assert_eq!(CellValue::Number(1.0).group_key(), CellValue::from(1).group_key());
        assert_ne!(CellValue::Number(1.0).group_key(), CellValue::from("1").group_key());
        assert_ne!(CellValue::Null.group_key(), CellValue::from("").group_key());
    }

    #[test]
    fn test_records_from_json() {
        let rows = records_from_json(r#"[{"a": 1, "b": "x"}, {"a": null}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], CellValue::Number(1.0));
        assert_eq!(rows[0]["b"], CellValue::from("x"));
        assert!(rows[1]["a"].is_null());
    }

    #[test]
    fn test_records_from_json_rejects_non_objects() {
        let err = records_from_json(r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidData(_)));

        let err = records_from_json(r#"[{"a": 1}, 5]"#).unwrap_err();
        assert!(err.to_string().contains("row 1"));

        assert!(matches!(records_from_json("[").unwrap_err(), GridError::Json(_)));
    }
}
