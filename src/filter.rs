/// LiveGrid Filter Engine
///
/// Per-column filters are plain strings. Each one is compiled once into a
/// typed predicate for its column, then rows are tested against every
/// predicate (logical AND). Nothing here fails: input that does not parse for
/// the column type falls back to case-insensitive substring matching.
///
/// | Column type | Filter semantics |
/// |---|---|
/// | string  | substring, case-insensitive |
/// | number  | exact match if the filter is a number, else `>`, `>=`, `<`, `<=` prefix, else substring |
/// | boolean | filter in `{"true", "yes", "1"}` selects true cells, anything else false cells |
/// | date    | same calendar day if both parse as dates, else substring |

use crate::column::{ColumnRegistry, ColumnType};
use crate::value::{parse_date, CellValue, Record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of column id → filter text. A missing entry means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    entries: BTreeMap<String, String>,
}

impl FilterSpec {
    pub fn get(&self, column_id: &str) -> Option<&str> {
        self.entries.get(column_id).map(String::as_str)
    }

    /// Set a column filter. Blank text removes the filter.
    /// Returns true if the spec changed.
    pub fn set(&mut self, column_id: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            return self.remove(column_id);
        }
        if self.get(column_id) == Some(value) {
            return false;
        }
        self.entries.insert(column_id.to_string(), value.to_string());
        true
    }

    pub fn remove(&mut self, column_id: &str) -> bool {
        self.entries.remove(column_id).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    fn test(self, value: f64, operand: f64) -> bool {
        match self {
            Comparison::Gt => value > operand,
            Comparison::Ge => value >= operand,
            Comparison::Lt => value < operand,
            Comparison::Le => value <= operand,
        }
    }
}

/// Parse a comparison-prefixed numeric filter such as `">30"` or `"<= 5"`.
pub fn parse_comparison(text: &str) -> Option<(Comparison, f64)> {
    let text = text.trim();
    let (op, rest) = if let Some(rest) = text.strip_prefix(">=") {
        (Comparison::Ge, rest)
    } else if let Some(rest) = text.strip_prefix("<=") {
        (Comparison::Le, rest)
    } else if let Some(rest) = text.strip_prefix('>') {
        (Comparison::Gt, rest)
    } else if let Some(rest) = text.strip_prefix('<') {
        (Comparison::Lt, rest)
    } else {
        return None;
    };
    let operand = rest.trim().parse::<f64>().ok().filter(|n| !n.is_nan())?;
    Some((op, operand))
}

/// A filter compiled for one column type.
#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// Lowercased needle
    Substring(String),
    NumberEq(f64),
    NumberCmp(Comparison, f64),
    Bool(bool),
    Date { day: Option<NaiveDate>, needle: String },
}

impl Predicate {
    fn compile(column_type: ColumnType, filter: &str) -> Self {
        let needle = filter.to_lowercase();
        match column_type {
            ColumnType::String => Predicate::Substring(needle),
            ColumnType::Number => {
                if let Some(n) = filter.trim().parse::<f64>().ok().filter(|n| !n.is_nan()) {
                    Predicate::NumberEq(n)
                } else if let Some((op, operand)) = parse_comparison(filter) {
                    Predicate::NumberCmp(op, operand)
                } else {
                    Predicate::Substring(needle)
                }
            }
            ColumnType::Boolean => {
                Predicate::Bool(matches!(needle.trim(), "true" | "yes" | "1"))
            }
            ColumnType::Date => Predicate::Date {
                day: parse_date(filter).map(|dt| dt.date()),
                needle,
            },
        }
    }

    fn matches(&self, value: &CellValue) -> bool {
        match self {
            Predicate::Substring(needle) => contains_text(value, needle),
            Predicate::NumberEq(n) => value.as_number() == Some(*n),
            Predicate::NumberCmp(op, operand) => value
                .as_number()
                .map(|v| op.test(v, *operand))
                .unwrap_or(false),
            Predicate::Bool(wanted) => value.as_bool() == Some(*wanted),
            Predicate::Date { day, needle } => match (day, value.as_date()) {
                (Some(day), Some(dt)) => dt.date() == *day,
                _ => contains_text(value, needle),
            },
        }
    }
}

fn contains_text(value: &CellValue, needle: &str) -> bool {
    value.display().to_lowercase().contains(needle)
}


/// Column filters and the optional quick filter, compiled against a column set.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    predicates: Vec<(String, Predicate)>,
    /// Lowercased needle and the fields it searches
    quick: Option<(String, Vec<String>)>,
}

impl CompiledFilters {
    /// Compile `spec` for `columns`. Filters on unknown columns are dropped.
    pub fn compile(columns: &ColumnRegistry, spec: &FilterSpec, quick_filter: Option<&str>) -> Self {
        let predicates = spec
            .iter()
            .filter_map(|(column_id, filter)| {
                let column = columns.get(column_id)?;
                Some((column.field.clone(), Predicate::compile(column.column_type, filter)))
            })
            .collect();

        let quick = quick_filter
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| {
                let fields = columns
                    .visible()
                    .filter(|c| c.filterable)
                    .map(|c| c.field.clone())
                    .collect();
                (q.to_lowercase(), fields)
            });

        CompiledFilters { predicates, quick }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.quick.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        let null = CellValue::Null;
        let passes_columns = self
            .predicates
            .iter()
            .all(|(field, predicate)| predicate.matches(record.get(field).unwrap_or(&null)));
        if !passes_columns {
            return false;
        }
        match &self.quick {
            Some((needle, fields)) => fields
                .iter()
                .any(|field| record.get(field).map(|v| contains_text(v, needle)).unwrap_or(false)),
            None => true,
        }
    }
}

/// Indices of the rows that pass every filter, in source order.
pub fn filter_indices(
    rows: &[Record],
    columns: &ColumnRegistry,
    spec: &FilterSpec,
    quick_filter: Option<&str>,
) -> Vec<usize> {
    let compiled = CompiledFilters::compile(columns, spec, quick_filter);
    if compiled.is_empty() {
        return (0..rows.len()).collect();
    }
    rows.iter()
        .enumerate()
        .filter(|(_, record)| compiled.matches(record))
        .map(|(i, _)| i)
        .collect()
}

/// Filter whole records, returning a new vector.
pub fn apply_filter(rows: &[Record], columns: &ColumnRegistry, spec: &FilterSpec) -> Vec<Record> {
    filter_indices(rows, columns, spec, None)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDefinition;

    fn matches_value(value: &CellValue, column_type: ColumnType, filter: &str) -> bool {
        filter.trim().is_empty() || Predicate::compile(column_type, filter).matches(value)
    }

    fn columns() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnDefinition::new("name", ColumnType::String),
            ColumnDefinition::new("age", ColumnType::Number),
            ColumnDefinition::new("active", ColumnType::Boolean),
            ColumnDefinition::new("joined", ColumnType::Date),
            ColumnDefinition::new("notes", ColumnType::String).filterable(false),
        ])
    }

    fn person(name: &str, age: f64, active: bool, joined: &str) -> Record {
        let mut r = Record::new();
        r.insert("name".to_string(), CellValue::from(name));
        r.insert("age".to_string(), CellValue::Number(age));
        r.insert("active".to_string(), CellValue::Bool(active));
        r.insert("joined".to_string(), CellValue::from(joined));
        r.insert("notes".to_string(), CellValue::from("secret"));
        r
    }

    fn people() -> Vec<Record> {
        vec![
            person("Alice", 34.0, true, "2021-04-01"),
            person("Bob", 28.0, false, "2022-11-30"),
            person("Carol", 45.0, true, "2021-04-01T15:20:00"),
            person("Dave", 30.0, false, "someday"),
        ]
    }

    fn filtered(spec: &FilterSpec) -> Vec<String> {
        apply_filter(&people(), &columns(), spec)
            .iter()
            .map(|r| r["name"].display())
            .collect()
    }

    fn spec(entries: &[(&str, &str)]) -> FilterSpec {
        let mut spec = FilterSpec::default();
        for (col, value) in entries {
            spec.set(col, value);
        }
        spec
    }

    #[test]
    fn test_string_substring_case_insensitive() {
        assert_eq!(filtered(&spec(&[("name", "AL")])), vec!["Alice"]);
        assert_eq!(filtered(&spec(&[("name", "o")])), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_number_exact_and_comparisons() {
        assert_eq!(filtered(&spec(&[("age", "30")])), vec!["Dave"]);
        assert_eq!(filtered(&spec(&[("age", ">30")])), vec!["Alice", "Carol"]);
        assert_eq!(filtered(&spec(&[("age", ">=30")])), vec!["Alice", "Carol", "Dave"]);
        assert_eq!(filtered(&spec(&[("age", "< 30")])), vec!["Bob"]);
        assert_eq!(filtered(&spec(&[("age", "<=28")])), vec!["Bob"]);
    }

    #[test]
    fn test_number_malformed_falls_back_to_substring() {
        assert_eq!(filtered(&spec(&[("age", "4x")])), Vec::<String>::new());
        assert_eq!(filtered(&spec(&[("age", ">abc")])), Vec::<String>::new());
        // "3" parses as a number, so it is an exact match, not a substring
        assert_eq!(filtered(&spec(&[("age", "3")])), Vec::<String>::new());
    }

    #[test]
    fn test_boolean_filter() {
        assert_eq!(filtered(&spec(&[("active", "yes")])), vec!["Alice", "Carol"]);
        assert_eq!(filtered(&spec(&[("active", "TRUE")])), vec!["Alice", "Carol"]);
        assert_eq!(filtered(&spec(&[("active", "no")])), vec!["Bob", "Dave"]);
    }

    #[test]
    fn test_date_same_day_and_fallback() {
        assert_eq!(filtered(&spec(&[("joined", "2021-04-01")])), vec!["Alice", "Carol"]);
        assert_eq!(filtered(&spec(&[("joined", "04/01/2021")])), vec!["Alice", "Carol"]);
        // Not a date: substring fallback keeps rows with unparseable dates reachable
        assert_eq!(filtered(&spec(&[("joined", "some")])), vec!["Dave"]);
        assert_eq!(filtered(&spec(&[("joined", "2022")])), vec!["Bob"]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        assert_eq!(filtered(&spec(&[("active", "true"), ("age", ">40")])), vec!["Carol"]);
    }

    #[test]
    fn test_filter_idempotent() {
        let rows = people();
        let cols = columns();
        let s = spec(&[("age", ">=30"), ("name", "a")]);
        let once = apply_filter(&rows, &cols, &s);
        let twice = apply_filter(&once, &cols, &s);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_column_filter_ignored() {
        assert_eq!(filtered(&spec(&[("ghost", "x")])).len(), 4);
    }

    #[test]
    fn test_quick_filter_searches_filterable_visible_columns() {
        let rows = people();
        let cols = columns();
        let hits = filter_indices(&rows, &cols, &FilterSpec::default(), Some("car"));
        assert_eq!(hits, vec![2]);
        let hits = filter_indices(&rows, &cols, &FilterSpec::default(), Some("secret"));
        assert!(hits.is_empty());
        let hits = filter_indices(&rows, &cols, &spec(&[("active", "false")]), Some("2022"));
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_spec_set_and_remove() {
        let mut s = FilterSpec::default();
        assert!(s.set("age", ">3"));
        assert!(!s.set("age", ">3"));
        assert!(s.set("age", "   "));
        assert!(s.is_empty());
        assert!(!s.remove("age"));
    }

    #[test]
    fn test_parse_comparison() {
        assert_eq!(parse_comparison(">=5"), Some((Comparison::Ge, 5.0)));
        assert_eq!(parse_comparison(" < -2.5 "), Some((Comparison::Lt, -2.5)));
        assert_eq!(parse_comparison("=5"), None);
        assert_eq!(parse_comparison(">"), None);
    }

    #[test]
    fn test_matches_value_blank_filter_passes() {
        assert!(matches_value(&CellValue::Null, ColumnType::Number, " "));
        assert!(!matches_value(&CellValue::Null, ColumnType::Number, "1"));
    }
}
