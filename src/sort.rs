/// LiveGrid Sort Engine
///
/// Multi-key, stable, type-aware sorting. Like the sorted views this crate grew
/// out of, sorting never moves records: it produces an index mapping
/// (`sorted[position] = source row index`).
///
/// Sort values are extracted and coerced once per key before sorting, so the
/// comparator only touches pre-decorated cells.

use crate::column::{ColumnRegistry, ColumnType};
use crate::value::{CellValue, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

/// A single sort key. `order` is the tie-break precedence (0 = primary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column_id: String,
    pub direction: SortDirection,
    pub order: usize,
}

/// Ordered list of sort keys.
///
/// # Examples
///
/// ```
/// use livegrid::{SortSpec, SortDirection};
///
/// let mut spec = SortSpec::default();
/// spec.cycle("age", false);              // age asc
/// spec.cycle("name", true);              // age asc, name asc
/// spec.cycle("age", true);               // age desc, name asc
/// assert_eq!(spec.direction_of("age"), Some(SortDirection::Desc));
/// assert_eq!(spec.keys()[1].column_id, "name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SortKey>", into = "Vec<SortKey>")]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl From<Vec<SortKey>> for SortSpec {
    fn from(mut keys: Vec<SortKey>) -> Self {
        keys.sort_by_key(|k| k.order);
        let mut spec = SortSpec { keys };
        spec.renumber();
        spec
    }
}

impl From<SortSpec> for Vec<SortKey> {
    fn from(spec: SortSpec) -> Self {
        spec.keys
    }
}

impl SortSpec {
    /// Keys in precedence order.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn direction_of(&self, column_id: &str) -> Option<SortDirection> {
        self.keys
            .iter()
            .find(|k| k.column_id == column_id)
            .map(|k| k.direction)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.keys.is_empty();
        self.keys.clear();
        changed
    }

    fn renumber(&mut self) {
        for (i, key) in self.keys.iter_mut().enumerate() {
            key.order = i;
        }
    }

    /// Set the direction for a column. `None` removes the column's key.
    /// Without `multi` the spec is replaced by this single key; with `multi`
    /// an existing key is updated in place or a new lowest-precedence key is
    /// appended. Returns true if the spec changed.
    pub fn set(&mut self, column_id: &str, direction: Option<SortDirection>, multi: bool) -> bool {
        let existing = self.keys.iter().position(|k| k.column_id == column_id);

        match direction {
            None => match existing {
                Some(pos) => {
                    self.keys.remove(pos);
                    self.renumber();
                    true
                }
                None => false,
            },
            Some(direction) if !multi => {
                let key = SortKey {
                    column_id: column_id.to_string(),
                    direction,
                    order: 0,
                };
                if self.keys.len() == 1 && self.keys[0] == key {
                    return false;
                }
                self.keys = vec![key];
                true
            }
            Some(direction) => match existing {
                Some(pos) if self.keys[pos].direction == direction => false,
                Some(pos) => {
                    self.keys[pos].direction = direction;
                    true
                }
                None => {
                    self.keys.push(SortKey {
                        column_id: column_id.to_string(),
                        direction,
                        order: self.keys.len(),
                    });
                    true
                }
            },
        }
    }

    /// Header-click behavior: cycles the column `asc → desc → none`.
    /// Without `multi`, reaching `none` clears the whole spec.
    pub fn cycle(&mut self, column_id: &str, multi: bool) -> bool {
        let next = match self.direction_of(column_id) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        match next {
            None if !multi => self.clear(),
            next => self.set(column_id, next, multi),
        }
    }
}

/// A cell value decorated for comparison under its column type.
#[derive(Debug, Clone)]
enum SortCell {
    Number(f64),
    Bool(bool),
    Text { folded: String, raw: String },
    /// Null, or a value that does not coerce to the column type.
    Missing,
}

impl SortCell {
    fn extract(value: &CellValue, column_type: ColumnType) -> Self {
        if value.is_null() {
            return SortCell::Missing;
        }
        let cell = match column_type {
            ColumnType::Number => value.as_number().map(SortCell::Number),
            ColumnType::Date => value
                .as_date()
                .map(|dt| SortCell::Number(dt.and_utc().timestamp_millis() as f64)),
            ColumnType::Boolean => value.as_bool().map(SortCell::Bool),
            ColumnType::String => {
                let raw = value.display();
                Some(SortCell::Text {
                    folded: raw.to_lowercase(),
                    raw,
                })
            }
        };
        cell.unwrap_or(SortCell::Missing)
    }

    /// Ascending comparison; missing values sort after present ones.
    fn compare(&self, other: &SortCell) -> Ordering {
        match (self, other) {
            (SortCell::Missing, SortCell::Missing) => Ordering::Equal,
            (SortCell::Missing, _) => Ordering::Greater,
            (_, SortCell::Missing) => Ordering::Less,
            (SortCell::Number(a), SortCell::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortCell::Bool(a), SortCell::Bool(b)) => a.cmp(b),
            (
                SortCell::Text { folded: fa, raw: ra },
                SortCell::Text { folded: fb, raw: rb },
            ) => locale_compare(fa, ra, fb, rb),
            // Decoration is per column, so kinds never mix within a key
            _ => Ordering::Equal,
        }
    }
}

/// Case-insensitive ordering with lowercase before uppercase on ties.
fn locale_compare(folded_a: &str, raw_a: &str, folded_b: &str, raw_b: &str) -> Ordering {
    folded_a.cmp(folded_b).then_with(|| raw_b.cmp(raw_a))
}


/// Sort a set of source row indices by `spec`. Keys on unknown columns are
/// skipped. The result is stable with respect to the order of `indices`.
pub fn sort_indices(
    rows: &[Record],
    columns: &ColumnRegistry,
    indices: &[usize],
    spec: &SortSpec,
) -> Vec<usize> {
    let keys: Vec<(SortDirection, Vec<SortCell>)> = spec
        .keys()
        .iter()
        .filter_map(|key| {
            let column = columns.get(&key.column_id)?;
            let cells = indices
                .iter()
                .map(|&i| match rows.get(i) {
                    Some(record) => SortCell::extract(column.value(record), column.column_type),
                    None => SortCell::Missing,
                })
                .collect();
            Some((key.direction, cells))
        })
        .collect();

    if keys.is_empty() {
        return indices.to_vec();
    }

    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&a, &b| {
        for (direction, cells) in &keys {
            let cmp = cells[a].compare(&cells[b]);
            let cmp = match direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });

    order.into_iter().map(|pos| indices[pos]).collect()
}

/// Sort whole records, returning a new vector.
pub fn apply_sort(rows: &[Record], columns: &ColumnRegistry, spec: &SortSpec) -> Vec<Record> {
    let indices: Vec<usize> = (0..rows.len()).collect();
    sort_indices(rows, columns, &indices, spec)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDefinition;

    fn compare_values(a: &CellValue, b: &CellValue, column_type: ColumnType) -> Ordering {
        SortCell::extract(a, column_type).compare(&SortCell::extract(b, column_type))
    }

    fn row(name: &str, age: f64, team: &str) -> Record {
        let mut r = Record::new();
        r.insert("name".to_string(), CellValue::from(name));
        r.insert("age".to_string(), CellValue::Number(age));
        r.insert("team".to_string(), CellValue::from(team));
        r
    }

    fn columns() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnDefinition::new("name", ColumnType::String),
            ColumnDefinition::new("age", ColumnType::Number),
            ColumnDefinition::new("team", ColumnType::String),
            ColumnDefinition::new("joined", ColumnType::Date),
            ColumnDefinition::new("active", ColumnType::Boolean),
        ])
    }

    fn spec(keys: &[(&str, SortDirection)]) -> SortSpec {
        let mut spec = SortSpec::default();
        for (col, dir) in keys {
            spec.set(col, Some(*dir), true);
        }
        spec
    }

    fn names(rows: &[Record]) -> Vec<String> {
        rows.iter().map(|r| r["name"].display()).collect()
    }

    #[test]
    fn test_sort_numeric_ascending() {
        let rows = vec![row("a", 30.0, "x"), row("b", 5.0, "x"), row("c", 100.0, "x")];
        let sorted = apply_sort(&rows, &columns(), &spec(&[("age", SortDirection::Asc)]));
        assert_eq!(names(&sorted), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = vec![
            row("first", 1.0, "x"),
            row("second", 0.0, "x"),
            row("third", 1.0, "x"),
            row("fourth", 0.0, "x"),
        ];
        let asc = apply_sort(&rows, &columns(), &spec(&[("age", SortDirection::Asc)]));
        assert_eq!(names(&asc), vec!["second", "fourth", "first", "third"]);

        let desc = apply_sort(&rows, &columns(), &spec(&[("age", SortDirection::Desc)]));
        assert_eq!(names(&desc), vec!["first", "third", "second", "fourth"]);
    }

    #[test]
    fn test_sort_desc_reverses_distinct_keys() {
        let rows: Vec<Record> = (0..50)
            .map(|i| row(&format!("r{}", i), ((i * 37) % 101) as f64, "x"))
            .collect();
        let cols = columns();
        let asc = apply_sort(&rows, &cols, &spec(&[("age", SortDirection::Asc)]));
        let desc = apply_sort(&asc, &cols, &spec(&[("age", SortDirection::Desc)]));
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[test]
    fn test_multi_key_precedence() {
        let rows = vec![
            row("a", 30.0, "blue"),
            row("b", 20.0, "red"),
            row("c", 10.0, "blue"),
            row("d", 40.0, "red"),
        ];
        let sorted = apply_sort(
            &rows,
            &columns(),
            &spec(&[("team", SortDirection::Asc), ("age", SortDirection::Desc)]),
        );
        assert_eq!(names(&sorted), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_locale_string_compare() {
        let rows = vec![
            row("banana", 0.0, ""),
            row("Apple", 0.0, ""),
            row("apple", 0.0, ""),
            row("Cherry", 0.0, ""),
        ];
        let sorted = apply_sort(&rows, &columns(), &spec(&[("name", SortDirection::Asc)]));
        assert_eq!(names(&sorted), vec!["apple", "Apple", "banana", "Cherry"]);
    }

    #[test]
    fn test_invalid_dates_sort_last() {
        let mut rows = Vec::new();
        for (name, joined) in [("late", "2024-05-01"), ("bad", "soon"), ("early", "2023-01-15"), ("none", "")] {
            let mut r = row(name, 0.0, "");
            if !joined.is_empty() {
                r.insert("joined".to_string(), CellValue::from(joined));
            }
            rows.push(r);
        }
        let sorted = apply_sort(&rows, &columns(), &spec(&[("joined", SortDirection::Asc)]));
        assert_eq!(names(&sorted), vec!["early", "late", "bad", "none"]);
    }

    #[test]
    fn test_boolean_false_before_true() {
        assert_eq!(
            compare_values(&CellValue::Bool(false), &CellValue::Bool(true), ColumnType::Boolean),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&CellValue::from("yes"), &CellValue::Bool(false), ColumnType::Boolean),
            Ordering::Greater
        );
    }

    #[test]
    fn test_numeric_text_compares_numerically() {
        assert_eq!(
            compare_values(&CellValue::from("9"), &CellValue::from("10"), ColumnType::Number),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&CellValue::from("9"), &CellValue::from("10"), ColumnType::String),
            Ordering::Greater
        );
    }

    #[test]
    fn test_unknown_sort_column_is_skipped() {
        let rows = vec![row("b", 2.0, ""), row("a", 1.0, "")];
        let sorted = apply_sort(&rows, &columns(), &spec(&[("nope", SortDirection::Asc)]));
        assert_eq!(names(&sorted), vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_single() {
        let mut spec = SortSpec::default();
        assert!(spec.cycle("age", false));
        assert_eq!(spec.direction_of("age"), Some(SortDirection::Asc));
        assert!(spec.cycle("age", false));
        assert_eq!(spec.direction_of("age"), Some(SortDirection::Desc));
        assert!(spec.cycle("age", false));
        assert!(spec.is_empty());
    }

    #[test]
    fn test_cycle_replaces_without_multi() {
        let mut spec = SortSpec::default();
        spec.cycle("age", false);
        spec.cycle("name", false);
        assert_eq!(spec.keys().len(), 1);
        assert_eq!(spec.keys()[0].column_id, "name");
    }

    #[test]
    fn test_multi_keys_keep_contiguous_order() {
        let mut spec = SortSpec::default();
        spec.set("a", Some(SortDirection::Asc), true);
        spec.set("b", Some(SortDirection::Asc), true);
        spec.set("c", Some(SortDirection::Desc), true);
        assert!(spec.set("b", None, true));
        let orders: Vec<(String, usize)> =
            spec.keys().iter().map(|k| (k.column_id.clone(), k.order)).collect();
        assert_eq!(orders, vec![("a".to_string(), 0), ("c".to_string(), 1)]);
        assert!(!spec.set("c", Some(SortDirection::Desc), true));
        assert!(!spec.set("zzz", None, false));
    }

    #[test]
    fn test_spec_deserialization_orders_keys() {
        let spec: SortSpec = serde_json::from_str(
            r#"[{"column_id": "b", "direction": "desc", "order": 5},
                {"column_id": "a", "direction": "asc", "order": 2}]"#,
        )
        .unwrap();
        assert_eq!(spec.keys()[0].column_id, "a");
        assert_eq!(spec.keys()[0].order, 0);
        assert_eq!(spec.keys()[1].order, 1);
    }
}
