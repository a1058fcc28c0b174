/// LiveGrid Grouping & Aggregation Engine
///
/// Rows are partitioned by one or more group-by columns into a tree of
/// `GroupNode`s. Buckets appear in the order their key is first seen in the
/// input sequence, so grouping a sorted sequence yields sorted members.
/// Each node carries aggregations over its whole subtree.
///
/// Node ids are path keys (`"region=s:EU/year=n:2024"`), which stay the same
/// across rebuilds as long as the key path exists. Expansion state is kept
/// outside the tree, keyed by these ids.

use crate::column::{ColumnDefinition, ColumnRegistry, ColumnType};
use crate::snapshot::DisplayRow;
use crate::value::{CellValue, Record};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Aggregation functions available for group and grand-total rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateFn {
    /// Parse a function name, accepting the common aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sum" => Some(AggregateFn::Sum),
            "avg" | "average" | "mean" => Some(AggregateFn::Avg),
            "count" => Some(AggregateFn::Count),
            "min" | "minimum" => Some(AggregateFn::Min),
            "max" | "maximum" => Some(AggregateFn::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Count => "count",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

/// Requested aggregations: column id → functions.
pub type AggregationMap = BTreeMap<String, Vec<AggregateFn>>;

/// Computed aggregations: column id → function → value.
pub type AggregateValues = BTreeMap<String, BTreeMap<AggregateFn, CellValue>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum GroupChildren {
    /// Nested groups for the next group-by column
    Groups(Vec<GroupNode>),
    /// Source row indices of a leaf group, in sequence order
    Rows(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: String,
    pub column_id: String,
    pub key: CellValue,
    pub depth: usize,
    pub children: GroupChildren,
    pub aggregations: AggregateValues,
    pub expanded: bool,
    /// Leaf rows in this subtree
    pub row_count: usize,
}

impl GroupNode {
    /// Source indices of every leaf row under this node.
    pub fn leaf_rows(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.row_count);
        self.collect_leaf_rows(&mut out);
        out
    }

    fn collect_leaf_rows(&self, out: &mut Vec<usize>) {
        match &self.children {
            GroupChildren::Rows(rows) => out.extend_from_slice(rows),
            GroupChildren::Groups(groups) => groups.iter().for_each(|g| g.collect_leaf_rows(out)),
        }
    }

    pub fn aggregate(&self, column_id: &str, func: AggregateFn) -> Option<&CellValue> {
        self.aggregations.get(column_id)?.get(&func)
    }
}

/// Expanded/collapsed state of group nodes: a default plus per-id overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    pub default_expanded: bool,
    overrides: HashMap<String, bool>,
}

impl ExpansionState {
    pub fn new(default_expanded: bool) -> Self {
        ExpansionState {
            default_expanded,
            overrides: HashMap::new(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.overrides.get(id).copied().unwrap_or(self.default_expanded)
    }

    /// Returns true if the effective state of `id` changed.
    pub fn set(&mut self, id: &str, expanded: bool) -> bool {
        if self.is_expanded(id) == expanded {
            return false;
        }
        if expanded == self.default_expanded {
            self.overrides.remove(id);
        } else {
            self.overrides.insert(id.to_string(), expanded);
        }
        true
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        let expanded = !self.is_expanded(id);
        self.set(id, expanded);
        expanded
    }

    /// Reset every node to `expanded`.
    pub fn reset(&mut self, expanded: bool) -> bool {
        let changed = self.default_expanded != expanded || !self.overrides.is_empty();
        self.default_expanded = expanded;
        self.overrides.clear();
        changed
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    numeric: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.numeric += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn average(&self) -> Option<f64> {
        if self.numeric == 0 {
            None
        } else {
            Some(self.sum / self.numeric as f64)
        }
    }
}

fn date_from_millis(ms: Option<f64>) -> CellValue {
    ms.and_then(|ms| DateTime::from_timestamp_millis(ms.round() as i64))
        .map(|dt| CellValue::Date(dt.naive_utc()))
        .unwrap_or(CellValue::Null)
}

fn number_or_null(n: Option<f64>) -> CellValue {
    n.map(CellValue::Number).unwrap_or(CellValue::Null)
}

fn aggregate_column(
    rows: &[Record],
    column: &ColumnDefinition,
    indices: &[usize],
    funcs: &[AggregateFn],
) -> BTreeMap<AggregateFn, CellValue> {
    let mut acc = Accumulator::default();
    for record in indices.iter().filter_map(|&i| rows.get(i)) {
        let value = column.value(record);
        if value.is_null() {
            continue;
        }
        acc.count += 1;
        match column.column_type {
            ColumnType::Number => {
                if let Some(n) = value.as_number() {
                    acc.push(n);
                }
            }
            ColumnType::Date => {
                if let Some(dt) = value.as_date() {
                    acc.push(dt.and_utc().timestamp_millis() as f64);
                }
            }
            _ => {}
        }
    }

    funcs
        .iter()
        .map(|&func| {
            let value = match (column.column_type, func) {
                (_, AggregateFn::Count) => CellValue::Number(acc.count as f64),
                (ColumnType::Number, AggregateFn::Sum) => CellValue::Number(acc.sum),
                (ColumnType::Number, AggregateFn::Avg) => number_or_null(acc.average()),
                (ColumnType::Number, AggregateFn::Min) => number_or_null(acc.min),
                (ColumnType::Number, AggregateFn::Max) => number_or_null(acc.max),
                (ColumnType::Date, AggregateFn::Avg) => date_from_millis(acc.average()),
                (ColumnType::Date, AggregateFn::Min) => date_from_millis(acc.min),
                (ColumnType::Date, AggregateFn::Max) => date_from_millis(acc.max),
                _ => CellValue::Null,
            };
            (func, value)
        })
        .collect()
}

/// Aggregate the rows at `indices`. Columns missing from the registry are skipped.
pub fn compute_aggregates(
    rows: &[Record],
    columns: &ColumnRegistry,
    indices: &[usize],
    aggregations: &AggregationMap,
) -> AggregateValues {
    aggregations
        .iter()
        .filter(|(_, funcs)| !funcs.is_empty())
        .filter_map(|(column_id, funcs)| {
            let column = columns.get(column_id)?;
            Some((column_id.clone(), aggregate_column(rows, column, indices, funcs)))
        })
        .collect()
}

struct GroupBuilder<'a> {
    rows: &'a [Record],
    columns: &'a ColumnRegistry,
    levels: Vec<&'a ColumnDefinition>,
    aggregations: &'a AggregationMap,
    expansion: &'a ExpansionState,
}

impl GroupBuilder<'_> {
    fn build_level(&self, depth: usize, parent_id: &str, indices: &[usize]) -> Vec<GroupNode> {
        let column = self.levels[depth];
        let mut buckets: Vec<(String, CellValue, Vec<usize>)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for &i in indices {
            let Some(record) = self.rows.get(i) else {
                continue;
            };
            let value = column.value(record);
            let key = value.group_key();
            match slots.get(&key) {
                Some(&slot) => buckets[slot].2.push(i),
                None => {
                    slots.insert(key.clone(), buckets.len());
                    buckets.push((key, value.clone(), vec![i]));
                }
            }
        }

        buckets
            .into_iter()
            .map(|(key, value, members)| {
                let segment = format!("{}={}", escape_id_part(&column.id), escape_id_part(&key));
                let id = if parent_id.is_empty() {
                    segment
                } else {
                    format!("{}/{}", parent_id, segment)
                };
                let aggregations = compute_aggregates(self.rows, self.columns, &members, self.aggregations);
                let row_count = members.len();
                let children = if depth + 1 < self.levels.len() {
                    GroupChildren::Groups(self.build_level(depth + 1, &id, &members))
                } else {
                    GroupChildren::Rows(members)
                };
                GroupNode {
                    expanded: self.expansion.is_expanded(&id),
                    id,
                    column_id: column.id.clone(),
                    key: value,
                    depth,
                    children,
                    aggregations,
                    row_count,
                }
            })
            .collect()
    }
}

/// Percent-escape the characters that delimit node ids, so a key can never
/// spell out a path of its own.
fn escape_id_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            _ => out.push(ch),
        }
    }
    out
}

/// Build the group tree over the rows at `indices`.
///
/// Unknown group-by columns are ignored; with no usable column the tree is empty.
pub fn build_groups(
    rows: &[Record],
    columns: &ColumnRegistry,
    indices: &[usize],
    group_by: &[String],
    aggregations: &AggregationMap,
    expansion: &ExpansionState,
) -> Vec<GroupNode> {
    let levels: Vec<&ColumnDefinition> = group_by.iter().filter_map(|id| columns.get(id)).collect();
    if levels.is_empty() {
        return Vec::new();
    }
    let builder = GroupBuilder {
        rows,
        columns,
        levels,
        aggregations,
        expansion,
    };
    builder.build_level(0, "", indices)
}

/// Re-apply expansion flags to an existing tree.
pub fn apply_expansion(tree: &mut [GroupNode], expansion: &ExpansionState) {
    for node in tree {
        node.expanded = expansion.is_expanded(&node.id);
        if let GroupChildren::Groups(children) = &mut node.children {
            apply_expansion(children, expansion);
        }
    }
}

/// Look up a node by id, descending only along the matching path.
pub fn find_node<'a>(tree: &'a [GroupNode], id: &str) -> Option<&'a GroupNode> {
    for node in tree {
        if node.id == id {
            return Some(node);
        }
        let is_ancestor = id.len() > node.id.len()
            && id.starts_with(node.id.as_str())
            && id.as_bytes()[node.id.len()] == b'/';
        if is_ancestor {
            if let GroupChildren::Groups(children) = &node.children {
                if let Some(found) = find_node(children, id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Display sequence for the tree: each header, then its children when expanded.
pub fn flatten(tree: &[GroupNode]) -> Vec<DisplayRow> {
    let mut out = Vec::new();
    flatten_into(tree, &mut out);
    out
}

fn flatten_into(nodes: &[GroupNode], out: &mut Vec<DisplayRow>) {
    for node in nodes {
        out.push(DisplayRow::Group {
            id: node.id.clone(),
            depth: node.depth,
            expanded: node.expanded,
            row_count: node.row_count,
        });
        if !node.expanded {
            continue;
        }
        match &node.children {
            GroupChildren::Groups(children) => flatten_into(children, out),
            GroupChildren::Rows(rows) => out.extend(rows.iter().map(|&source| DisplayRow::Data {
                source,
                depth: node.depth + 1,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn node_ids(tree: &[GroupNode]) -> Vec<String> {
        let mut ids = Vec::new();
        for node in tree {
            ids.push(node.id.clone());
            if let GroupChildren::Groups(children) = &node.children {
                ids.extend(node_ids(children));
            }
        }
        ids
    }

    fn record(fields: &[(&str, CellValue)]) -> Record {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn columns() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnDefinition::new("region", ColumnType::String),
            ColumnDefinition::new("team", ColumnType::String),
            ColumnDefinition::new("amount", ColumnType::Number),
            ColumnDefinition::new("joined", ColumnType::Date),
        ])
    }

    fn sample_rows() -> Vec<Record> {
        vec![
            record(&[("region", "EU".into()), ("team", "a".into()), ("amount", 10.0.into())]),
            record(&[("region", "US".into()), ("team", "a".into()), ("amount", 5.0.into())]),
            record(&[("region", "EU".into()), ("team", "b".into()), ("amount", CellValue::Null)]),
            record(&[("region", "EU".into()), ("team", "a".into()), ("amount", "7".into())]),
            record(&[("region", "US".into()), ("team", "b".into()), ("amount", 1.0.into())]),
        ]
    }

    fn all(rows: &[Record]) -> Vec<usize> {
        (0..rows.len()).collect()
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let rows = sample_rows();
        let tree = build_groups(
            &rows,
            &columns(),
            &all(&rows),
            &["region".to_string()],
            &AggregationMap::new(),
            &ExpansionState::default(),
        );
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].key, CellValue::from("EU"));
        assert_eq!(tree[0].id, "region=s:EU");
        assert_eq!(tree[0].children, GroupChildren::Rows(vec![0, 2, 3]));
        assert_eq!(tree[1].row_count, 2);
        assert!(!tree[0].expanded);
    }

    #[test]
    fn test_nested_groups() {
        let rows = sample_rows();
        let tree = build_groups(
            &rows,
            &columns(),
            &all(&rows),
            &["region".to_string(), "team".to_string()],
            &AggregationMap::new(),
            &ExpansionState::new(true),
        );
        let GroupChildren::Groups(eu) = &tree[0].children else {
            panic!("expected nested groups");
        };
        assert_eq!(eu.len(), 2);
        assert_eq!(eu[0].id, "region=s:EU/team=s:a");
        assert_eq!(eu[0].depth, 1);
        assert_eq!(eu[0].leaf_rows(), vec![0, 3]);
        assert_eq!(tree[0].leaf_rows(), vec![0, 3, 2]);
        assert_eq!(find_node(&tree, "region=s:US/team=s:b").map(|n| n.row_count), Some(1));
        assert!(find_node(&tree, "region=s:US/team=s:c").is_none());
        assert_eq!(node_ids(&tree).len(), 6);
    }

    #[test]
    fn test_keys_cannot_forge_nested_ids() {
        let rows = vec![
            record(&[("region", "EU".into()), ("team", "a".into())]),
            record(&[("region", "EU/team=s:a".into()), ("team", "b".into())]),
            record(&[("region", "50%".into()), ("team", "c".into())]),
        ];
        let mut expansion = ExpansionState::new(true);
        expansion.set("region=s:EU/team=s:a", false);
        let tree = build_groups(
            &rows,
            &columns(),
            &all(&rows),
            &["region".to_string(), "team".to_string()],
            &AggregationMap::new(),
            &expansion,
        );

        let ids = node_ids(&tree);
        let unique: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), 6);
        assert_eq!(unique.len(), 6);
        assert_eq!(tree[1].id, "region=s:EU%2Fteam%3Ds:a");
        assert_eq!(tree[2].id, "region=s:50%25");

        let nested = find_node(&tree, "region=s:EU/team=s:a");
        assert_eq!(nested.map(|n| (n.depth, n.key.clone())), Some((1, CellValue::from("a"))));
        let top = find_node(&tree, "region=s:EU%2Fteam%3Ds:a");
        assert_eq!(top.map(|n| n.depth), Some(0));

        // The override only collapses the nested node
        let collapsed: Vec<&String> = ids
            .iter()
            .filter(|id| find_node(&tree, id).is_some_and(|n| !n.expanded))
            .collect();
        assert_eq!(collapsed, vec!["region=s:EU/team=s:a"]);
    }

    #[test]
    fn test_unknown_group_column_is_ignored() {
        let rows = sample_rows();
        let tree = build_groups(
            &rows,
            &columns(),
            &all(&rows),
            &["nope".to_string()],
            &AggregationMap::new(),
            &ExpansionState::default(),
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_numeric_keys_and_nulls_group_canonically() {
        let cols = ColumnRegistry::new(vec![ColumnDefinition::new("n", ColumnType::Number)]);
        let rows = vec![
            record(&[("n", 1.into())]),
            record(&[("n", 1.0.into())]),
            record(&[("n", CellValue::Null)]),
            record(&[]),
        ];
        let tree = build_groups(&rows, &cols, &all(&rows), &["n".to_string()], &AggregationMap::new(), &ExpansionState::default());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].row_count, 2);
        assert_eq!(tree[1].key, CellValue::Null);
        assert_eq!(tree[1].row_count, 2);
    }

    #[test]
    fn test_number_aggregations() {
        let rows = sample_rows();
        let mut aggs = AggregationMap::new();
        aggs.insert(
            "amount".to_string(),
            vec![AggregateFn::Sum, AggregateFn::Avg, AggregateFn::Count, AggregateFn::Min, AggregateFn::Max],
        );
        let tree = build_groups(&rows, &columns(), &all(&rows), &["region".to_string()], &aggs, &ExpansionState::default());
        let eu = &tree[0];
        assert_eq!(eu.aggregate("amount", AggregateFn::Sum), Some(&CellValue::Number(17.0)));
        assert_eq!(eu.aggregate("amount", AggregateFn::Avg), Some(&CellValue::Number(8.5)));
        // Null is not counted
        assert_eq!(eu.aggregate("amount", AggregateFn::Count), Some(&CellValue::Number(2.0)));
        assert_eq!(eu.aggregate("amount", AggregateFn::Min), Some(&CellValue::Number(7.0)));
        assert_eq!(eu.aggregate("amount", AggregateFn::Max), Some(&CellValue::Number(10.0)));
    }

    #[test]
    fn test_empty_numeric_aggregates() {
        let rows = vec![record(&[("amount", CellValue::Null)])];
        let mut aggs = AggregationMap::new();
        aggs.insert("amount".to_string(), vec![AggregateFn::Sum, AggregateFn::Avg, AggregateFn::Min]);
        let values = compute_aggregates(&rows, &columns(), &[0], &aggs);
        let amount = &values["amount"];
        assert_eq!(amount[&AggregateFn::Sum], CellValue::Number(0.0));
        assert_eq!(amount[&AggregateFn::Avg], CellValue::Null);
        assert_eq!(amount[&AggregateFn::Min], CellValue::Null);
    }

    #[test]
    fn test_date_and_string_aggregations() {
        let day = |d: u32| CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, d).and_then(|d| d.and_hms_opt(0, 0, 0)).unwrap());
        let rows = vec![
            record(&[("joined", day(1)), ("region", "EU".into())]),
            record(&[("joined", "2024-01-03".into()), ("region", "EU".into())]),
            record(&[("joined", "not a date".into())]),
        ];
        let mut aggs = AggregationMap::new();
        aggs.insert("joined".to_string(), vec![AggregateFn::Min, AggregateFn::Max, AggregateFn::Avg, AggregateFn::Sum, AggregateFn::Count]);
        aggs.insert("region".to_string(), vec![AggregateFn::Count, AggregateFn::Sum]);
        let values = compute_aggregates(&rows, &columns(), &[0, 1, 2], &aggs);
        let joined = &values["joined"];
        assert_eq!(joined[&AggregateFn::Min], day(1));
        assert_eq!(joined[&AggregateFn::Max], day(3));
        assert_eq!(joined[&AggregateFn::Avg], day(2));
        assert_eq!(joined[&AggregateFn::Sum], CellValue::Null);
        assert_eq!(joined[&AggregateFn::Count], CellValue::Number(3.0));
        assert_eq!(values["region"][&AggregateFn::Count], CellValue::Number(2.0));
        assert_eq!(values["region"][&AggregateFn::Sum], CellValue::Null);
    }

    #[test]
    fn test_flatten_respects_expansion() {
        let rows = sample_rows();
        let mut expansion = ExpansionState::default();
        let mut tree = build_groups(&rows, &columns(), &all(&rows), &["region".to_string()], &AggregationMap::new(), &expansion);
        assert_eq!(flatten(&tree).len(), 2);

        expansion.toggle("region=s:US");
        apply_expansion(&mut tree, &expansion);
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[2], DisplayRow::Data { source: 1, depth: 1 });

        assert!(expansion.reset(true));
        apply_expansion(&mut tree, &expansion);
        assert_eq!(flatten(&tree).len(), 7);
    }

    #[test]
    fn test_expansion_state_overrides() {
        let mut e = ExpansionState::new(false);
        assert!(e.toggle("a"));
        assert_eq!(e.override_count(), 1);
        assert!(!e.set("a", true));
        assert!(e.set("a", false));
        assert_eq!(e.override_count(), 0);
        e.set("b", true);
        assert!(e.reset(false));
        assert!(!e.is_expanded("b"));
        assert!(!e.reset(false));
    }

    #[test]
    fn test_parse_aggregate_names() {
        assert_eq!(AggregateFn::parse("Mean"), Some(AggregateFn::Avg));
        assert_eq!(AggregateFn::parse("maximum"), Some(AggregateFn::Max));
        assert_eq!(AggregateFn::parse("median"), None);
        assert_eq!(AggregateFn::Count.name(), "count");
    }
}
