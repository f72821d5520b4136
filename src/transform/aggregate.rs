//! Grouping, reductions, cumulative series, and descriptive statistics.
//!
//! Grouping is a pure partition of rows by equal key tuples. An absent
//! key value is a valid, distinct key: rows with a missing key field form
//! their own group, they are never dropped. Group iteration order is first
//! appearance unless the caller explicitly asks for
//! [`GroupOrder::ValueDesc`]; the two are never conflated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{AggregateError, AggregateResult};
use crate::table::{Field, FieldType, KeyValue, Record, Schema, Table, Value};

// =============================================================================
// Reductions
// =============================================================================

/// A function collapsing a group's field values to one summary value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Reduce {
    /// Row count. With `present_only`, rows where the field is absent are
    /// not counted.
    Count {
        #[serde(default)]
        present_only: bool,
    },
    /// Sum of present values; a group with none sums to zero.
    Sum,
    /// Mean of present values; a group with none yields absent, never zero.
    Mean,
    /// Distinct present values, first-appearance order, rendered as text.
    Unique,
}

impl Reduce {
    fn label(&self) -> &'static str {
        match self {
            Reduce::Count { .. } => "count",
            Reduce::Sum => "sum",
            Reduce::Mean => "mean",
            Reduce::Unique => "unique",
        }
    }
}

/// One requested reduction: which field, which op, and optionally what to
/// call the output column (defaults to the field name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reduction {
    pub field: String,
    #[serde(flatten)]
    pub op: Reduce,
    #[serde(default)]
    pub name: Option<String>,
}

impl Reduction {
    pub fn new(field: impl Into<String>, op: Reduce) -> Self {
        Self {
            field: field.into(),
            op,
            name: None,
        }
    }

    /// Name the output column.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Output column name: explicit name, else the source field name.
    pub fn output_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.field.clone())
    }
}

/// Group iteration order of the output table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum GroupOrder {
    /// Order of first appearance of each key.
    #[default]
    FirstAppearance,
    /// Descending by one reduction output column; ties keep first
    /// appearance, absent values sort last.
    ValueDesc { column: String },
}

// =============================================================================
// Aggregation
// =============================================================================

enum Acc {
    Count { rows: u64, present: u64 },
    Sum { int: i64, float: f64 },
    Mean { sum: f64, n: u64 },
    Unique { seen: HashSet<KeyValue>, values: Vec<Value> },
}

struct Group {
    key: Vec<Value>,
    accs: Vec<Acc>,
}

/// Group `table` by the key fields and reduce each group.
///
/// The output table has one row per group: the key columns first (original
/// types), then one column per reduction. Count columns are ints, sums
/// follow the source type, means are floats, uniques are text.
pub fn aggregate(
    table: &Table,
    group_by: &[String],
    reductions: &[Reduction],
    order: &GroupOrder,
) -> AggregateResult<Table> {
    let key_indices: Vec<usize> = group_by
        .iter()
        .map(|name| table.schema().index_of(name))
        .collect::<Result<_, _>>()?;

    let mut red_indices = Vec::with_capacity(reductions.len());
    for reduction in reductions {
        let idx = table.schema().index_of(&reduction.field)?;
        let ty = table.schema().fields()[idx].ty;
        if matches!(reduction.op, Reduce::Sum | Reduce::Mean)
            && !matches!(ty, FieldType::Int | FieldType::Float)
        {
            return Err(AggregateError::NonNumeric {
                field: reduction.field.clone(),
            });
        }
        red_indices.push((idx, ty));
    }

    // Partition rows; group order is first appearance of each key.
    let mut slots: HashMap<Vec<KeyValue>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for record in table.rows() {
        let key: Vec<KeyValue> = key_indices.iter().map(|&i| record.get(i).key()).collect();
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = groups.len();
                slots.insert(key, slot);
                groups.push(Group {
                    key: key_indices.iter().map(|&i| record.get(i).clone()).collect(),
                    accs: reductions.iter().map(|r| new_acc(&r.op)).collect(),
                });
                slot
            }
        };

        let group = &mut groups[slot];
        for (acc, (idx, _)) in group.accs.iter_mut().zip(&red_indices) {
            accumulate(acc, record.get(*idx));
        }
    }

    // Output schema: key fields, then reduction columns.
    let mut fields: Vec<Field> = key_indices
        .iter()
        .map(|&i| table.schema().fields()[i].clone())
        .collect();
    for (reduction, (_, ty)) in reductions.iter().zip(&red_indices) {
        fields.push(Field::new(reduction.output_name(), output_type(&reduction.op, *ty)));
    }
    let mut names = HashSet::new();
    for field in &fields {
        if !names.insert(field.name.clone()) {
            return Err(AggregateError::Table(
                crate::error::TableError::DuplicateField(field.name.clone()),
            ));
        }
    }

    let mut out = Table::new(Schema::new(fields));
    for group in &groups {
        let mut values = group.key.clone();
        for ((acc, reduction), (_, ty)) in
            group.accs.iter().zip(reductions).zip(&red_indices)
        {
            values.push(finish_acc(acc, &reduction.op, *ty));
        }
        out.push_record(Record::new(values))?;
    }

    if let GroupOrder::ValueDesc { column } = order {
        out = sort_desc(out, column)?;
    }
    Ok(out)
}

fn new_acc(op: &Reduce) -> Acc {
    match op {
        Reduce::Count { .. } => Acc::Count { rows: 0, present: 0 },
        Reduce::Sum => Acc::Sum { int: 0, float: 0.0 },
        Reduce::Mean => Acc::Mean { sum: 0.0, n: 0 },
        Reduce::Unique => Acc::Unique {
            seen: HashSet::new(),
            values: Vec::new(),
        },
    }
}

fn accumulate(acc: &mut Acc, value: &Value) {
    match acc {
        Acc::Count { rows, present } => {
            *rows += 1;
            if !value.is_null() {
                *present += 1;
            }
        }
        Acc::Sum { int, float } => {
            match value {
                Value::Int(i) => *int += i,
                Value::Float(f) => *float += f,
                _ => {}
            };
        }
        Acc::Mean { sum, n } => {
            if let Some(v) = value.as_f64() {
                *sum += v;
                *n += 1;
            }
        }
        Acc::Unique { seen, values } => {
            if !value.is_null() && seen.insert(value.key()) {
                values.push(value.clone());
            }
        }
    }
}

fn output_type(op: &Reduce, source: FieldType) -> FieldType {
    match op {
        Reduce::Count { .. } => FieldType::Int,
        Reduce::Sum => source,
        Reduce::Mean => FieldType::Float,
        Reduce::Unique => FieldType::Text,
    }
}

fn finish_acc(acc: &Acc, op: &Reduce, source: FieldType) -> Value {
    match acc {
        Acc::Count { rows, present } => match op {
            Reduce::Count { present_only: true } => Value::Int(*present as i64),
            _ => Value::Int(*rows as i64),
        },
        Acc::Sum { int, float } => match source {
            FieldType::Int => Value::Int(*int),
            _ => Value::Float(*float + *int as f64),
        },
        Acc::Mean { sum, n } => {
            if *n == 0 {
                Value::Null
            } else {
                Value::Float(sum / *n as f64)
            }
        }
        Acc::Unique { values, .. } => {
            if values.is_empty() {
                Value::Null
            } else {
                Value::Text(
                    values
                        .iter()
                        .map(Value::label)
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            }
        }
    }
}

fn sort_desc(table: Table, column: &str) -> AggregateResult<Table> {
    let idx = table
        .schema()
        .index_of(column)
        .map_err(|_| AggregateError::UnknownSortColumn(column.to_string()))?;

    let mut indexed: Vec<(usize, KeyValue)> = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.get(idx).key()))
        .collect();
    // stable: ties keep first-appearance order; Null ranks lowest so it
    // lands at the end of a descending sort
    indexed.sort_by(|a, b| b.1.cmp(&a.1));

    let mut out = Table::new(table.schema().clone());
    for (i, _) in indexed {
        out.push_record(table.rows()[i].clone())?;
    }
    Ok(out)
}

/// Get a description of all reductions, for `chartprep operations`.
pub fn reductions_description() -> String {
    r#"Reductions:

| Op | Description | Parameters |
|----|-------------|------------|
| count | Row count per group | present_only: skip rows where the field is absent (default false) |
| sum | Sum of present values | - |
| mean | Mean of present values; absent when a group has none | - |
| unique | Distinct present values, first-appearance order, as text | - |

Example reductions in JSON:
[
  {"field": "year", "op": "count", "name": "prize"},
  {"field": "share_pct", "op": "mean", "name": "avg_share"}
]"#
    .to_string()
}

// =============================================================================
// Cumulative Series
// =============================================================================

/// One step of a cumulative series.
#[derive(Debug, Clone, Serialize)]
pub struct CumulativeStep {
    /// The ordering-field value of this step.
    pub order: Value,
    /// Contribution at this step (rows tied on the ordering field merge).
    pub value: f64,
    /// Sum of all contributions at or before this step.
    pub running: f64,
}

/// Reduction values for one group key, accumulated in ascending order of a
/// secondary key. Running values are monotonically non-decreasing when the
/// reduction is a non-negative count or sum.
#[derive(Debug, Clone, Serialize)]
pub struct CumulativeSeries {
    /// The group key values.
    pub key: Vec<Value>,
    /// Display label, key labels joined with " / ".
    pub label: String,
    pub steps: Vec<CumulativeStep>,
}

/// Per-group running reduction over an ordering field.
///
/// Only count and sum can accumulate; rows tied on the ordering field
/// contribute to a single step. Absent ordering values sort before every
/// present value and form the earliest step.
pub fn cumulative(
    table: &Table,
    group_by: &[String],
    order_by: &str,
    reduction: &Reduction,
) -> AggregateResult<Vec<CumulativeSeries>> {
    if !matches!(reduction.op, Reduce::Count { .. } | Reduce::Sum) {
        return Err(AggregateError::UnsupportedCumulative(
            reduction.op.label().to_string(),
        ));
    }

    let key_indices: Vec<usize> = group_by
        .iter()
        .map(|name| table.schema().index_of(name))
        .collect::<Result<_, _>>()?;
    let order_idx = table.schema().index_of(order_by)?;
    let value_idx = table.schema().index_of(&reduction.field)?;
    let value_ty = table.schema().fields()[value_idx].ty;
    if matches!(reduction.op, Reduce::Sum) && !matches!(value_ty, FieldType::Int | FieldType::Float)
    {
        return Err(AggregateError::NonNumeric {
            field: reduction.field.clone(),
        });
    }

    struct SeriesAcc {
        key: Vec<Value>,
        by_order: BTreeMap<KeyValue, (Value, f64)>,
    }

    let mut slots: HashMap<Vec<KeyValue>, usize> = HashMap::new();
    let mut series: Vec<SeriesAcc> = Vec::new();

    for record in table.rows() {
        let key: Vec<KeyValue> = key_indices.iter().map(|&i| record.get(i).key()).collect();
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = series.len();
                slots.insert(key, slot);
                series.push(SeriesAcc {
                    key: key_indices.iter().map(|&i| record.get(i).clone()).collect(),
                    by_order: BTreeMap::new(),
                });
                slot
            }
        };

        let order_value = record.get(order_idx);
        let contribution = match &reduction.op {
            Reduce::Count { present_only } => {
                if *present_only && record.get(value_idx).is_null() {
                    0.0
                } else {
                    1.0
                }
            }
            _ => record.get(value_idx).as_f64().unwrap_or(0.0),
        };

        let entry = series[slot]
            .by_order
            .entry(order_value.key())
            .or_insert_with(|| (order_value.clone(), 0.0));
        entry.1 += contribution;
    }

    Ok(series
        .into_iter()
        .map(|acc| {
            let label = acc
                .key
                .iter()
                .map(Value::label)
                .collect::<Vec<_>>()
                .join(" / ");
            let mut running = 0.0;
            let steps = acc
                .by_order
                .into_values()
                .map(|(order, value)| {
                    running += value;
                    CumulativeStep {
                        order,
                        value,
                        running,
                    }
                })
                .collect();
            CumulativeSeries {
                key: acc.key,
                label,
                steps,
            }
        })
        .collect())
}

// =============================================================================
// Descriptive Statistics
// =============================================================================

/// Descriptive statistics of a numeric field's present values.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Present values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; absent below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Count/mean/std/min/quartiles/max of one numeric field, over present
/// values only.
pub fn describe(table: &Table, field: &str) -> AggregateResult<Summary> {
    let values = numeric_column(table, field)?;
    let count = values.len();
    if count == 0 {
        return Ok(Summary {
            count,
            mean: None,
            std: None,
            min: None,
            q25: None,
            median: None,
            q75: None,
            max: None,
        });
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count < 2 {
        None
    } else {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(var.sqrt())
    };

    Ok(Summary {
        count,
        mean: Some(mean),
        std,
        min: Some(sorted[0]),
        q25: Some(percentile(&sorted, 0.25)),
        median: Some(percentile(&sorted, 0.5)),
        q75: Some(percentile(&sorted, 0.75)),
        max: Some(sorted[count - 1]),
    })
}

/// Row index of the largest present value, first occurrence on ties.
pub fn idx_of_max(table: &Table, field: &str) -> AggregateResult<Option<usize>> {
    extremum(table, field, |candidate, best| candidate > best)
}

/// Row index of the smallest present value, first occurrence on ties.
pub fn idx_of_min(table: &Table, field: &str) -> AggregateResult<Option<usize>> {
    extremum(table, field, |candidate, best| candidate < best)
}

fn extremum(
    table: &Table,
    field: &str,
    better: impl Fn(f64, f64) -> bool,
) -> AggregateResult<Option<usize>> {
    let idx = table.schema().index_of(field)?;
    check_numeric(table, field, idx)?;

    let mut best: Option<(usize, f64)> = None;
    for (row, record) in table.rows().iter().enumerate() {
        if let Some(v) = record.get(idx).as_f64() {
            let replace = match best {
                None => true,
                Some((_, b)) => better(v, b),
            };
            if replace {
                best = Some((row, v));
            }
        }
    }
    Ok(best.map(|(row, _)| row))
}

fn numeric_column(table: &Table, field: &str) -> AggregateResult<Vec<f64>> {
    let idx = table.schema().index_of(field)?;
    check_numeric(table, field, idx)?;
    Ok(table
        .rows()
        .iter()
        .filter_map(|r| r.get(idx).as_f64())
        .collect())
}

fn check_numeric(table: &Table, field: &str, idx: usize) -> AggregateResult<()> {
    let ty = table.schema().fields()[idx].ty;
    if !matches!(ty, FieldType::Int | FieldType::Float) {
        return Err(AggregateError::NonNumeric {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Linear-interpolation percentile over an ascending slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;
    if lo + 1 >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Field, Record, Schema};

    fn prize_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("category", FieldType::Text),
            Field::new("country", FieldType::Text),
            Field::new("share", FieldType::Float),
        ]);
        let mut table = Table::new(schema);
        let rows: Vec<(i64, &str, Option<&str>, Option<f64>)> = vec![
            (1901, "Physics", Some("Germany"), Some(1.0)),
            (1901, "Physics", Some("Netherlands"), Some(0.5)),
            (1902, "Chemistry", Some("Germany"), Some(1.0)),
            (1903, "Physics", None, None),
        ];
        for (year, category, country, share) in rows {
            table
                .push_record(Record::new(vec![
                    Value::Int(year),
                    Value::Text(category.into()),
                    country.map(|c| Value::Text(c.into())).unwrap_or(Value::Null),
                    share.map(Value::Float).unwrap_or(Value::Null),
                ]))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_count_by_category() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("share", Reduce::Count { present_only: false }).named("prize")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        // first-appearance order
        assert_eq!(out.value(0, 0), &Value::Text("Physics".into()));
        assert_eq!(out.value(0, 1), &Value::Int(3));
        assert_eq!(out.value(1, 0), &Value::Text("Chemistry".into()));
        assert_eq!(out.value(1, 1), &Value::Int(1));
    }

    #[test]
    fn test_count_sums_to_row_count() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["country".to_string()],
            &[Reduction::new("year", Reduce::Count { present_only: false }).named("n")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();

        let total: i64 = (0..out.len())
            .map(|r| out.value(r, 1).as_i64().unwrap())
            .sum();
        assert_eq!(total as usize, table.len());
    }

    #[test]
    fn test_absent_key_is_its_own_group() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["country".to_string()],
            &[Reduction::new("year", Reduce::Count { present_only: false }).named("n")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();

        // Germany, Netherlands, and the absent group
        assert_eq!(out.len(), 3);
        assert_eq!(out.value(2, 0), &Value::Null);
        assert_eq!(out.value(2, 1), &Value::Int(1));
    }

    #[test]
    fn test_count_present_only() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("share", Reduce::Count { present_only: true }).named("n")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();

        // Physics has 3 rows but only 2 present shares
        assert_eq!(out.value(0, 1), &Value::Int(2));
    }

    #[test]
    fn test_mean_all_absent_yields_null() {
        let schema = Schema::new(vec![
            Field::new("category", FieldType::Text),
            Field::new("share", FieldType::Float),
        ]);
        let mut table = Table::new(schema);
        table
            .push_record(Record::new(vec![Value::Text("Peace".into()), Value::Null]))
            .unwrap();
        table
            .push_record(Record::new(vec![Value::Text("Peace".into()), Value::Null]))
            .unwrap();

        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("share", Reduce::Mean).named("mean_share")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();
        assert_eq!(out.value(0, 1), &Value::Null);
    }

    #[test]
    fn test_mean_ignores_absent() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("share", Reduce::Mean).named("mean_share")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();
        // Physics: (1.0 + 0.5) / 2 present values, the Null row not counted
        assert_eq!(out.value(0, 1), &Value::Float(0.75));
    }

    #[test]
    fn test_sum_follows_source_type() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[
                Reduction::new("year", Reduce::Sum).named("year_sum"),
                Reduction::new("share", Reduce::Sum).named("share_sum"),
            ],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();
        assert_eq!(out.value(0, 1), &Value::Int(1901 + 1901 + 1903));
        assert_eq!(out.value(0, 2), &Value::Float(1.5));
        // Chemistry
        assert_eq!(out.value(1, 2), &Value::Float(1.0));
    }

    #[test]
    fn test_sum_on_text_rejected() {
        let table = prize_table();
        let err = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("country", Reduce::Sum)],
            &GroupOrder::FirstAppearance,
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::NonNumeric { .. }));
    }

    #[test]
    fn test_unique_reduction() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("country", Reduce::Unique).named("countries")],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();
        assert_eq!(
            out.value(0, 1),
            &Value::Text("Germany, Netherlands".into())
        );
        assert_eq!(out.value(1, 1), &Value::Text("Germany".into()));
    }

    #[test]
    fn test_sorted_by_value_desc() {
        let table = prize_table();
        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("year", Reduce::Count { present_only: false }).named("prize")],
            &GroupOrder::ValueDesc {
                column: "prize".into(),
            },
        )
        .unwrap();
        assert_eq!(out.value(0, 0), &Value::Text("Physics".into()));
        assert_eq!(out.value(0, 1), &Value::Int(3));
        assert_eq!(out.value(1, 1), &Value::Int(1));
    }

    #[test]
    fn test_unknown_sort_column() {
        let table = prize_table();
        let err = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("year", Reduce::Count { present_only: false }).named("prize")],
            &GroupOrder::ValueDesc {
                column: "nope".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::UnknownSortColumn(_)));
    }

    #[test]
    fn test_count_over_text_field() {
        // [(1901, Physics, 1/1), (1901, Physics, 1/2), (1902, Chemistry, 1/1)]
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("category", FieldType::Text),
            Field::new("share", FieldType::Text),
        ]);
        let mut table = Table::new(schema);
        for (y, c, s) in [
            (1901, "Physics", "1/1"),
            (1901, "Physics", "1/2"),
            (1902, "Chemistry", "1/1"),
        ] {
            table
                .push_record(Record::new(vec![
                    Value::Int(y),
                    Value::Text(c.into()),
                    Value::Text(s.into()),
                ]))
                .unwrap();
        }

        let out = aggregate(
            &table,
            &["category".to_string()],
            &[Reduction::new("share", Reduce::Count { present_only: false })],
            &GroupOrder::FirstAppearance,
        )
        .unwrap();
        assert_eq!(out.value(0, 0), &Value::Text("Physics".into()));
        assert_eq!(out.value(0, 1), &Value::Int(2));
        assert_eq!(out.value(1, 0), &Value::Text("Chemistry".into()));
        assert_eq!(out.value(1, 1), &Value::Int(1));
    }

    fn yearly_counts() -> Table {
        // pre-aggregated yearly counts per country, the shape the original
        // cumulative chart was built from
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("country", FieldType::Text),
            Field::new("prize", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        for (y, c, n) in [
            (1905, "US", 2),
            (1901, "US", 1),
            (1910, "US", 0),
            (1901, "France", 1),
        ] {
            table
                .push_record(Record::new(vec![
                    Value::Int(y),
                    Value::Text(c.into()),
                    Value::Int(n),
                ]))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_cumulative_sum_example() {
        let table = yearly_counts();
        let series = cumulative(
            &table,
            &["country".to_string()],
            "year",
            &Reduction::new("prize", Reduce::Sum),
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        let us = &series[0];
        assert_eq!(us.label, "US");
        let runnings: Vec<f64> = us.steps.iter().map(|s| s.running).collect();
        assert_eq!(runnings, vec![1.0, 3.0, 3.0]);
        // ascending order even though input rows were shuffled
        assert_eq!(us.steps[0].order, Value::Int(1901));
        assert_eq!(us.steps[2].order, Value::Int(1910));
    }

    #[test]
    fn test_cumulative_monotonic_for_counts() {
        let table = prize_table();
        let series = cumulative(
            &table,
            &["category".to_string()],
            "year",
            &Reduction::new("year", Reduce::Count { present_only: false }),
        )
        .unwrap();
        for s in &series {
            for pair in s.steps.windows(2) {
                assert!(pair[0].running <= pair[1].running);
            }
        }
    }

    #[test]
    fn test_cumulative_ties_merge_into_one_step() {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("country", FieldType::Text),
        ]);
        let mut table = Table::new(schema);
        for y in [1901, 1901, 1903] {
            table
                .push_record(Record::new(vec![Value::Int(y), Value::Text("US".into())]))
                .unwrap();
        }
        let series = cumulative(
            &table,
            &["country".to_string()],
            "year",
            &Reduction::new("year", Reduce::Count { present_only: false }),
        )
        .unwrap();
        let us = &series[0];
        // both 1901 rows visible at the 1901 step, not split
        assert_eq!(us.steps.len(), 2);
        assert_eq!(us.steps[0].value, 2.0);
        assert_eq!(us.steps[0].running, 2.0);
        assert_eq!(us.steps[1].running, 3.0);
    }

    #[test]
    fn test_cumulative_rejects_mean() {
        let table = yearly_counts();
        let err = cumulative(
            &table,
            &["country".to_string()],
            "year",
            &Reduction::new("prize", Reduce::Mean),
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::UnsupportedCumulative(_)));
    }

    #[test]
    fn test_describe() {
        let schema = Schema::new(vec![Field::new("age", FieldType::Int)]);
        let mut table = Table::new(schema);
        for v in [25, 35, 45, 55] {
            table.push_record(Record::new(vec![Value::Int(v)])).unwrap();
        }
        table.push_record(Record::new(vec![Value::Null])).unwrap();

        let summary = describe(&table, "age").unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(40.0));
        assert_eq!(summary.min, Some(25.0));
        assert_eq!(summary.max, Some(55.0));
        assert_eq!(summary.median, Some(40.0));
        assert_eq!(summary.q25, Some(32.5));
        assert_eq!(summary.q75, Some(47.5));
    }

    #[test]
    fn test_describe_empty_column() {
        let schema = Schema::new(vec![Field::new("age", FieldType::Int)]);
        let mut table = Table::new(schema);
        table.push_record(Record::new(vec![Value::Null])).unwrap();
        let summary = describe(&table, "age").unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
    }

    #[test]
    fn test_extremes() {
        let schema = Schema::new(vec![Field::new("age", FieldType::Int)]);
        let mut table = Table::new(schema);
        for v in [Value::Int(60), Value::Null, Value::Int(17), Value::Int(97)] {
            table.push_record(Record::new(vec![v])).unwrap();
        }
        assert_eq!(idx_of_max(&table, "age").unwrap(), Some(3));
        assert_eq!(idx_of_min(&table, "age").unwrap(), Some(2));
    }

    #[test]
    fn test_reduction_serde() {
        let json = r#"{"field": "share", "op": "count", "present_only": true}"#;
        let reduction: Reduction = serde_json::from_str(json).unwrap();
        assert!(matches!(reduction.op, Reduce::Count { present_only: true }));
        assert_eq!(reduction.output_name(), "share");

        let json = r#"{"field": "share", "op": "mean", "name": "avg"}"#;
        let reduction: Reduction = serde_json::from_str(json).unwrap();
        assert!(matches!(reduction.op, Reduce::Mean));
        assert_eq!(reduction.output_name(), "avg");
    }
}
