//! Chart-ready output shapes.
//!
//! The pipeline's only contract with the external renderer: plain
//! serializable structures with no rendering state attached.
//!
//! - [`CategorySlice`] - category→count pairs for bar and pie charts
//! - [`Series`] / [`SeriesPoint`] - ordered (x, y) sequences per label for
//!   line and scatter charts
//! - [`SunburstNode`] - nested path→value tree for hierarchical charts

use serde::Serialize;

use crate::error::AggregateResult;
use crate::table::{Table, Value};
use crate::transform::aggregate::CumulativeSeries;

// =============================================================================
// Categories (bar / pie)
// =============================================================================

/// One category and its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub label: String,
    pub value: f64,
}

/// Build category slices from two columns of a (typically aggregated)
/// table. Rows whose value is absent are skipped; an absent category
/// labels itself "(unknown)". `limit` keeps the first N rows, so sort
/// before slicing when you want a top-N.
pub fn category_slices(
    table: &Table,
    label_field: &str,
    value_field: &str,
    limit: Option<usize>,
) -> AggregateResult<Vec<CategorySlice>> {
    let label_idx = table.schema().index_of(label_field)?;
    let value_idx = table.schema().index_of(value_field)?;

    let mut slices = Vec::new();
    for record in table.rows() {
        let Some(value) = record.get(value_idx).as_f64() else {
            continue;
        };
        slices.push(CategorySlice {
            label: record.get(label_idx).label(),
            value,
        });
        if let Some(limit) = limit {
            if slices.len() == limit {
                break;
            }
        }
    }
    Ok(slices)
}

// =============================================================================
// Series (line / scatter)
// =============================================================================

/// One point of a series. `y` may be absent (a gap the renderer may skip).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: Value,
    pub y: Value,
}

/// An ordered point sequence under one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// One series per value column of a wide (pivoted) table; x is the row
/// key, the column label names the series.
pub fn series_from_pivot(pivoted: &Table) -> Vec<Series> {
    let fields = pivoted.schema().fields();
    fields
        .iter()
        .enumerate()
        .skip(1)
        .map(|(col, field)| Series {
            label: field.name.clone(),
            points: pivoted
                .rows()
                .iter()
                .map(|r| SeriesPoint {
                    x: r.get(0).clone(),
                    y: r.get(col).clone(),
                })
                .collect(),
        })
        .collect()
}

/// One series per cumulative group; x is the ordering value, y the running
/// total.
pub fn series_from_cumulative(series: &[CumulativeSeries]) -> Vec<Series> {
    series
        .iter()
        .map(|s| Series {
            label: s.label.clone(),
            points: s
                .steps
                .iter()
                .map(|step| SeriesPoint {
                    x: step.order.clone(),
                    y: Value::Float(step.running),
                })
                .collect(),
        })
        .collect()
}

// =============================================================================
// Sunburst (hierarchical)
// =============================================================================

/// A node of a nested path→value tree. A node's value is the sum of the
/// contributions beneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstNode {
    pub label: String,
    pub value: f64,
    pub children: Vec<SunburstNode>,
}

/// Build a path→value tree from path columns plus one value column of an
/// aggregated table. Rows with an absent value are skipped; absent path
/// components label themselves "(unknown)" and still take their place in
/// the hierarchy.
pub fn sunburst(
    table: &Table,
    path_fields: &[String],
    value_field: &str,
) -> AggregateResult<Vec<SunburstNode>> {
    let path_indices: Vec<usize> = path_fields
        .iter()
        .map(|name| table.schema().index_of(name))
        .collect::<Result<_, _>>()?;
    let value_idx = table.schema().index_of(value_field)?;

    let mut roots: Vec<SunburstNode> = Vec::new();
    for record in table.rows() {
        let Some(value) = record.get(value_idx).as_f64() else {
            continue;
        };
        let labels: Vec<String> = path_indices.iter().map(|&i| record.get(i).label()).collect();
        insert_path(&mut roots, &labels, value);
    }
    Ok(roots)
}

fn insert_path(nodes: &mut Vec<SunburstNode>, path: &[String], value: f64) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    let slot = match nodes.iter().position(|n| &n.label == first) {
        Some(slot) => slot,
        None => {
            nodes.push(SunburstNode {
                label: first.clone(),
                value: 0.0,
                children: Vec::new(),
            });
            nodes.len() - 1
        }
    };
    nodes[slot].value += value;
    insert_path(&mut nodes[slot].children, rest, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Field, FieldType, Record, Schema};

    fn counts_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("category", FieldType::Text),
            Field::new("prize", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        for (c, n) in [("Physics", 3), ("Chemistry", 2), ("Peace", 1)] {
            table
                .push_record(Record::new(vec![Value::Text(c.into()), Value::Int(n)]))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_category_slices() {
        let slices = category_slices(&counts_table(), "category", "prize", None).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].label, "Physics");
        assert_eq!(slices[0].value, 3.0);
    }

    #[test]
    fn test_category_slices_limit() {
        let slices = category_slices(&counts_table(), "category", "prize", Some(2)).unwrap();
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn test_category_slices_null_label() {
        let schema = Schema::new(vec![
            Field::new("country", FieldType::Text),
            Field::new("prize", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        table
            .push_record(Record::new(vec![Value::Null, Value::Int(4)]))
            .unwrap();
        let slices = category_slices(&table, "country", "prize", None).unwrap();
        assert_eq!(slices[0].label, "(unknown)");
    }

    #[test]
    fn test_series_from_pivot() {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("go", FieldType::Int),
            Field::new("rust", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        for (y, go, rust) in [(2019, 4, 1), (2020, 6, 3)] {
            table
                .push_record(Record::new(vec![
                    Value::Int(y),
                    Value::Int(go),
                    Value::Int(rust),
                ]))
                .unwrap();
        }

        let series = series_from_pivot(&table);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "go");
        assert_eq!(series[0].points[1].x, Value::Int(2020));
        assert_eq!(series[0].points[1].y, Value::Int(6));
        assert_eq!(series[1].label, "rust");
    }

    #[test]
    fn test_sunburst_nests_and_sums() {
        let schema = Schema::new(vec![
            Field::new("country", FieldType::Text),
            Field::new("city", FieldType::Text),
            Field::new("prize", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        for (country, city, n) in [
            ("US", "Boston", 3),
            ("US", "Chicago", 2),
            ("France", "Paris", 4),
        ] {
            table
                .push_record(Record::new(vec![
                    Value::Text(country.into()),
                    Value::Text(city.into()),
                    Value::Int(n),
                ]))
                .unwrap();
        }

        let roots = sunburst(
            &table,
            &["country".to_string(), "city".to_string()],
            "prize",
        )
        .unwrap();

        assert_eq!(roots.len(), 2);
        let us = &roots[0];
        assert_eq!(us.label, "US");
        assert_eq!(us.value, 5.0);
        assert_eq!(us.children.len(), 2);
        assert_eq!(us.children[0].label, "Boston");
        assert_eq!(us.children[0].value, 3.0);
        assert_eq!(roots[1].value, 4.0);
    }

    #[test]
    fn test_sunburst_serialization() {
        let node = SunburstNode {
            label: "US".into(),
            value: 5.0,
            children: vec![SunburstNode {
                label: "Boston".into(),
                value: 3.0,
                children: Vec::new(),
            }],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["children"][0]["label"], "Boston");
    }
}
