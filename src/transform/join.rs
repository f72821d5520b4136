//! Inner join of two derived tables on one key column.
//!
//! Used to combine two aggregations of the same source, e.g. per-country
//! totals with per-country-per-category counts. Non-key columns whose
//! names collide are suffixed `_x` (left) and `_y` (right).

use std::collections::HashMap;

use crate::error::TableError;
use crate::table::{Field, KeyValue, Record, Schema, Table};

/// Inner join: one output row per (left row, matching right row) pair, in
/// left-table order. Absent keys match absent keys.
pub fn inner_join(left: &Table, right: &Table, on: &str) -> Result<Table, TableError> {
    let left_key = left.schema().index_of(on)?;
    let right_key = right.schema().index_of(on)?;

    // right-side lookup: key -> row indices, preserving right order
    let mut lookup: HashMap<KeyValue, Vec<usize>> = HashMap::new();
    for (row, record) in right.rows().iter().enumerate() {
        lookup
            .entry(record.get(right_key).key())
            .or_default()
            .push(row);
    }

    let left_fields = left.schema().fields();
    let right_fields = right.schema().fields();

    let collides = |name: &str| {
        left_fields.iter().any(|f| f.name == name && f.name != on)
            && right_fields.iter().any(|f| f.name == name && f.name != on)
    };

    let mut fields: Vec<Field> = Vec::new();
    for field in left_fields {
        let mut field = field.clone();
        if collides(&field.name) {
            field.name = format!("{}_x", field.name);
        }
        fields.push(field);
    }
    for field in right_fields {
        if field.name == on {
            continue;
        }
        let mut field = field.clone();
        if collides(&field.name) {
            field.name = format!("{}_y", field.name);
        }
        fields.push(field);
    }

    let mut out = Table::new(Schema::new(fields));
    for left_record in left.rows() {
        let Some(matches) = lookup.get(&left_record.get(left_key).key()) else {
            continue;
        };
        for &right_row in matches {
            let right_record = &right.rows()[right_row];
            let mut values = left_record.values.clone();
            for (col, field) in right_fields.iter().enumerate() {
                if field.name == on {
                    continue;
                }
                values.push(right_record.get(col).clone());
            }
            out.push_record(Record::new(values))?;
        }
    }
    Ok(out)
}
