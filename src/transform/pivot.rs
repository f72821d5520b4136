//! Long-to-wide reshaping.
//!
//! [`pivot`] promotes one field's distinct values to columns; [`melt`]
//! inverts a pivoted table back to long triples. A pivot requires at most
//! one record per (row key, column key) pair; a duplicate cell is an
//! error, never a silent last-write-wins.

use std::collections::HashMap;

use crate::error::{PivotError, PivotResult};
use crate::table::{Field, FieldType, KeyValue, Record, Schema, Table, Value};

/// Pivot a long table into a wide one.
///
/// The output's first column is `row_key` (original type); every distinct
/// `col_key` value observed anywhere in the input becomes a column, labeled
/// with its display form. Cells with no source record take `fill` (which
/// must be null or match the value field's type). Rows come out ascending
/// when the row key is ordinal (int or date), else in first-appearance
/// order; columns are in first-appearance order.
pub fn pivot(
    table: &Table,
    row_key: &str,
    col_key: &str,
    value_field: &str,
    fill: &Value,
) -> PivotResult<Table> {
    let row_idx = table.schema().index_of(row_key)?;
    let col_idx = table.schema().index_of(col_key)?;
    let value_idx = table.schema().index_of(value_field)?;

    let row_ty = table.schema().fields()[row_idx].ty;
    let value_ty = table.schema().fields()[value_idx].ty;
    if let Some(fill_ty) = fill.type_of() {
        if fill_ty != value_ty {
            return Err(PivotError::BadFill { expected: value_ty });
        }
    }

    // Distinct row/column keys in first-appearance order.
    let mut row_slots: HashMap<KeyValue, usize> = HashMap::new();
    let mut row_keys: Vec<Value> = Vec::new();
    let mut col_slots: HashMap<KeyValue, usize> = HashMap::new();
    let mut col_keys: Vec<Value> = Vec::new();
    let mut cells: HashMap<(usize, usize), Value> = HashMap::new();

    for record in table.rows() {
        let row_value = record.get(row_idx);
        let col_value = record.get(col_idx);

        let row_slot = *row_slots.entry(row_value.key()).or_insert_with(|| {
            row_keys.push(row_value.clone());
            row_keys.len() - 1
        });
        let col_slot = *col_slots.entry(col_value.key()).or_insert_with(|| {
            col_keys.push(col_value.clone());
            col_keys.len() - 1
        });

        if cells
            .insert((row_slot, col_slot), record.get(value_idx).clone())
            .is_some()
        {
            return Err(PivotError::AmbiguousCell {
                row_key: row_value.label(),
                col_key: col_value.label(),
            });
        }
    }

    // Ordinal row keys come out sorted ascending.
    let mut row_order: Vec<usize> = (0..row_keys.len()).collect();
    if matches!(row_ty, FieldType::Int | FieldType::Date) {
        row_order.sort_by_key(|&slot| row_keys[slot].key());
    }

    let mut fields = vec![table.schema().fields()[row_idx].clone()];
    for key in &col_keys {
        fields.push(Field::new(key.label(), value_ty));
    }

    let mut out = Table::new(Schema::new(fields));
    for &row_slot in &row_order {
        let mut values = Vec::with_capacity(col_keys.len() + 1);
        values.push(row_keys[row_slot].clone());
        for col_slot in 0..col_keys.len() {
            values.push(
                cells
                    .get(&(row_slot, col_slot))
                    .cloned()
                    .unwrap_or_else(|| fill.clone()),
            );
        }
        out.push_record(Record::new(values))
            .map_err(PivotError::from)?;
    }
    Ok(out)
}

/// Invert a pivoted table back into long (row key, column label, value)
/// triples, one per cell. Column labels come back as text; callers
/// checking the pivot round-trip filter out fill cells themselves.
pub fn melt(pivoted: &Table, var_name: &str, value_name: &str) -> PivotResult<Table> {
    let fields = pivoted.schema().fields();
    let row_field = fields
        .first()
        .ok_or_else(|| PivotError::Table(crate::error::TableError::SchemaMismatch {
            expected: 1,
            found: 0,
        }))?
        .clone();
    let value_ty = fields.get(1).map(|f| f.ty).unwrap_or(FieldType::Text);

    let schema = Schema::new(vec![
        row_field,
        Field::new(var_name, FieldType::Text),
        Field::new(value_name, value_ty),
    ]);

    let mut out = Table::new(schema);
    for record in pivoted.rows() {
        for (col, field) in fields.iter().enumerate().skip(1) {
            out.push_record(Record::new(vec![
                record.get(0).clone(),
                Value::Text(field.name.clone()),
                record.get(col).clone(),
            ]))
            .map_err(PivotError::from)?;
        }
    }
    Ok(out)
}
