//! Rolling-window smoothing for time-indexed columns.
//!
//! Matches the usual dataframe semantics: the output is absent until the
//! window has filled, and a window containing an absent value yields an
//! absent mean rather than a partial one.

use crate::error::{AggregateError, AggregateResult};
use crate::table::{Field, FieldType, Record, Schema, Table, Value};

/// Rolling mean over one column of values.
pub fn rolling_mean(values: &[&Value], window: usize) -> AggregateResult<Vec<Value>> {
    if window == 0 {
        return Err(AggregateError::InvalidWindow);
    }

    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i + 1 < window {
            out.push(Value::Null);
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let mut sum = 0.0;
        let mut complete = true;
        for v in slice {
            match v.as_f64() {
                Some(x) => sum += x,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            out.push(Value::Float(sum / window as f64));
        } else {
            out.push(Value::Null);
        }
    }
    Ok(out)
}

/// Rolling mean over every column of a wide table except the first (the
/// row key). All smoothed columns come out as floats.
pub fn rolling_mean_table(table: &Table, window: usize) -> AggregateResult<Table> {
    if window == 0 {
        return Err(AggregateError::InvalidWindow);
    }

    let fields = table.schema().fields();
    let mut out_fields = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        if i == 0 {
            out_fields.push(field.clone());
        } else {
            if !matches!(field.ty, FieldType::Int | FieldType::Float) {
                return Err(AggregateError::NonNumeric {
                    field: field.name.clone(),
                });
            }
            out_fields.push(Field::new(field.name.clone(), FieldType::Float));
        }
    }

    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(fields.len() - 1);
    for col in 1..fields.len() {
        let cells: Vec<&Value> = table.rows().iter().map(|r| r.get(col)).collect();
        columns.push(rolling_mean(&cells, window)?);
    }

    let mut out = Table::new(Schema::new(out_fields));
    for (row, record) in table.rows().iter().enumerate() {
        let mut values = Vec::with_capacity(fields.len());
        values.push(record.get(0).clone());
        for column in &columns {
            values.push(column[row].clone());
        }
        out.push_record(Record::new(values))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    #[test]
    fn test_rolling_mean_basic() {
        let values = ints(&[2, 4, 6, 8]);
        let refs: Vec<&Value> = values.iter().collect();
        let out = rolling_mean(&refs, 2).unwrap();
        assert_eq!(
            out,
            vec![
                Value::Null,
                Value::Float(3.0),
                Value::Float(5.0),
                Value::Float(7.0)
            ]
        );
    }

    #[test]
    fn test_rolling_mean_null_poisons_window() {
        let values = vec![Value::Int(2), Value::Null, Value::Int(6), Value::Int(8)];
        let refs: Vec<&Value> = values.iter().collect();
        let out = rolling_mean(&refs, 2).unwrap();
        assert_eq!(
            out,
            vec![Value::Null, Value::Null, Value::Null, Value::Float(7.0)]
        );
    }

    #[test]
    fn test_rolling_mean_window_one_is_identity_as_floats() {
        let values = ints(&[5, 7]);
        let refs: Vec<&Value> = values.iter().collect();
        let out = rolling_mean(&refs, 1).unwrap();
        assert_eq!(out, vec![Value::Float(5.0), Value::Float(7.0)]);
    }

    #[test]
    fn test_rolling_mean_zero_window_rejected() {
        let err = rolling_mean(&[], 0).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidWindow));
    }

    #[test]
    fn test_rolling_mean_table() {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("go", FieldType::Int),
            Field::new("rust", FieldType::Int),
        ]);
        let mut table = Table::new(schema);
        for (y, go, rust) in [(2019, 4, 1), (2020, 6, 3), (2021, 8, 5)] {
            table
                .push_record(Record::new(vec![
                    Value::Int(y),
                    Value::Int(go),
                    Value::Int(rust),
                ]))
                .unwrap();
        }

        let smoothed = rolling_mean_table(&table, 2).unwrap();
        // row key untouched
        assert_eq!(smoothed.value(0, 0), &Value::Int(2019));
        assert_eq!(smoothed.value(0, 1), &Value::Null);
        assert_eq!(smoothed.value(1, 1), &Value::Float(5.0));
        assert_eq!(smoothed.value(2, 2), &Value::Float(4.0));
    }

    #[test]
    fn test_rolling_mean_table_rejects_text_column() {
        let schema = Schema::new(vec![
            Field::new("year", FieldType::Int),
            Field::new("tag", FieldType::Text),
        ]);
        let table = Table::new(schema);
        let err = rolling_mean_table(&table, 2).unwrap_err();
        assert!(matches!(err, AggregateError::NonNumeric { .. }));
    }
}
