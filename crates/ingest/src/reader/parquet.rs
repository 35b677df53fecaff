use std::path::Path;

use ::arrow::array::{Array, ArrayRef, AsArray};
use ::arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use ::arrow::util::display::{ArrayFormatter, FormatOptions};
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use salesflow_core::{Table, Value};

use crate::error::ReadError;

/// Read every row group of a parquet file into a table.
///
/// Integer, float, boolean and string columns map to matching values.
/// Anything else (dates, timestamps, decimals, nested types) is rendered as
/// text using arrow's display formatting.
pub fn read_parquet(path: &Path) -> Result<Table, ReadError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut table = Table::new(columns);
    for batch_result in reader {
        let batch = batch_result?;
        let mut cells: Vec<std::vec::IntoIter<Value>> = batch
            .columns()
            .iter()
            .map(|col| column_values(col).map(Vec::into_iter))
            .collect::<Result<_, _>>()?;

        for _ in 0..batch.num_rows() {
            let row = cells
                .iter_mut()
                .map(|col| col.next().unwrap_or(Value::Null))
                .collect();
            table.push_row(row)?;
        }
    }
    Ok(table)
}

fn column_values(array: &ArrayRef) -> Result<Vec<Value>, ReadError> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => {
            let a = array.as_boolean();
            cells(array, |i| Value::Boolean(a.value(i)))
        }
        DataType::Int8 => {
            let a = array.as_primitive::<Int8Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::Int16 => {
            let a = array.as_primitive::<Int16Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::Int32 => {
            let a = array.as_primitive::<Int32Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::Int64 => {
            let a = array.as_primitive::<Int64Type>();
            cells(array, |i| Value::Integer(a.value(i)))
        }
        DataType::UInt8 => {
            let a = array.as_primitive::<UInt8Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::UInt16 => {
            let a = array.as_primitive::<UInt16Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::UInt32 => {
            let a = array.as_primitive::<UInt32Type>();
            cells(array, |i| Value::Integer(i64::from(a.value(i))))
        }
        DataType::UInt64 => {
            let a = array.as_primitive::<UInt64Type>();
            cells(array, |i| {
                let v = a.value(i);
                i64::try_from(v)
                    .map(Value::Integer)
                    .unwrap_or(Value::Float(v as f64))
            })
        }
        DataType::Float32 => {
            let a = array.as_primitive::<Float32Type>();
            cells(array, |i| Value::float(f64::from(a.value(i))))
        }
        DataType::Float64 => {
            let a = array.as_primitive::<Float64Type>();
            cells(array, |i| Value::float(a.value(i)))
        }
        DataType::Utf8 => {
            let a = array.as_string::<i32>();
            cells(array, |i| Value::Text(a.value(i).to_string()))
        }
        DataType::LargeUtf8 => {
            let a = array.as_string::<i64>();
            cells(array, |i| Value::Text(a.value(i).to_string()))
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            cells(array, |i| Value::Text(formatter.value(i).to_string()))
        }
    };
    Ok(values)
}

fn cells(array: &ArrayRef, f: impl Fn(usize) -> Value) -> Vec<Value> {
    (0..array.len())
        .map(|i| if array.is_null(i) { Value::Null } else { f(i) })
        .collect()
}
