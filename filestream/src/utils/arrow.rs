use crate::Record;
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Decimal128Type, Float16Type, Float32Type, Float64Type, Int8Type, Int16Type,
    Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use chrono::{TimeZone, Utc};
use common::{Error, Result};
use serde_json::{Map, Value};

/// Converts every row of a batch into a JSON record keyed by column name.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let schema = batch.schema();
    let mut records = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut row = Record::new();

        for (col_idx, field) in schema.fields().iter().enumerate() {
            let value = arrow_array_to_json(batch.column(col_idx), row_idx)?;
            row.insert(field.name().clone(), value);
        }

        records.push(row);
    }

    Ok(records)
}

fn elements_to_json(array: &dyn Array) -> Result<Value> {
    (0..array.len())
        .map(|i| arrow_array_to_json(array, i))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Converts one cell to JSON. Decimals and floats become numbers, lists
/// become arrays, structs and maps become objects, so each value carries the
/// tag `arrow_type_to_primitive` gives its column.
pub fn arrow_array_to_json(array: &dyn Array, index: usize) -> Result<Value> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    Ok(match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(index)),
        DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(index)),
        DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(index)),
        DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(index)),
        DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(index)),
        DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(index)),
        DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(index)),
        DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(index)),
        DataType::UInt64 => Value::from(array.as_primitive::<UInt64Type>().value(index)),
        DataType::Float16 => Value::from(array.as_primitive::<Float16Type>().value(index).to_f64()),
        DataType::Float32 => Value::from(array.as_primitive::<Float32Type>().value(index) as f64),
        DataType::Float64 => Value::from(array.as_primitive::<Float64Type>().value(index)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(index).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(index).to_string()),
        DataType::Timestamp(unit, _) => {
            let nanos = match unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value(index)
                    .checked_mul(1_000_000_000),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value(index)
                    .checked_mul(1_000_000),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value(index)
                    .checked_mul(1_000),
                TimeUnit::Nanosecond => {
                    Some(array.as_primitive::<TimestampNanosecondType>().value(index))
                }
            };
            match nanos {
                Some(nanos) => Value::String(Utc.timestamp_nanos(nanos).to_rfc3339()),
                None => Value::String(array_value_to_string(array, index)?),
            }
        }
        DataType::Decimal128(_, scale) => {
            let unscaled = array.as_primitive::<Decimal128Type>().value(index);
            Value::from(unscaled as f64 / 10f64.powi(i32::from(*scale)))
        }
        DataType::Decimal256(_, _) => {
            let text = array_value_to_string(array, index)?;
            let number = text.parse::<f64>().map_err(|e| {
                Error::InvalidInput(format!("Decimal '{}' is not a number: {}", text, e))
            })?;
            Value::from(number)
        }
        DataType::List(_) => elements_to_json(array.as_list::<i32>().value(index).as_ref())?,
        DataType::LargeList(_) => elements_to_json(array.as_list::<i64>().value(index).as_ref())?,
        DataType::FixedSizeList(_, _) => {
            elements_to_json(array.as_fixed_size_list().value(index).as_ref())?
        }
        DataType::Struct(fields) => {
            let columns = array.as_struct().columns();
            let mut object = Map::with_capacity(fields.len());
            for (field, column) in fields.iter().zip(columns) {
                object.insert(field.name().clone(), arrow_array_to_json(column.as_ref(), index)?);
            }
            Value::Object(object)
        }
        DataType::Map(_, _) => {
            let entries = array.as_map().value(index);
            let (keys, values) = (entries.column(0), entries.column(1));
            let mut object = Map::with_capacity(entries.len());
            for i in 0..entries.len() {
                let key = match arrow_array_to_json(keys.as_ref(), i)? {
                    Value::String(key) => key,
                    other => other.to_string(),
                };
                object.insert(key, arrow_array_to_json(values.as_ref(), i)?);
            }
            Value::Object(object)
        }
        DataType::Dictionary(_, _) => {
            let dictionary = array.as_any_dictionary();
            let key = arrow_array_to_json(dictionary.keys(), index)?
                .as_u64()
                .ok_or_else(|| Error::InvalidInput("Negative dictionary key".to_string()))?;
            arrow_array_to_json(dictionary.values().as_ref(), key as usize)?
        }
        // Dates, times and binaries use Arrow's display form.
        _ => Value::String(array_value_to_string(array, index)?),
    })
}
