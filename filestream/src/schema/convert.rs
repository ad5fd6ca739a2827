use super::{FieldType, PrimitiveType, Schema};
use crate::Record;
use arrow::datatypes::DataType;
use common::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Converts a user-declared `field -> type name` mapping into a schema.
pub fn type_mapping_to_schema(mapping: &BTreeMap<String, String>) -> Result<Schema> {
    mapping
        .iter()
        .try_fold(Schema::empty(), |schema, (name, type_name)| {
            let tag = PrimitiveType::from_str(type_name.trim()).map_err(|_| {
                Error::ConfigValidation(format!(
                    "Field '{}' declares unsupported type '{}'",
                    name, type_name
                ))
            })?;
            Ok(schema.with_field(name.clone(), FieldType::primitive(tag)))
        })
}

/// Type tag of a JSON value. `null` carries no type information.
pub fn value_type(value: &Value) -> Option<PrimitiveType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(PrimitiveType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(PrimitiveType::Integer),
        Value::Number(_) => Some(PrimitiveType::Number),
        Value::String(_) => Some(PrimitiveType::String),
        Value::Array(_) => Some(PrimitiveType::Array),
        Value::Object(_) => Some(PrimitiveType::Object),
    }
}

/// Schema observed in a single record; null-valued fields are skipped.
pub fn record_schema(record: &Record) -> Schema {
    let mut schema = Schema::empty();
    for (name, value) in record {
        if let Some(tag) = value_type(value) {
            schema.observe(name, tag);
        }
    }
    schema
}

/// Maps an Arrow column type onto a primitive tag.
pub fn arrow_type_to_primitive(data_type: &DataType) -> PrimitiveType {
    match data_type {
        DataType::Boolean => PrimitiveType::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => PrimitiveType::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => PrimitiveType::Number,
        DataType::List(_)
        | DataType::LargeList(_)
        | DataType::FixedSizeList(_, _) => PrimitiveType::Array,
        DataType::Struct(_) | DataType::Map(_, _) => PrimitiveType::Object,
        DataType::Dictionary(_, value_type) => arrow_type_to_primitive(value_type),
        // Strings, binaries, dates and timestamps are all surfaced as strings.
        _ => PrimitiveType::String,
    }
}
