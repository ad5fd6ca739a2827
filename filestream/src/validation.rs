use crate::Record;
use crate::schema::{PrimitiveType, Schema, value_type};
use serde::{Deserialize, Serialize};

/// What to do with a record that does not conform to the stream schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Emit every record, conforming or not.
    #[default]
    #[serde(rename = "Emit Record", alias = "emit_record")]
    EmitRecord,
    /// Drop non-conforming records and keep syncing.
    #[serde(rename = "Skip Record", alias = "skip_record")]
    SkipRecord,
    /// Stop the sync at the first non-conforming record so the schema can be
    /// rediscovered.
    #[serde(rename = "Wait for Discover", alias = "wait_for_discover")]
    WaitForDiscover,
}

/// Outcome of passing one record through the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordVerdict {
    Accept,
    Drop,
    Halt,
}

impl ValidationPolicy {
    pub fn accepts(&self, record: &Record, schema: &Schema) -> bool {
        match self {
            ValidationPolicy::EmitRecord => true,
            ValidationPolicy::SkipRecord | ValidationPolicy::WaitForDiscover => {
                conforms_to_schema(record, schema)
            }
        }
    }

    pub fn evaluate(&self, record: &Record, schema: &Schema) -> RecordVerdict {
        if self.accepts(record, schema) {
            RecordVerdict::Accept
        } else if *self == ValidationPolicy::WaitForDiscover {
            RecordVerdict::Halt
        } else {
            RecordVerdict::Drop
        }
    }
}

/// A record conforms when every field it carries is declared in the schema
/// with a matching type. Nulls match any type and integers match `number`.
/// Fields declared but absent from the record are allowed.
pub fn conforms_to_schema(record: &Record, schema: &Schema) -> bool {
    record.iter().all(|(name, value)| {
        let Some(field_type) = schema.get(name) else {
            return false;
        };
        match value_type(value) {
            None => true,
            Some(tag) => {
                field_type.contains(tag)
                    || (tag == PrimitiveType::Integer && field_type.contains(PrimitiveType::Number))
            }
        }
    })
}
