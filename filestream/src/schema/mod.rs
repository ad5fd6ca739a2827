pub mod convert;
pub mod merge;

pub use convert::{type_mapping_to_schema, value_type};
pub use merge::merge_schemas;

use common::{Error, Result};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Primitive type tags a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimitiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(PrimitiveType::String),
            "integer" => Ok(PrimitiveType::Integer),
            "number" => Ok(PrimitiveType::Number),
            "boolean" => Ok(PrimitiveType::Boolean),
            "object" => Ok(PrimitiveType::Object),
            "array" => Ok(PrimitiveType::Array),
            other => Err(Error::InvalidInput(format!("Unknown field type: {}", other))),
        }
    }
}

/// The type of one field: a single tag, or a union of tags observed across
/// sources.
///
/// Tags are kept as a set, so a union never holds duplicates and a union
/// with one distinct tag is indistinguishable from that bare tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    tags: BTreeSet<PrimitiveType>,
}

impl FieldType {
    pub fn primitive(tag: PrimitiveType) -> Self {
        Self {
            tags: BTreeSet::from([tag]),
        }
    }

    /// Builds a field type from observed tags. Returns `None` for an empty set.
    pub fn from_tags(tags: impl IntoIterator<Item = PrimitiveType>) -> Option<Self> {
        let tags: BTreeSet<_> = tags.into_iter().collect();
        if tags.is_empty() {
            None
        } else {
            Some(Self { tags })
        }
    }

    pub fn union(&self, other: &FieldType) -> FieldType {
        FieldType {
            tags: self.tags.union(&other.tags).copied().collect(),
        }
    }

    pub fn is_union(&self) -> bool {
        self.tags.len() > 1
    }

    /// The bare tag when this is not a union.
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        if self.is_union() {
            None
        } else {
            self.tags.iter().next().copied()
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = PrimitiveType> + '_ {
        self.tags.iter().copied()
    }

    pub fn contains(&self, tag: PrimitiveType) -> bool {
        self.tags.contains(&tag)
    }

    pub fn to_json_schema(&self) -> Value {
        match self.as_primitive() {
            Some(tag) => json!({ "type": tag.as_str() }),
            None => {
                let tags: Vec<Value> = self.tags().map(|t| Value::from(t.as_str())).collect();
                json!({ "type": tags })
            }
        }
    }

    /// Parses a JSON Schema property (`{"type": "string"}` or
    /// `{"type": ["integer", "string"]}`). `"null"` entries are ignored.
    pub fn from_json_schema(property: &Value) -> Result<Self> {
        let type_value = property
            .get("type")
            .ok_or_else(|| Error::InvalidInput(format!("Property has no type: {}", property)))?;

        let names: Vec<&str> = match type_value {
            Value::String(name) => vec![name.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        Error::InvalidInput(format!("Type entry is not a string: {}", item))
                    })
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(Error::InvalidInput(format!(
                    "Unsupported type declaration: {}",
                    other
                )));
            }
        };

        let tags = names
            .into_iter()
            .filter(|name| *name != "null")
            .map(PrimitiveType::from_str)
            .collect::<Result<Vec<_>>>()?;

        FieldType::from_tags(tags)
            .ok_or_else(|| Error::InvalidInput(format!("Property has no usable type: {}", property)))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_primitive() {
            Some(tag) => write!(f, "{}", tag),
            None => {
                let names: Vec<&str> = self.tags().map(|t| t.as_str()).collect();
                write!(f, "union({})", names.join(","))
            }
        }
    }
}

/// Mapping from field name to field type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeMap<String, FieldType>,
}

impl Schema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Adds a tag to a field, widening it when the field already exists.
    pub fn observe(&mut self, name: &str, tag: PrimitiveType) {
        match self.fields.get_mut(name) {
            Some(existing) => {
                if !existing.contains(tag) {
                    *existing = existing.union(&FieldType::primitive(tag));
                }
            }
            None => {
                self.fields
                    .insert(name.to_string(), FieldType::primitive(tag));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.fields.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn into_fields(self) -> BTreeMap<String, FieldType> {
        self.fields
    }

    pub(crate) fn from_fields(fields: BTreeMap<String, FieldType>) -> Self {
        Self { fields }
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, t)| (name.clone(), t.to_json_schema()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
        })
    }

    /// Reads a schema back from the `{"type": "object", "properties": ...}`
    /// shape produced by [`Schema::to_json_schema`].
    pub fn from_json_schema(value: &Value) -> Result<Self> {
        let properties = match value.get("properties") {
            Some(Value::Object(properties)) => properties,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "Schema properties must be an object, got: {}",
                    other
                )));
            }
            None => return Ok(Schema::empty()),
        };

        let fields = properties
            .iter()
            .map(|(name, property)| Ok((name.clone(), FieldType::from_json_schema(property)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag_union_collapses() {
        let string = FieldType::primitive(PrimitiveType::String);
        let merged = string.union(&string);

        assert!(!merged.is_union());
        assert_eq!(merged, string);
        assert_eq!(merged.as_primitive(), Some(PrimitiveType::String));
    }

    #[test]
    fn test_union_has_no_duplicates() {
        let t = FieldType::from_tags([
            PrimitiveType::Integer,
            PrimitiveType::String,
            PrimitiveType::Integer,
        ])
        .unwrap();

        assert_eq!(t.tags().count(), 2);
        assert_eq!(t.to_string(), "union(string,integer)");
    }

    #[test]
    fn test_from_tags_empty() {
        assert!(FieldType::from_tags(Vec::new()).is_none());
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = Schema::empty()
            .with_field("a", FieldType::primitive(PrimitiveType::String))
            .with_field(
                "b",
                FieldType::from_tags([PrimitiveType::Integer, PrimitiveType::String]).unwrap(),
            );

        assert_eq!(
            schema.to_json_schema(),
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "string"},
                    "b": {"type": ["string", "integer"]},
                }
            })
        );
        assert_eq!(Schema::from_json_schema(&schema.to_json_schema()).unwrap(), schema);
    }

    #[test]
    fn test_from_json_schema_ignores_null() {
        let schema = Schema::from_json_schema(&json!({
            "type": "object",
            "properties": {"a": {"type": ["null", "number"]}}
        }))
        .unwrap();

        assert_eq!(
            schema.get("a"),
            Some(&FieldType::primitive(PrimitiveType::Number))
        );
    }

    #[test]
    fn test_from_json_schema_rejects_unknown_type() {
        let result = Schema::from_json_schema(&json!({
            "properties": {"a": {"type": "date"}}
        }));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_observe_widens() {
        let mut schema = Schema::empty();
        schema.observe("a", PrimitiveType::Integer);
        schema.observe("a", PrimitiveType::Integer);
        assert!(!schema.get("a").unwrap().is_union());

        schema.observe("a", PrimitiveType::String);
        assert!(schema.get("a").unwrap().is_union());
    }
}
