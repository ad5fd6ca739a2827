use crate::remote_file::FileType;
use crate::schema::{Schema, type_mapping_to_schema};
use crate::storage::glob::GlobMatcher;
use crate::validation::ValidationPolicy;
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Primary key of a stream: one field or a composite of several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(field) => vec![field.as_str()],
            PrimaryKey::Composite(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvFormat {
    pub delimiter: char,
    pub quote_char: char,
    pub double_quote: bool,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            double_quote: true,
        }
    }
}

/// Per-encoding reader options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatOptions {
    pub csv: CsvFormat,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStreamConfig {
    name: String,
    file_type: FileType,
    globs: Vec<String>,
    #[serde(default)]
    validation_policy: ValidationPolicy,
    #[serde(default)]
    input_schema: Option<BTreeMap<String, String>>,
    #[serde(default)]
    primary_key: Option<PrimaryKey>,
    #[serde(default)]
    format: FormatOptions,
}

/// Validated definition of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub name: String,
    pub file_type: FileType,
    pub globs: Vec<String>,
    pub validation_policy: ValidationPolicy,
    pub input_schema: Option<Schema>,
    pub primary_key: Option<PrimaryKey>,
    pub format: FormatOptions,
}

impl StreamConfig {
    /// Builds a stream definition from untyped configuration.
    ///
    /// Any structural or type mismatch fails with
    /// [`Error::ConfigValidation`]; nothing is partially constructed.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let raw: RawStreamConfig = serde_json::from_value(raw).map_err(|e| {
            Error::ConfigValidation(format!("Error creating stream config object: {}", e))
        })?;

        if raw.name.trim().is_empty() {
            return Err(Error::ConfigValidation("Stream name must not be empty".into()));
        }

        if raw.globs.iter().any(|g| g.trim().is_empty()) {
            return Err(Error::ConfigValidation(format!(
                "Stream '{}' has an empty glob pattern",
                raw.name
            )));
        }
        // Compiles every pattern; also rejects an empty list.
        GlobMatcher::new(&raw.globs)?;

        if let Some(primary_key) = &raw.primary_key {
            let fields = primary_key.fields();
            if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
                return Err(Error::ConfigValidation(format!(
                    "Stream '{}' has an empty primary key",
                    raw.name
                )));
            }
        }

        let csv = &raw.format.csv;
        for (option, value) in [("delimiter", csv.delimiter), ("quote_char", csv.quote_char)] {
            if !value.is_ascii() {
                return Err(Error::ConfigValidation(format!(
                    "CSV {} must be a single ASCII character, got '{}'",
                    option, value
                )));
            }
        }

        let input_schema = raw
            .input_schema
            .as_ref()
            .map(type_mapping_to_schema)
            .transpose()?;

        Ok(Self {
            name: raw.name,
            file_type: raw.file_type,
            globs: raw.globs,
            validation_policy: raw.validation_policy,
            input_schema,
            primary_key: raw.primary_key,
            format: raw.format,
        })
    }
}
