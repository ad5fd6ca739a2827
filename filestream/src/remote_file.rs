use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// File encodings the engine can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Jsonl,
    Parquet,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Jsonl => "jsonl",
            FileType::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file listed by a [`StreamReader`](crate::storage::StreamReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub uri: String,
    pub last_modified: DateTime<Utc>,
    pub file_type: FileType,
}

impl RemoteFile {
    pub fn new(uri: impl Into<String>, last_modified: DateTime<Utc>, file_type: FileType) -> Self {
        Self {
            uri: uri.into(),
            last_modified,
            file_type,
        }
    }
}
