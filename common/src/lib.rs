use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;
use url::ParseError;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid stream configuration: {0}")]
    ConfigValidation(String),

    #[error("Missing schema: {0}")]
    MissingSchema(String),

    #[error("Error inferring schema for file: {uri}")]
    SchemaInference {
        uri: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Stopping sync in accordance with the configured validation policy: {0}")]
    StopSyncPerValidationPolicy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid Uri: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps a per-file failure so the caller can see which file broke inference.
    pub fn schema_inference(uri: impl Into<String>, source: Error) -> Self {
        Error::SchemaInference {
            uri: uri.into(),
            source: Box::new(source),
        }
    }

    /// URI of the offending file, if this error came out of schema inference.
    pub fn failed_file(&self) -> Option<&str> {
        match self {
            Error::SchemaInference { uri, .. } => Some(uri),
            _ => None,
        }
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        Error::Storage(format!("Object store error: {}", err))
    }
}

impl From<object_store::path::Error> for Error {
    fn from(err: object_store::path::Error) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::ConfigValidation(format!("Invalid glob pattern: {}", err))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidInput(format!("URL parse error: {}", err))
    }
}
