pub mod csv;
pub mod jsonl;
pub mod parquet;

pub use self::csv::CsvParser;
pub use self::jsonl::JsonlParser;
pub use self::parquet::ParquetParser;

use crate::RecordStream;
use crate::remote_file::{FileType, RemoteFile};
use crate::schema::Schema;
use crate::storage::StreamReader;
use crate::stream::config::FormatOptions;
use async_trait::async_trait;
use common::Result;

/// Upper bound on rows a parser reads from one file when inferring its schema.
pub const MAX_INFERENCE_ROWS: usize = 1000;

/// Per-encoding schema inference and record parsing.
#[async_trait]
pub trait FileTypeParser: Send + Sync {
    async fn infer_schema(&self, file: &RemoteFile, reader: &dyn StreamReader) -> Result<Schema>;

    /// Opens `file` and returns its records lazily. The returned stream owns
    /// the file contents, which are released when it is dropped.
    async fn parse_records(
        &self,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordStream>;
}

/// The closed set of supported parsers, selected from a stream's file type.
#[derive(Debug, Clone)]
pub enum FileParser {
    Csv(CsvParser),
    Jsonl(JsonlParser),
    Parquet(ParquetParser),
}

impl FileParser {
    pub fn for_file_type(file_type: FileType, format: &FormatOptions) -> Self {
        match file_type {
            FileType::Csv => FileParser::Csv(CsvParser::new(format.csv.clone())),
            FileType::Jsonl => FileParser::Jsonl(JsonlParser),
            FileType::Parquet => FileParser::Parquet(ParquetParser),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            FileParser::Csv(_) => FileType::Csv,
            FileParser::Jsonl(_) => FileType::Jsonl,
            FileParser::Parquet(_) => FileType::Parquet,
        }
    }
}

#[async_trait]
impl FileTypeParser for FileParser {
    async fn infer_schema(&self, file: &RemoteFile, reader: &dyn StreamReader) -> Result<Schema> {
        match self {
            FileParser::Csv(parser) => parser.infer_schema(file, reader).await,
            FileParser::Jsonl(parser) => parser.infer_schema(file, reader).await,
            FileParser::Parquet(parser) => parser.infer_schema(file, reader).await,
        }
    }

    async fn parse_records(
        &self,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordStream> {
        match self {
            FileParser::Csv(parser) => parser.parse_records(file, reader).await,
            FileParser::Jsonl(parser) => parser.parse_records(file, reader).await,
            FileParser::Parquet(parser) => parser.parse_records(file, reader).await,
        }
    }
}
