use super::{FileTypeParser, MAX_INFERENCE_ROWS};
use crate::remote_file::RemoteFile;
use crate::schema::convert::record_schema;
use crate::schema::{Schema, merge_schemas};
use crate::storage::StreamReader;
use crate::{Record, RecordStream};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use common::{Error, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::io::BufRead;
use tracing::debug;

/// JSON Lines: one JSON object per non-blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlParser;

fn parse_line(uri: &str, line_no: usize, line: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(Error::InvalidInput(format!(
            "{}: line {} is not a JSON object: {}",
            uri, line_no, other
        ))),
        Err(e) => Err(Error::InvalidInput(format!(
            "{}: line {} is not valid JSON: {}",
            uri, line_no, e
        ))),
    }
}

/// Non-blank lines with their 1-based line numbers.
fn lines(data: Bytes) -> impl Iterator<Item = (usize, std::io::Result<String>)> + Send {
    data.reader()
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
}

#[async_trait]
impl FileTypeParser for JsonlParser {
    async fn infer_schema(&self, file: &RemoteFile, reader: &dyn StreamReader) -> Result<Schema> {
        let data = reader.open_file(file).await?;

        let mut schema = Schema::empty();
        let mut rows = 0;
        for (line_no, line) in lines(data).take(MAX_INFERENCE_ROWS) {
            let record = parse_line(&file.uri, line_no, &line?)?;
            schema = merge_schemas(schema, record_schema(&record));
            rows += 1;
        }

        debug!(uri = %file.uri, rows, fields = schema.len(), "Inferred JSONL schema");
        Ok(schema)
    }

    async fn parse_records(
        &self,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordStream> {
        let data = reader.open_file(file).await?;
        let uri = file.uri.clone();

        let records = lines(data)
            .map(move |(line_no, line)| -> Result<Record> { parse_line(&uri, line_no, &line?) });

        Ok(stream::iter(records).boxed())
    }
}
