use super::{FileTypeParser, MAX_INFERENCE_ROWS};
use crate::remote_file::RemoteFile;
use crate::schema::{PrimitiveType, Schema, value_type};
use crate::storage::StreamReader;
use crate::stream::config::CsvFormat;
use crate::{Record, RecordStream};
use ::csv::{ReaderBuilder, StringRecord};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use common::Result;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    format: CsvFormat,
}

impl CsvParser {
    pub fn new(format: CsvFormat) -> Self {
        Self { format }
    }

    fn reader(&self, data: Bytes) -> ::csv::Reader<bytes::buf::Reader<Bytes>> {
        ReaderBuilder::new()
            .delimiter(self.format.delimiter as u8)
            .quote(self.format.quote_char as u8)
            .double_quote(self.format.double_quote)
            .has_headers(true)
            .from_reader(data.reader())
    }
}

/// Types a raw cell: empty is null, then integer, number, boolean, string.
fn typed_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match cell {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

fn to_record(headers: &StringRecord, row: &StringRecord) -> Record {
    headers
        .iter()
        .zip(row.iter())
        .map(|(name, cell)| (name.to_string(), typed_cell(cell)))
        .collect()
}

#[async_trait]
impl FileTypeParser for CsvParser {
    async fn infer_schema(&self, file: &RemoteFile, reader: &dyn StreamReader) -> Result<Schema> {
        let data = reader.open_file(file).await?;
        let mut csv_reader = self.reader(data);
        let headers = csv_reader.headers()?.clone();

        let mut schema = Schema::empty();
        let mut rows = 0;
        for row in csv_reader.records().take(MAX_INFERENCE_ROWS) {
            let row = row?;
            for (name, cell) in headers.iter().zip(row.iter()) {
                if let Some(tag) = value_type(&typed_cell(cell)) {
                    schema.observe(name, tag);
                }
            }
            rows += 1;
        }

        // Columns that were empty in every sampled row default to string.
        for name in headers.iter() {
            if !schema.contains_field(name) {
                schema.observe(name, PrimitiveType::String);
            }
        }

        debug!(uri = %file.uri, rows, columns = headers.len(), "Inferred CSV schema");
        Ok(schema)
    }

    async fn parse_records(
        &self,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordStream> {
        let data = reader.open_file(file).await?;
        let mut csv_reader = self.reader(data);
        let headers = csv_reader.headers()?.clone();

        let records = csv_reader
            .into_records()
            .map(move |row| -> Result<Record> { Ok(to_record(&headers, &row?)) });

        Ok(stream::iter(records).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_file::FileType;
    use crate::schema::FieldType;
    use crate::testing::StubReader;
    use futures::TryStreamExt;
    use serde_json::json;

    fn reader(content: &str) -> (StubReader, RemoteFile) {
        let reader = StubReader::new(FileType::Csv).with_file("a.csv", 0, content);
        let file = reader.files()[0].clone();
        (reader, file)
    }

    #[test]
    fn test_typed_cell() {
        assert_eq!(typed_cell(""), Value::Null);
        assert_eq!(typed_cell("42"), json!(42));
        assert_eq!(typed_cell("4.5"), json!(4.5));
        assert_eq!(typed_cell("true"), json!(true));
        assert_eq!(typed_cell("NaN"), json!("NaN"));
        assert_eq!(typed_cell("abc"), json!("abc"));
    }

    #[tokio::test]
    async fn test_infer_schema_unions_cell_types() {
        let (reader, file) = reader("id,name,score,note\n1,a,1.5,\nx,b,2,\n");
        let schema = CsvParser::default()
            .infer_schema(&file, &reader)
            .await
            .unwrap();

        assert_eq!(
            schema.get("id"),
            FieldType::from_tags([PrimitiveType::Integer, PrimitiveType::String]).as_ref()
        );
        assert_eq!(
            schema.get("name"),
            Some(&FieldType::primitive(PrimitiveType::String))
        );
        assert_eq!(
            schema.get("score"),
            FieldType::from_tags([PrimitiveType::Number, PrimitiveType::Integer]).as_ref()
        );
        assert_eq!(
            schema.get("note"),
            Some(&FieldType::primitive(PrimitiveType::String))
        );
    }

    #[tokio::test]
    async fn test_parse_records_with_custom_delimiter() {
        let (reader, file) = reader("id;name\n1;\"a;b\"\n2;c\n");
        let parser = CsvParser::new(CsvFormat {
            delimiter: ';',
            ..CsvFormat::default()
        });

        let records: Vec<Record> = parser
            .parse_records(&file, &reader)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(Value::Object(records[0].clone()), json!({"id": 1, "name": "a;b"}));
        assert_eq!(Value::Object(records[1].clone()), json!({"id": 2, "name": "c"}));
    }

    #[tokio::test]
    async fn test_ragged_row_is_an_error() {
        let (reader, file) = reader("a,b\n1\n");
        let result: Result<Vec<Record>> = CsvParser::default()
            .parse_records(&file, &reader)
            .await
            .unwrap()
            .try_collect()
            .await;
        assert!(result.is_err());
    }
}
