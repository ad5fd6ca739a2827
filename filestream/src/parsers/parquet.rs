use super::FileTypeParser;
use crate::remote_file::RemoteFile;
use crate::schema::convert::arrow_type_to_primitive;
use crate::schema::{FieldType, Schema};
use crate::storage::StreamReader;
use crate::utils::arrow::batch_to_records;
use crate::{Record, RecordStream};
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use async_trait::async_trait;
use common::{Error, Result};
use futures::stream::{self, StreamExt};
use tracing::debug;

/// Parquet files, read through Arrow record batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetParser;

#[async_trait]
impl FileTypeParser for ParquetParser {
    async fn infer_schema(&self, file: &RemoteFile, reader: &dyn StreamReader) -> Result<Schema> {
        let data = reader.open_file(file).await?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;

        let schema = builder
            .schema()
            .fields()
            .iter()
            .fold(Schema::empty(), |schema, field| {
                schema.with_field(
                    field.name().clone(),
                    FieldType::primitive(arrow_type_to_primitive(field.data_type())),
                )
            });

        debug!(uri = %file.uri, fields = schema.len(), "Read Parquet schema");
        Ok(schema)
    }

    async fn parse_records(
        &self,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordStream> {
        let data = reader.open_file(file).await?;
        let batches = ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;

        // One batch is decoded at a time; its rows are emitted before the next.
        let records = batches.flat_map(|batch| {
            let decoded = batch
                .map_err(Error::from)
                .and_then(|batch| batch_to_records(&batch));
            match decoded {
                Ok(records) => records.into_iter().map(Ok).collect::<Vec<Result<Record>>>(),
                Err(e) => vec![Err(e)],
            }
        });

        Ok(stream::iter(records).boxed())
    }
}
