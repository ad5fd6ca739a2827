use super::{FileBasedStream, SyncCursor};
use crate::Record;
use crate::parsers::FileTypeParser;
use crate::remote_file::RemoteFile;
use crate::schema::Schema;
use crate::storage::StreamReader;
use crate::validation::{RecordVerdict, ValidationPolicy};
use common::{Error, Result};
use futures::future::ready;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

/// Ends `stream` right after its first error, without pulling further items.
fn fuse_on_error<'a, T>(
    stream: impl Stream<Item = Result<T>> + Send + 'a,
) -> impl Stream<Item = Result<T>> + Send + 'a
where
    T: Send + 'a,
{
    stream::unfold((stream.boxed(), false), |(mut inner, failed)| async move {
        if failed {
            return None;
        }
        let item = inner.next().await?;
        let failed = item.is_err();
        Some((item, (inner, failed)))
    })
}

/// Lazily reads the records of `files`, in file order and then parser order,
/// passing each through the validation gate.
///
/// Fails up front with [`Error::MissingSchema`] when no schema is given.
/// Records the policy rejects are dropped with a warning; under
/// [`ValidationPolicy::WaitForDiscover`] the first rejection ends the stream
/// with [`Error::StopSyncPerValidationPolicy`]. Any error ends the stream.
pub fn extract_records<'a, S, P>(
    files: S,
    schema: Option<&'a Schema>,
    policy: ValidationPolicy,
    parser: &'a P,
    reader: &'a dyn StreamReader,
    stream_name: &'a str,
) -> Result<BoxStream<'a, Result<Record>>>
where
    S: Stream<Item = Result<RemoteFile>> + Send + 'a,
    P: FileTypeParser + ?Sized,
{
    let schema = schema.ok_or_else(|| {
        Error::MissingSchema(format!(
            "Expected a JSON schema for stream '{}' but got none",
            stream_name
        ))
    })?;

    let records = files
        .and_then(move |file| async move {
            debug!(stream = %stream_name, uri = %file.uri, "Reading file");
            parser.parse_records(&file, reader).await
        })
        .try_flatten()
        .try_filter_map(move |record| {
            ready(match policy.evaluate(&record, schema) {
                RecordVerdict::Accept => Ok(Some(record)),
                RecordVerdict::Drop => {
                    warn!(
                        stream = %stream_name,
                        record = %serde_json::to_string(&record).unwrap_or_default(),
                        "Record does not conform to the schema; skipping"
                    );
                    Ok(None)
                }
                RecordVerdict::Halt => Err(Error::StopSyncPerValidationPolicy(format!(
                    "stream '{}' emitted a record that does not match the schema: {}",
                    stream_name,
                    serde_json::to_string(&record).unwrap_or_default()
                ))),
            })
        });

    Ok(fuse_on_error(records).boxed())
}

impl FileBasedStream {
    /// Records of `files`, validated against the configured catalog schema.
    pub fn read_records<'a, S>(&'a self, files: S) -> Result<BoxStream<'a, Result<Record>>>
    where
        S: Stream<Item = Result<RemoteFile>> + Send + 'a,
    {
        extract_records(
            files,
            self.catalog_schema.as_ref(),
            self.config.validation_policy,
            &self.parser,
            self.reader.as_ref(),
            self.name(),
        )
    }

    /// Records of every file in scope for `cursor`.
    pub fn read_records_for_sync(
        &self,
        cursor: &SyncCursor,
    ) -> Result<BoxStream<'_, Result<Record>>> {
        self.read_records(self.list_files_for_this_sync(cursor))
    }
}
