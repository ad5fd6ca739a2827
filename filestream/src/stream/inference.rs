use super::FileBasedStream;
use crate::discovery_policy::DiscoveryPolicy;
use crate::parsers::FileTypeParser;
use crate::remote_file::RemoteFile;
use crate::schema::{Schema, merge_schemas};
use crate::storage::StreamReader;
use common::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

/// Files inference will open: all of them, or the `max` most recently
/// modified when there are more. Ties keep listing order.
fn sample_files(files: &[RemoteFile], max: usize) -> Vec<&RemoteFile> {
    let mut sample: Vec<&RemoteFile> = files.iter().collect();
    if sample.len() > max {
        sample.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        sample.truncate(max);
        warn!(
            total_files = files.len(),
            sampled_files = max,
            "Refusing to infer schema for all files; using the most recently modified ones"
        );
    }
    sample
}

/// Infers one schema for `files` by merging per-file schemas.
///
/// At most `n_concurrent_requests` per-file inferences are unresolved at any
/// time; each completion frees a slot that is refilled before waiting again.
/// The first failure aborts the call with [`Error::SchemaInference`] naming
/// the file, and the remaining in-flight inferences are dropped.
pub async fn infer_schema<P>(
    files: &[RemoteFile],
    policy: &dyn DiscoveryPolicy,
    parser: &P,
    reader: &dyn StreamReader,
) -> Result<Schema>
where
    P: FileTypeParser + ?Sized,
{
    let sample = sample_files(files, policy.max_n_files_for_schema_inference());
    let concurrency = policy.n_concurrent_requests().max(1);

    let mut pending = sample.into_iter();
    let mut in_flight = FuturesUnordered::new();
    let mut schema = Schema::empty();

    loop {
        while in_flight.len() < concurrency {
            let Some(file) = pending.next() else {
                break;
            };
            in_flight.push(async move {
                parser
                    .infer_schema(file, reader)
                    .await
                    .map_err(|e| Error::schema_inference(&file.uri, e))
            });
        }

        match in_flight.next().await {
            Some(file_schema) => schema = merge_schemas(schema, file_schema?),
            None => break,
        }
    }

    debug!(fields = schema.len(), "Merged file schemas");
    Ok(schema)
}

impl FileBasedStream {
    /// Schema of the stream: the declared `input_schema` when there is one,
    /// otherwise inferred from the stream's files. Computed once per
    /// discovery session.
    pub async fn get_json_schema(&self) -> Result<&Schema> {
        self.schema_cache
            .get_or_try_init(|| self.compute_json_schema())
            .await
    }

    async fn compute_json_schema(&self) -> Result<Schema> {
        if let Some(schema) = &self.config.input_schema {
            debug!(stream = %self.name(), "Using declared input schema");
            return Ok(schema.clone());
        }

        let files = self.list_files().await?;
        info!(stream = %self.name(), files = files.len(), "Inferring schema");
        infer_schema(
            files,
            self.discovery_policy.as_ref(),
            &self.parser,
            self.reader.as_ref(),
        )
        .await
    }
}
