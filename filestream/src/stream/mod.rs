pub mod availability;
pub mod config;
pub mod cursor;
pub mod extraction;
pub mod inference;

pub use config::{PrimaryKey, StreamConfig};
pub use cursor::SyncCursor;

use crate::discovery_policy::DiscoveryPolicy;
use crate::parsers::FileParser;
use crate::remote_file::RemoteFile;
use crate::schema::Schema;
use crate::storage::StreamReader;
use common::Result;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A stream backed by the files matching its globs.
///
/// Inferred schemas and the discovery file listing are cached for the
/// lifetime of one discovery session; call
/// [`reset_discovery_session`](Self::reset_discovery_session) to recompute.
pub struct FileBasedStream {
    pub config: StreamConfig,
    parser: FileParser,
    reader: Arc<dyn StreamReader>,
    discovery_policy: Arc<dyn DiscoveryPolicy>,
    catalog_schema: Option<Schema>,
    schema_cache: OnceCell<Schema>,
    files_cache: OnceCell<Vec<RemoteFile>>,
}

impl FileBasedStream {
    pub fn new(
        raw_config: Value,
        reader: Arc<dyn StreamReader>,
        discovery_policy: Arc<dyn DiscoveryPolicy>,
    ) -> Result<Self> {
        let config = StreamConfig::from_raw(raw_config)?;
        Ok(Self::from_config(config, reader, discovery_policy))
    }

    pub fn from_config(
        config: StreamConfig,
        reader: Arc<dyn StreamReader>,
        discovery_policy: Arc<dyn DiscoveryPolicy>,
    ) -> Self {
        let parser = FileParser::for_file_type(config.file_type, &config.format);
        Self {
            config,
            parser,
            reader,
            discovery_policy,
            catalog_schema: None,
            schema_cache: OnceCell::new(),
            files_cache: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.config.primary_key.as_ref()
    }

    /// Schema from the configured catalog, used to validate records on read.
    pub fn with_catalog_schema(mut self, schema: Schema) -> Self {
        self.catalog_schema = Some(schema);
        self
    }

    pub fn set_catalog_schema(&mut self, schema: Option<Schema>) {
        self.catalog_schema = schema;
    }

    pub fn catalog_schema(&self) -> Option<&Schema> {
        self.catalog_schema.as_ref()
    }

    pub fn reset_discovery_session(&mut self) {
        self.schema_cache.take();
        self.files_cache.take();
    }

    /// Every file belonging to the stream, listed once per discovery session.
    pub async fn list_files(&self) -> Result<&[RemoteFile]> {
        let files = self
            .files_cache
            .get_or_try_init(|| {
                self.reader
                    .list_matching_files(&self.config.globs, self.config.file_type, None)
                    .try_collect()
            })
            .await?;
        Ok(files.as_slice())
    }

    /// Files read by a sync starting at `cursor`.
    pub fn list_files_for_this_sync(
        &self,
        cursor: &SyncCursor,
    ) -> BoxStream<'_, Result<RemoteFile>> {
        self.reader
            .list_matching_files(&self.config.globs, self.config.file_type, cursor.start())
    }
}
