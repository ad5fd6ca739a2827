use super::glob::GlobMatcher;
use crate::remote_file::{FileType, RemoteFile};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use futures::future::ready;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use object_store::ObjectStore;
use object_store::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Lists and opens the files that back a stream.
#[async_trait]
pub trait StreamReader: Send + Sync {
    /// Files matching any of `globs`, modified at or after `from_date` when
    /// one is given. The order is stable for a fixed store state.
    fn list_matching_files<'a>(
        &'a self,
        globs: &'a [String],
        file_type: FileType,
        from_date: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<RemoteFile>>;

    /// Reads the full contents of a listed file.
    async fn open_file(&self, file: &RemoteFile) -> Result<Bytes>;
}

/// [`StreamReader`] over any `object_store` backend.
pub struct ObjectStoreReader {
    store: Arc<dyn ObjectStore>,
    uri_prefix: String,
}

impl ObjectStoreReader {
    pub fn new(store: Arc<dyn ObjectStore>, uri_prefix: impl Into<String>) -> Self {
        Self {
            store,
            uri_prefix: uri_prefix.into(),
        }
    }

    fn object_path(&self, file: &RemoteFile) -> Result<Path> {
        let key = file.uri.strip_prefix(&self.uri_prefix).ok_or_else(|| {
            Error::InvalidUri(format!(
                "{} does not belong to {}",
                file.uri, self.uri_prefix
            ))
        })?;
        Ok(Path::parse(key)?)
    }
}

#[async_trait]
impl StreamReader for ObjectStoreReader {
    fn list_matching_files<'a>(
        &'a self,
        globs: &'a [String],
        file_type: FileType,
        from_date: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<RemoteFile>> {
        let listing = async move {
            let matcher = GlobMatcher::new(globs)?;
            let prefix = matcher.prefix().map(Path::from);

            let mut files: Vec<RemoteFile> = self
                .store
                .list(prefix.as_ref())
                .map_err(Error::from)
                .try_filter_map(|meta| {
                    let key = meta.location.as_ref();
                    let in_scope = matcher.is_match(key)
                        && from_date.is_none_or(|start| meta.last_modified >= start);
                    ready(Ok(in_scope.then(|| {
                        RemoteFile::new(
                            format!("{}{}", self.uri_prefix, key),
                            meta.last_modified,
                            file_type,
                        )
                    })))
                })
                .try_collect()
                .await?;

            // Backends differ in listing order; sort so listings are stable.
            files.sort_by(|a, b| a.uri.cmp(&b.uri));
            debug!(
                globs = ?globs,
                from_date = ?from_date,
                matched = files.len(),
                "Listed matching files"
            );

            Ok::<_, Error>(stream::iter(files.into_iter().map(Ok)))
        };

        stream::once(listing).try_flatten().boxed()
    }

    async fn open_file(&self, file: &RemoteFile) -> Result<Bytes> {
        let path = self.object_path(file)?;
        let data = self.store.get(&path).await?.bytes().await?;
        debug!(uri = %file.uri, bytes = data.len(), "Opened file");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;
    use object_store::memory::InMemory;

    async fn reader_with(keys: &[&str]) -> ObjectStoreReader {
        let store = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(&Path::from(*key), PutPayload::from_static(b"{}"))
                .await
                .unwrap();
        }
        ObjectStoreReader::new(store, "memory:///")
    }

    #[tokio::test]
    async fn test_lists_only_matching_files_sorted() {
        let reader = reader_with(&["b/2.jsonl", "a/1.jsonl", "a/2.jsonl", "a/skip.csv"]).await;
        let globs = vec!["a/*.jsonl".to_string(), "b/*.jsonl".to_string()];

        let files: Vec<RemoteFile> = reader
            .list_matching_files(&globs, FileType::Jsonl, None)
            .try_collect()
            .await
            .unwrap();

        let uris: Vec<&str> = files.iter().map(|f| f.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec!["memory:///a/1.jsonl", "memory:///a/2.jsonl", "memory:///b/2.jsonl"]
        );
        assert!(files.iter().all(|f| f.file_type == FileType::Jsonl));
    }

    #[tokio::test]
    async fn test_from_date_filters_older_files() {
        let reader = reader_with(&["a/1.jsonl"]).await;
        let globs = vec!["a/*.jsonl".to_string()];
        let future = Utc::now() + chrono::Duration::days(1);

        let files: Vec<RemoteFile> = reader
            .list_matching_files(&globs, FileType::Jsonl, Some(future))
            .try_collect()
            .await
            .unwrap();

        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_open_file_round_trips_uri() {
        let reader = reader_with(&["dir/x.jsonl"]).await;
        let globs = vec!["dir/*.jsonl".to_string()];
        let files: Vec<RemoteFile> = reader
            .list_matching_files(&globs, FileType::Jsonl, None)
            .try_collect()
            .await
            .unwrap();

        let data = reader.open_file(&files[0]).await.unwrap();
        assert_eq!(&data[..], b"{}");
    }

    #[tokio::test]
    async fn test_open_foreign_uri_fails() {
        let reader = reader_with(&[]).await;
        let file = RemoteFile::new("s3://other/x.jsonl", Utc::now(), FileType::Jsonl);
        assert!(matches!(
            reader.open_file(&file).await,
            Err(Error::InvalidUri(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_globs_surface_in_stream() {
        let reader = reader_with(&[]).await;
        let globs: Vec<String> = Vec::new();
        let result: Result<Vec<RemoteFile>> = reader
            .list_matching_files(&globs, FileType::Jsonl, None)
            .try_collect()
            .await;
        assert!(matches!(result, Err(Error::ConfigValidation(_))));
    }
}
