use crate::Record;
use crate::discovery_policy::{DefaultDiscoveryPolicy, DiscoveryPolicy};
use crate::schema::Schema;
use crate::storage::{StoreManager, StreamReader};
use crate::stream::availability::Availability;
use crate::stream::{FileBasedStream, PrimaryKey, SyncCursor};
use common::config::Settings;
use common::{Error, Result};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Discovered (or configured) shape of one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStream {
    pub name: String,
    pub json_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub stream: String,
    #[serde(flatten)]
    pub availability: Availability,
}

/// All streams configured over one store.
pub struct FileBasedSource {
    streams: Vec<FileBasedStream>,
}

impl FileBasedSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let reader: Arc<dyn StreamReader> =
            Arc::new(StoreManager::new(settings.storage.clone()).build_reader()?);
        let policy: Arc<dyn DiscoveryPolicy> =
            Arc::new(DefaultDiscoveryPolicy::from_settings(&settings.discovery)?);
        Self::new(&settings.streams, reader, policy)
    }

    pub fn new(
        raw_streams: &[Value],
        reader: Arc<dyn StreamReader>,
        discovery_policy: Arc<dyn DiscoveryPolicy>,
    ) -> Result<Self> {
        let mut names = HashSet::new();
        let mut streams = Vec::with_capacity(raw_streams.len());
        for raw in raw_streams {
            let stream =
                FileBasedStream::new(raw.clone(), reader.clone(), discovery_policy.clone())?;
            if !names.insert(stream.name().to_string()) {
                return Err(Error::ConfigValidation(format!(
                    "Duplicate stream name '{}'",
                    stream.name()
                )));
            }
            streams.push(stream);
        }
        info!(streams = streams.len(), "Configured file-based source");
        Ok(Self { streams })
    }

    pub fn streams(&self) -> &[FileBasedStream] {
        &self.streams
    }

    pub fn stream(&self, name: &str) -> Option<&FileBasedStream> {
        self.streams.iter().find(|s| s.name() == name)
    }

    /// Availability of every stream; the source is usable when all are.
    pub async fn check(&self) -> Vec<StreamStatus> {
        let mut statuses = Vec::with_capacity(self.streams.len());
        for stream in &self.streams {
            statuses.push(StreamStatus {
                stream: stream.name().to_string(),
                availability: stream.check_availability().await,
            });
        }
        statuses
    }

    pub async fn discover(&self) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        for stream in &self.streams {
            let schema = stream.get_json_schema().await?;
            info!(stream = %stream.name(), fields = schema.len(), "Discovered stream");
            catalog.streams.push(CatalogStream {
                name: stream.name().to_string(),
                json_schema: schema.to_json_schema(),
                primary_key: stream.primary_key().cloned(),
            });
        }
        Ok(catalog)
    }

    /// Uses the schemas of a configured catalog to validate records on read.
    /// Streams the catalog does not mention are left without a schema.
    pub fn apply_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        for stream in &mut self.streams {
            let schema = catalog
                .streams
                .iter()
                .find(|entry| entry.name == stream.name())
                .map(|entry| Schema::from_json_schema(&entry.json_schema))
                .transpose()?;
            stream.set_catalog_schema(schema);
        }
        Ok(())
    }

    /// Syncs one stream from `cursor`, handing every record to `emit`.
    /// Returns the cursor for the next sync.
    pub async fn read_stream<F>(
        &self,
        name: &str,
        cursor: SyncCursor,
        mut emit: F,
    ) -> Result<SyncCursor>
    where
        F: FnMut(Record) -> Result<()>,
    {
        let stream = self
            .stream(name)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown stream '{}'", name)))?;

        // The cursor follows the files as the listing hands them to extraction.
        let mut next = cursor;
        let mut files = 0usize;
        let listing = stream
            .list_files_for_this_sync(&cursor)
            .inspect_ok(|file| {
                next = next.advance([file]);
                files += 1;
            });
        let mut records = stream.read_records(listing)?;

        let mut count = 0usize;
        while let Some(record) = records.try_next().await? {
            emit(record)?;
            count += 1;
        }
        drop(records);

        info!(stream = %name, files, records = count, "Finished reading stream");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_file::FileType;
    use crate::storage::ObjectStoreReader;
    use crate::testing::StubReader;
    use chrono::{TimeZone, Utc};
    use common::config::{DiscoverySettings, StorageKind, StorageSettings};
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectStore, PutPayload};
    use serde_json::json;

    async fn memory_source(files: &[(&str, &'static str)], streams: Vec<Value>) -> FileBasedSource {
        let store = Arc::new(InMemory::new());
        for &(key, content) in files {
            store
                .put(&Path::from(key), PutPayload::from_static(content.as_bytes()))
                .await
                .unwrap();
        }
        FileBasedSource::new(
            &streams,
            Arc::new(ObjectStoreReader::new(store, "memory:///")),
            Arc::new(DefaultDiscoveryPolicy::default()),
        )
        .unwrap()
    }

    fn orders() -> Value {
        json!({
            "name": "orders",
            "file_type": "jsonl",
            "globs": ["orders/*.jsonl"],
            "primary_key": "id",
            "validation_policy": "Skip Record",
        })
    }

    #[tokio::test]
    async fn test_rejects_duplicate_stream_names() {
        let result = FileBasedSource::new(
            &[orders(), orders()],
            Arc::new(ObjectStoreReader::new(Arc::new(InMemory::new()), "memory:///")),
            Arc::new(DefaultDiscoveryPolicy::default()),
        );
        assert!(matches!(result, Err(Error::ConfigValidation(_))));
    }

    #[tokio::test]
    async fn test_discover_then_read_round() {
        let mut source = memory_source(
            &[
                ("orders/1.jsonl", "{\"id\": 1, \"total\": 9.5}\n"),
                ("orders/2.jsonl", "{\"id\": 2, \"note\": \"gift\"}\n"),
            ],
            vec![orders()],
        )
        .await;

        let catalog = source.discover().await.unwrap();
        assert_eq!(catalog.streams.len(), 1);
        assert_eq!(
            catalog.streams[0].json_schema,
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "note": {"type": "string"},
                    "total": {"type": "number"},
                }
            })
        );
        assert_eq!(catalog.streams[0].primary_key, Some(PrimaryKey::Single("id".into())));

        source.apply_catalog(&catalog).unwrap();
        let mut records = Vec::new();
        let cursor = source
            .read_stream("orders", SyncCursor::full_refresh(), |record| {
                records.push(Value::Object(record));
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![json!({"id": 1, "total": 9.5}), json!({"id": 2, "note": "gift"})]
        );
        let start = cursor.start().unwrap();
        assert!(start <= Utc::now());

        // Next sync starts from the newest file, which is read again.
        let mut again = 0;
        source
            .read_stream("orders", cursor, |_| {
                again += 1;
                Ok(())
            })
            .await
            .unwrap();
        assert!(again >= 1);
    }

    fn stub_source(reader: StubReader) -> (FileBasedSource, Arc<StubReader>) {
        let reader = Arc::new(reader);
        let mut source = FileBasedSource::new(
            &[json!({"name": "events", "file_type": "jsonl", "globs": ["*.jsonl"]})],
            reader.clone(),
            Arc::new(DefaultDiscoveryPolicy::default()),
        )
        .unwrap();
        source
            .apply_catalog(&Catalog {
                streams: vec![CatalogStream {
                    name: "events".into(),
                    json_schema: json!({"type": "object", "properties": {"n": {"type": "integer"}}}),
                    primary_key: None,
                }],
            })
            .unwrap();
        (source, reader)
    }

    #[tokio::test]
    async fn test_cursor_follows_newest_file_read() {
        let (source, _) = stub_source(
            StubReader::new(FileType::Jsonl)
                .with_file("a.jsonl", 10, "{\"n\": 1}\n")
                .with_file("c.jsonl", 30, "{\"n\": 3}\n")
                .with_file("b.jsonl", 20, "{\"n\": 2}\n"),
        );

        let mut seen = Vec::new();
        let cursor = source
            .read_stream("events", SyncCursor::full_refresh(), |record| {
                seen.push(record["n"].clone());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![json!(1), json!(3), json!(2)]);
        assert_eq!(cursor.start(), Some(Utc.timestamp_opt(30, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_emit_failure_stops_before_next_file() {
        let (source, reader) = stub_source(
            StubReader::new(FileType::Jsonl)
                .with_file("a.jsonl", 10, "{\"n\": 1}\n{\"n\": 2}\n")
                .with_file("b.jsonl", 20, "{\"n\": 3}\n"),
        );

        let result = source
            .read_stream("events", SyncCursor::full_refresh(), |_| {
                Err(Error::Other("sink closed".into()))
            })
            .await;

        assert!(matches!(result, Err(Error::Other(_))));
        assert_eq!(reader.opened(), vec!["stub://a.jsonl"]);
    }

    #[tokio::test]
    async fn test_read_without_catalog_is_missing_schema() {
        let source = memory_source(&[("orders/1.jsonl", "{\"id\": 1}\n")], vec![orders()]).await;

        let result = source
            .read_stream("orders", SyncCursor::full_refresh(), |_| Ok(()))
            .await;
        assert!(matches!(result, Err(Error::MissingSchema(_))));
    }

    #[tokio::test]
    async fn test_unknown_stream() {
        let source = memory_source(&[], vec![orders()]).await;
        let result = source
            .read_stream("customers", SyncCursor::full_refresh(), |_| Ok(()))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_check_reports_each_stream() {
        let source = memory_source(
            &[("orders/1.jsonl", "{\"id\": 1}\n")],
            vec![
                orders(),
                json!({"name": "empty", "file_type": "csv", "globs": ["nothing/*.csv"]}),
            ],
        )
        .await;

        let statuses = source.check().await;
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].availability.available);
        assert!(!statuses[1].availability.available);
        assert_eq!(
            serde_json::to_value(&statuses[0]).unwrap(),
            json!({"stream": "orders", "available": true})
        );
    }

    #[tokio::test]
    async fn test_local_filesystem_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/a.csv"), "id,name\n1,ada\n2,\n").unwrap();

        let settings = Settings {
            storage: StorageSettings {
                kind: StorageKind::Local,
                bucket: None,
                endpoint: String::new(),
                region: String::new(),
                access_key: None,
                secret_key: None,
                root: Some(dir.path().to_string_lossy().into_owned()),
            },
            discovery: DiscoverySettings::default(),
            streams: vec![json!({"name": "people", "file_type": "csv", "globs": ["data/*.csv"]})],
        };
        let mut source = FileBasedSource::from_settings(&settings).unwrap();

        let catalog = source.discover().await.unwrap();
        assert_eq!(
            catalog.streams[0].json_schema["properties"],
            json!({"id": {"type": "integer"}, "name": {"type": "string"}})
        );

        source.apply_catalog(&catalog).unwrap();
        let mut records = Vec::new();
        source
            .read_stream("people", SyncCursor::full_refresh(), |record| {
                records.push(Value::Object(record));
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(
            records,
            vec![json!({"id": 1, "name": "ada"}), json!({"id": 2, "name": null})]
        );
    }
}
