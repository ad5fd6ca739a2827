pub mod glob;
pub mod reader;

pub use reader::{ObjectStoreReader, StreamReader};

use common::config::{StorageKind, StorageSettings};
use common::{Error, Result};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Builds the object store a source reads its files from.
#[derive(Clone)]
pub struct StoreManager {
    pub settings: StorageSettings,
}

impl StoreManager {
    pub fn new(settings: StorageSettings) -> Self {
        Self { settings }
    }

    pub fn build_reader(&self) -> Result<ObjectStoreReader> {
        let store = self.get_object_store()?;
        Ok(ObjectStoreReader::new(store, self.uri_scheme()?))
    }

    pub fn get_object_store(&self) -> Result<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = match self.settings.kind {
            StorageKind::S3 => {
                let bucket = self.bucket()?;
                // Validate early so a typo fails before the first request.
                Url::parse(&self.settings.endpoint)?;

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(&self.settings.region)
                    .with_endpoint(&self.settings.endpoint)
                    .with_allow_http(self.settings.endpoint.starts_with("http://"));

                if let (Some(access_key), Some(secret_key)) =
                    (&self.settings.access_key, &self.settings.secret_key)
                {
                    builder = builder
                        .with_access_key_id(access_key)
                        .with_secret_access_key(secret_key);
                }

                Arc::new(builder.build()?)
            }
            StorageKind::Local => {
                let root = self.settings.root.as_deref().ok_or_else(|| {
                    Error::InvalidInput("storage.root is required for local storage".into())
                })?;
                Arc::new(LocalFileSystem::new_with_prefix(root)?)
            }
            StorageKind::Memory => Arc::new(InMemory::new()),
        };

        info!(kind = ?self.settings.kind, "Initialized object store");
        Ok(store)
    }

    /// Prefix used to render object keys as URIs.
    fn uri_scheme(&self) -> Result<String> {
        Ok(match self.settings.kind {
            StorageKind::S3 => format!("s3://{}/", self.bucket()?),
            StorageKind::Local => {
                let root = self.settings.root.as_deref().unwrap_or_default();
                format!("file://{}/", root.trim_end_matches('/'))
            }
            StorageKind::Memory => "memory:///".to_string(),
        })
    }

    fn bucket(&self) -> Result<&str> {
        self.settings
            .bucket
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("storage.bucket is required for s3 storage".into()))
    }
}
