use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub storage: StorageSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    /// Raw stream definitions; each one is validated when the stream is built.
    #[serde(default)]
    pub streams: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    S3,
    Local,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub kind: StorageKind,
    pub bucket: Option<String>,
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Root directory for the `local` store.
    pub root: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoverySettings {
    #[serde(default = "default_n_concurrent_requests")]
    pub n_concurrent_requests: usize,
    #[serde(default = "default_max_n_files_for_schema_inference")]
    pub max_n_files_for_schema_inference: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            n_concurrent_requests: default_n_concurrent_requests(),
            max_n_files_for_schema_inference: default_max_n_files_for_schema_inference(),
        }
    }
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_n_concurrent_requests() -> usize {
    10
}

fn default_max_n_files_for_schema_inference() -> usize {
    10
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            storage = ?settings.storage.kind,
            streams = settings.streams.len(),
            n_concurrent_requests = settings.discovery.n_concurrent_requests,
            max_files = settings.discovery.max_n_files_for_schema_inference,
            "Loaded settings"
        );

        Ok(settings)
    }
}
