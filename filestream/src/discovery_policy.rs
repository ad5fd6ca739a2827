use common::config::DiscoverySettings;
use common::{Error, Result};

/// Bounds on the work schema discovery may do.
pub trait DiscoveryPolicy: Send + Sync {
    /// Maximum number of per-file inferences in flight at once.
    fn n_concurrent_requests(&self) -> usize;

    /// Maximum number of files sampled for schema inference.
    fn max_n_files_for_schema_inference(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDiscoveryPolicy {
    n_concurrent_requests: usize,
    max_n_files_for_schema_inference: usize,
}

impl DefaultDiscoveryPolicy {
    pub const DEFAULT_N_CONCURRENT_REQUESTS: usize = 10;
    pub const DEFAULT_MAX_N_FILES_FOR_SCHEMA_INFERENCE: usize = 10;

    pub fn new(n_concurrent_requests: usize, max_n_files_for_schema_inference: usize) -> Result<Self> {
        if n_concurrent_requests == 0 {
            return Err(Error::ConfigValidation(
                "n_concurrent_requests must be at least 1".into(),
            ));
        }
        if max_n_files_for_schema_inference == 0 {
            return Err(Error::ConfigValidation(
                "max_n_files_for_schema_inference must be at least 1".into(),
            ));
        }
        Ok(Self {
            n_concurrent_requests,
            max_n_files_for_schema_inference,
        })
    }

    pub fn from_settings(settings: &DiscoverySettings) -> Result<Self> {
        Self::new(
            settings.n_concurrent_requests,
            settings.max_n_files_for_schema_inference,
        )
    }
}

impl Default for DefaultDiscoveryPolicy {
    fn default() -> Self {
        Self {
            n_concurrent_requests: Self::DEFAULT_N_CONCURRENT_REQUESTS,
            max_n_files_for_schema_inference: Self::DEFAULT_MAX_N_FILES_FOR_SCHEMA_INFERENCE,
        }
    }
}

impl DiscoveryPolicy for DefaultDiscoveryPolicy {
    fn n_concurrent_requests(&self) -> usize {
        self.n_concurrent_requests
    }

    fn max_n_files_for_schema_inference(&self) -> usize {
        self.max_n_files_for_schema_inference
    }
}
