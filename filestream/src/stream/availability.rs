use super::{FileBasedStream, SyncCursor};
use crate::parsers::FileTypeParser;
use common::{Error, Result};
use futures::TryStreamExt;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of probing whether a stream can be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Availability {
    fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

impl FileBasedStream {
    /// Lists the stream's files and parses the first record of the first one.
    pub async fn check_availability(&self) -> Availability {
        match self.probe().await {
            Ok(availability) => availability,
            Err(e) => {
                warn!(stream = %self.name(), error = %e, "Stream is not available");
                Availability::unavailable(e.to_string())
            }
        }
    }

    async fn probe(&self) -> Result<Availability> {
        let mut files = self.list_files_for_this_sync(&SyncCursor::full_refresh());
        let Some(file) = files.try_next().await? else {
            return Ok(Availability::unavailable(format!(
                "No files were identified for stream '{}' with globs {:?}",
                self.name(),
                self.config.globs
            )));
        };

        let mut records = self
            .parser
            .parse_records(&file, self.reader.as_ref())
            .await
            .map_err(|e| {
                Error::InvalidInput(format!("Unable to open {}: {}", file.uri, e))
            })?;
        records.try_next().await.map_err(|e| {
            Error::InvalidInput(format!("Unable to parse {}: {}", file.uri, e))
        })?;

        info!(stream = %self.name(), uri = %file.uri, "Stream is available");
        Ok(Availability::available())
    }
}
