use crate::remote_file::RemoteFile;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lower bound on file modification time for an incremental sync.
///
/// Files modified at or after `start` are in scope; without a start every
/// matching file is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<DateTime<Utc>>,
}

impl SyncCursor {
    pub fn new(start: Option<DateTime<Utc>>) -> Self {
        Self { start }
    }

    pub fn full_refresh() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Reads the cursor out of a stream state value (`{"start": "<RFC3339>"}`).
    /// A missing or null state means a full resync.
    pub fn from_state(state: Option<&Value>) -> Result<Self> {
        match state {
            None | Some(Value::Null) => Ok(Self::full_refresh()),
            Some(state) => serde_json::from_value(state.clone())
                .map_err(|e| Error::InvalidInput(format!("Invalid stream state {}: {}", state, e))),
        }
    }

    pub fn to_state(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Cursor after a sync that read `files`: the latest modification time
    /// seen, never moving backwards. Files at exactly that instant are read
    /// again by the next sync.
    pub fn advance<'a>(&self, files: impl IntoIterator<Item = &'a RemoteFile>) -> Self {
        let latest = files.into_iter().map(|f| f.last_modified).max();
        Self {
            start: match (self.start, latest) {
                (Some(start), Some(latest)) => Some(start.max(latest)),
                (start, latest) => start.or(latest),
            },
        }
    }
}
