//! In-memory [`StreamReader`] that records how it is used, and a tracing
//! layer that counts warnings.

use crate::remote_file::{FileType, RemoteFile};
use crate::storage::StreamReader;
use crate::storage::glob::GlobMatcher;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use common::{Error, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub(crate) struct StubReader {
    file_type: FileType,
    files: Vec<RemoteFile>,
    // `None` marks a file whose open fails.
    contents: HashMap<String, Option<Bytes>>,
    list_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opened: Mutex<Vec<String>>,
}

impl StubReader {
    pub(crate) fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            files: Vec::new(),
            contents: HashMap::new(),
            list_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn push(mut self, name: &str, mtime_secs: i64, content: Option<Bytes>) -> Self {
        let uri = format!("stub://{}", name);
        let last_modified = Utc.timestamp_opt(mtime_secs, 0).unwrap();
        self.files
            .push(RemoteFile::new(uri.clone(), last_modified, self.file_type));
        self.contents.insert(uri, content);
        self
    }

    pub(crate) fn with_file(self, name: &str, mtime_secs: i64, content: impl AsRef<[u8]>) -> Self {
        self.push(name, mtime_secs, Some(Bytes::copy_from_slice(content.as_ref())))
    }

    pub(crate) fn with_failing_file(self, name: &str, mtime_secs: i64) -> Self {
        self.push(name, mtime_secs, None)
    }

    /// Every file, in insertion order.
    pub(crate) fn files(&self) -> &[RemoteFile] {
        &self.files
    }

    pub(crate) fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    /// URIs passed to `open_file`, in call order.
    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn name(file: &RemoteFile) -> &str {
        file.uri.trim_start_matches("stub://")
    }
}

#[async_trait]
impl StreamReader for StubReader {
    fn list_matching_files<'a>(
        &'a self,
        globs: &'a [String],
        _file_type: FileType,
        from_date: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<RemoteFile>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        let matcher = match GlobMatcher::new(globs) {
            Ok(matcher) => matcher,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };
        let files: Vec<RemoteFile> = self
            .files
            .iter()
            .filter(|f| matcher.is_match(Self::name(f)))
            .filter(|f| from_date.is_none_or(|start| f.last_modified >= start))
            .cloned()
            .collect();
        stream::iter(files.into_iter().map(Ok)).boxed()
    }

    async fn open_file(&self, file: &RemoteFile) -> Result<Bytes> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.opened.lock().unwrap().push(file.uri.clone());

        // Stay unresolved across a few polls so overlapping opens are visible.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.contents.get(&file.uri) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(Error::Storage(format!("Failed to open {}", file.uri))),
            None => Err(Error::Storage(format!("No such file: {}", file.uri))),
        }
    }
}

/// Counts WARN events while installed as the thread's default subscriber.
#[derive(Clone, Default)]
pub(crate) struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    /// Installs a counter until the returned guard is dropped.
    pub(crate) fn install() -> (Self, DefaultGuard) {
        let counter = Self::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        (counter, tracing::subscriber::set_default(subscriber))
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
