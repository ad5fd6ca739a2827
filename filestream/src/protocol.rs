use crate::Record;
use crate::source::{Catalog, StreamStatus};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// One line of CLI output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message<'a> {
    Record {
        stream: &'a str,
        data: &'a Record,
        emitted_at: i64,
    },
    State {
        stream: &'a str,
        state: Value,
    },
    Catalog {
        catalog: &'a Catalog,
    },
    ConnectionStatus {
        succeeded: bool,
        streams: &'a [StreamStatus],
    },
}

impl<'a> Message<'a> {
    pub fn record(stream: &'a str, data: &'a Record) -> Self {
        Message::Record {
            stream,
            data,
            emitted_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn connection_status(streams: &'a [StreamStatus]) -> Self {
        Message::ConnectionStatus {
            succeeded: streams.iter().all(|s| s.availability.available),
            streams,
        }
    }
}
