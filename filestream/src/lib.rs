pub mod discovery_policy;
pub mod parsers;
pub mod protocol;
pub mod remote_file;
pub mod schema;
pub mod source;
pub mod storage;
pub mod stream;
pub mod utils;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use common::config::Settings;
use common::{Error, Result};
use futures::stream::BoxStream;
use protocol::Message;
use serde_json::{Map, Value};
use source::{Catalog, FileBasedSource};
use std::io::Write;
use stream::SyncCursor;
use tracing::info;

/// One row read from a file: field name to JSON value.
pub type Record = Map<String, Value>;

/// Lazily parsed records of one file.
pub type RecordStream = BoxStream<'static, Result<Record>>;

fn write_message<W: Write>(out: &mut W, message: &Message<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, message)?;
    writeln!(out)?;
    Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Probes every configured stream and writes a connection status message.
/// Returns whether all streams are available.
pub async fn run_check<W: Write>(config_path: &str, out: &mut W) -> Result<bool> {
    let settings = Settings::new(config_path)?;
    let source = FileBasedSource::from_settings(&settings)?;

    let statuses = source.check().await;
    let message = Message::connection_status(&statuses);
    write_message(out, &message)?;
    Ok(matches!(message, Message::ConnectionStatus { succeeded: true, .. }))
}

/// Infers the schema of every configured stream and writes the catalog.
pub async fn run_discover<W: Write>(config_path: &str, out: &mut W) -> Result<Catalog> {
    let settings = Settings::new(config_path)?;
    let source = FileBasedSource::from_settings(&settings)?;

    let catalog = source.discover().await?;
    write_message(out, &Message::Catalog { catalog: &catalog })?;
    Ok(catalog)
}

/// Syncs the streams of a catalog (discovered when not given), writing
/// record messages followed by one state message per stream.
///
/// `state_path` holds a JSON object mapping stream names to their state.
pub async fn run_read<W: Write>(
    config_path: &str,
    catalog_path: Option<&str>,
    state_path: Option<&str>,
    only_stream: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let settings = Settings::new(config_path)?;
    let mut source = FileBasedSource::from_settings(&settings)?;

    let catalog: Catalog = match catalog_path {
        Some(path) => read_json_file(path)?,
        None => source.discover().await?,
    };
    source.apply_catalog(&catalog)?;

    let state: Map<String, Value> = match state_path {
        Some(path) => read_json_file(path)?,
        None => Map::new(),
    };

    if let Some(name) = only_stream {
        if !catalog.streams.iter().any(|entry| entry.name == name) {
            return Err(Error::InvalidInput(format!(
                "Stream '{}' is not in the catalog",
                name
            )));
        }
    }

    for entry in &catalog.streams {
        let name = entry.name.as_str();
        if only_stream.is_some_and(|only| only != name) {
            continue;
        }

        let cursor = SyncCursor::from_state(state.get(name))?;
        info!(stream = %name, start = ?cursor.start(), "Starting sync");

        let next = source
            .read_stream(name, cursor, |record| {
                write_message(out, &Message::record(name, &record))
            })
            .await?;

        write_message(
            out,
            &Message::State {
                stream: name,
                state: next.to_state(),
            },
        )?;
    }

    Ok(())
}
