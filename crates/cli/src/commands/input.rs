//! NDJSON record input.

use anyhow::{anyhow, Context, Result};
use contracts::{Record, Transport};
use dispatcher::Dispatcher;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Counters for one pass over the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputStats {
    pub lines: u64,
    pub submitted: u64,
    pub skipped: u64,
}

/// Parse one line into a record
///
/// The line must be a JSON object with an `id` and, unless `default_key` is
/// given, a `collection` (or `key`). Attributes go under `properties`.
pub fn parse_line(line: &str, default_key: Option<&str>) -> Result<Record> {
    let mut value: Value = serde_json::from_str(line).context("invalid JSON")?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("record must be a JSON object"))?;

    if !object.contains_key("collection") && !object.contains_key("key") {
        let key = default_key.ok_or_else(|| anyhow!("record has no collection"))?;
        object.insert("collection".to_string(), Value::String(key.to_string()));
    }

    serde_json::from_value(value).context("invalid record")
}

/// Submit every record read from `reader`, skipping malformed lines
///
/// `stats` is updated as lines are read so a caller that stops early still
/// sees what was done.
pub async fn submit_lines<R, T>(
    dispatcher: &Dispatcher<T>,
    reader: R,
    default_key: Option<&str>,
    stats: &mut InputStats,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    T: Transport + Sync + 'static,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line, default_key) {
            Ok(record) => {
                dispatcher.submit(record);
                stats.submitted += 1;
            }
            Err(e) => {
                warn!(line = stats.lines, error = %format!("{e:#}"), "Skipping malformed record");
                stats.skipped += 1;
            }
        }

        if stats.lines % 10_000 == 0 {
            debug!(lines = stats.lines, "Input progress");
        }
    }
    Ok(())
}
