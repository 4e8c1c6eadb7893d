//! Server-sent event decoding for store change notifications.
//!
//! The realtime database streams blocks like:
//!
//! ```text
//! event: put
//! data: {"path":"/","data":{...}}
//!
//! event: keep-alive
//! data: null
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Data at `path` was replaced
    Put { path: String, data: Value },
    /// Children of `path` were updated
    Patch { path: String, data: Value },
    KeepAlive,
    /// Read permission lost
    Cancel,
    /// Credential expired
    AuthRevoked,
    /// Unrecognized event name
    Raw(String),
}

impl StreamEvent {
    /// Whether the event carries the whole document at the root
    pub fn is_root_put(&self) -> bool {
        matches!(self, StreamEvent::Put { path, .. } if path == "/")
    }
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

/// Incremental parser. Feed raw bytes as they arrive; complete events come
/// out once their terminating blank line is seen.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ParseError> {
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_block_end(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = std::str::from_utf8(&block)
                .map_err(|e| ParseError::InvalidFormat(format!("non UTF-8 event: {e}")))?;
            if let Some(event) = parse_event_block(text)? {
                events.push(event);
            }
        }
        Ok(events)
    }
}

fn find_block_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Parse one `event:`/`data:` block. Comment-only blocks yield `None`.
pub fn parse_event_block(block: &str) -> Result<Option<StreamEvent>, ParseError> {
    let mut name = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => name = Some(value),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    let Some(name) = name else {
        if data_lines.is_empty() {
            return Ok(None);
        }
        return Err(ParseError::MissingField("event".to_string()));
    };
    let data = data_lines.join("\n");

    let event = match name {
        "put" | "patch" => {
            if data.is_empty() {
                return Err(ParseError::MissingField(format!("{name} data")));
            }
            let PathData { path, data } = serde_json::from_str(&data)?;
            if name == "put" {
                StreamEvent::Put { path, data }
            } else {
                StreamEvent::Patch { path, data }
            }
        }
        "keep-alive" => StreamEvent::KeepAlive,
        "cancel" => StreamEvent::Cancel,
        "auth_revoked" => StreamEvent::AuthRevoked,
        other => StreamEvent::Raw(other.to_string()),
    };
    Ok(Some(event))
}
