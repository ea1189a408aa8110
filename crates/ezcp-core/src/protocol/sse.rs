//! Server-Sent-Events wire format.
//!
//! ```text
//! event: snapshot\n
//! data: {"text":"...","size":N,"updatedAt":"..."}\n
//! \n
//! ```
//!
//! Heartbeats are SSE comment lines (`: ping\n\n`), ignored by `EventSource`
//! but enough to keep idle intermediaries from timing out the stream.

use crate::domain::snapshot::SnapshotPayload;
use crate::protocol::response::CORS_HEADERS;

/// Event name used for snapshot frames.
pub const SNAPSHOT_EVENT: &str = "snapshot";

/// Comment frame written on every heartbeat tick.
pub const HEARTBEAT_FRAME: &str = ": ping\n\n";

/// Response head that upgrades a `GET /events` request to a stream.
///
/// There is no `Content-Length` and the connection stays open.
pub fn event_stream_head() -> Vec<u8> {
    let mut head = String::from("HTTP/1.1 200 OK\r\n");
    head.push_str("Content-Type: text/event-stream; charset=utf-8\r\n");
    head.push_str("Cache-Control: no-store\r\n");
    head.push_str("Connection: keep-alive\r\n");
    head.push_str("X-Accel-Buffering: no\r\n");
    for (name, value) in CORS_HEADERS {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Encodes one `event: snapshot` frame.
///
/// The payload JSON never contains raw newlines (they are escaped by the
/// serializer), so a single `data:` line is always sufficient.
///
/// # Errors
///
/// Returns the serializer error if the payload cannot be encoded.
pub fn snapshot_frame(payload: &SnapshotPayload) -> Result<String, serde_json::Error> {
    Ok(format!(
        "event: {SNAPSHOT_EVENT}\ndata: {}\n\n",
        payload.to_json()?
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
