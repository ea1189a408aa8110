//! Application layer for ezcp-host.
//!
//! Maps a [`ParsedRequest`] to what the connection should do next.  Nothing
//! here touches a socket: routers return a [`Dispatch`] and the
//! infrastructure layer writes it out.
//!
//! # Responsibilities
//!
//! - The JSON API routes (`GET/POST /data`, `/ping`)
//! - The web routes (static page, `/data.json`, `/events` upgrade)
//! - Extracting submitted text from JSON, form, or plain bodies
//! - The in-memory snapshot store

pub mod api_router;
pub mod body_text;
pub mod store;
pub mod web_router;

use ezcp_core::{ParsedRequest, Response, Status};
use thiserror::Error;

use crate::domain::SnapshotSource;

pub use api_router::ApiRouter;
pub use body_text::extract_text;
pub use store::MemorySnapshotStore;
pub use web_router::WebRouter;

/// Paths answering with the snapshot JSON on both servers.
pub const DATA_PATHS: [&str; 2] = ["/data", "/data/"];

/// Failure while building a response; the connection answers `500`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to encode JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the connection should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this response and close.
    Respond(Response),
    /// Keep the socket open as a Server-Sent-Events stream.
    OpenEventStream,
}

/// A router shared by every connection of one server.
pub trait RequestHandler: Send + Sync + 'static {
    /// Routes one request.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when a response cannot be built.
    fn handle(&self, request: &ParsedRequest) -> Result<Dispatch, HandlerError>;
}

/// `200` with `{text, size, updatedAt}` for the current snapshot.
pub(crate) fn snapshot_response(source: &dyn SnapshotSource) -> Result<Response, HandlerError> {
    Ok(Response::json(&source.snapshot().to_payload())?)
}

/// `200 text/plain ok` for `/ping*` liveness probes.
pub(crate) fn ping_response() -> Response {
    Response::text(Status::Ok, "ok")
}

/// `GET /ping`, `/ping/`, `/ping?t=...`, and any other `/ping` prefix.
pub(crate) fn is_ping(request: &ParsedRequest) -> bool {
    request.method == "GET" && request.path.starts_with("/ping")
}
