//! Routes for the JSON API server.
//!
//! | Method  | Path            | Response                           |
//! |---------|-----------------|------------------------------------|
//! | OPTIONS | *               | 204 CORS preflight                 |
//! | GET     | /data, /data/   | 200 `{text, size, updatedAt}`      |
//! | POST    | /data, /data/   | 200 `{"ok":true}` after notifying  |
//! | GET     | /ping*          | 200 `ok`                           |
//! | *       | *               | 404 `Not found`                    |

use std::sync::Arc;

use ezcp_core::{ParsedRequest, Response};
use serde::Serialize;
use tracing::debug;

use crate::application::{
    extract_text, is_ping, ping_response, snapshot_response, Dispatch, HandlerError,
    RequestHandler, DATA_PATHS,
};
use crate::domain::{RemoteTextSink, SnapshotSource};

#[derive(Debug, Serialize)]
struct Ack {
    ok: bool,
}

/// Router for the API server.
pub struct ApiRouter {
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn RemoteTextSink>,
}

impl ApiRouter {
    /// Creates a router reading from `source` and notifying `sink` on POST.
    pub fn new(source: Arc<dyn SnapshotSource>, sink: Arc<dyn RemoteTextSink>) -> Self {
        Self { source, sink }
    }

    fn accept_text(&self, request: &ParsedRequest) -> Result<Response, HandlerError> {
        let content_type = request.header("content-type").unwrap_or_default();
        let text = extract_text(content_type, &request.body);
        debug!(
            "POST {}: {} body bytes as '{content_type}'",
            request.path,
            request.body.len()
        );
        // Notification only; the sink owns the snapshot write.
        self.sink.on_remote_text(text);
        Ok(Response::json(&Ack { ok: true })?)
    }
}

impl RequestHandler for ApiRouter {
    fn handle(&self, request: &ParsedRequest) -> Result<Dispatch, HandlerError> {
        let response = if request.method == "OPTIONS" {
            Response::no_content()
        } else if request.matches("GET", &DATA_PATHS) {
            snapshot_response(self.source.as_ref())?
        } else if request.matches("POST", &DATA_PATHS) {
            self.accept_text(request)?
        } else if is_ping(request) {
            ping_response()
        } else {
            Response::not_found()
        };
        Ok(Dispatch::Respond(response))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
