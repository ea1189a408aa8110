//! Routes for the web/SSE server.
//!
//! Serves the bundled browser client, a read-only snapshot endpoint, and the
//! `/events` upgrade.  There is no `POST` here: browsers submit text to the
//! API server.

use std::sync::Arc;

use ezcp_core::{ParsedRequest, Response, Status};

use crate::application::{
    is_ping, ping_response, snapshot_response, Dispatch, HandlerError, RequestHandler,
};
use crate::domain::{SnapshotSource, StaticAssets};

/// Path that upgrades to a Server-Sent-Events stream.
pub const EVENTS_PATH: &str = "/events";

/// Router for the web server.
pub struct WebRouter {
    source: Arc<dyn SnapshotSource>,
    assets: StaticAssets,
}

impl WebRouter {
    pub fn new(source: Arc<dyn SnapshotSource>, assets: StaticAssets) -> Self {
        Self { source, assets }
    }

    fn static_asset(&self, path: &str) -> Option<Response> {
        let (content_type, body) = match path {
            "/" | "/index.html" => ("text/html", self.assets.index_html),
            "/styles.css" => ("text/css", self.assets.styles_css),
            "/app.js" => ("application/javascript", self.assets.app_js),
            _ => return None,
        };
        Some(Response::new(Status::Ok, content_type, body))
    }
}

impl RequestHandler for WebRouter {
    fn handle(&self, request: &ParsedRequest) -> Result<Dispatch, HandlerError> {
        // Checked before the generic routes so it never falls through to 404.
        if request.matches("GET", &[EVENTS_PATH]) {
            return Ok(Dispatch::OpenEventStream);
        }
        if request.method == "OPTIONS" {
            return Ok(Dispatch::Respond(Response::no_content()));
        }

        let response = if request.method != "GET" {
            Response::not_found()
        } else if let Some(asset) = self.static_asset(&request.path) {
            asset
        } else if matches!(request.path.as_str(), "/data" | "/data/" | "/data.json") {
            snapshot_response(self.source.as_ref())?
        } else if is_ping(request) {
            ping_response()
        } else {
            Response::not_found()
        };
        Ok(Dispatch::Respond(response))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ezcp_core::Snapshot;

    use super::*;
    use crate::domain::collaborators::MockSnapshotSource;

    const ASSETS: StaticAssets = StaticAssets {
        index_html: "<html>\u{1F4CB}</html>",
        styles_css: "body{}",
        app_js: "new EventSource('/events')",
    };

    fn get(path: &str) -> ParsedRequest {
        ParsedRequest {
            method: "GET".to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    fn idle_router() -> WebRouter {
        WebRouter::new(Arc::new(MockSnapshotSource::new()), ASSETS)
    }

    fn respond(router: &WebRouter, req: &ParsedRequest) -> Response {
        match router.handle(req).unwrap() {
            Dispatch::Respond(resp) => resp,
            Dispatch::OpenEventStream => panic!("unexpected upgrade for {}", req.path),
        }
    }

    #[test]
    fn test_events_path_upgrades() {
        let router = idle_router();
        assert_eq!(router.handle(&get("/events")).unwrap(), Dispatch::OpenEventStream);
    }

    #[test]
    fn test_static_assets_have_matching_content_types() {
        let router = idle_router();
        for (path, content_type, body) in [
            ("/", "text/html", ASSETS.index_html),
            ("/index.html", "text/html", ASSETS.index_html),
            ("/styles.css", "text/css", ASSETS.styles_css),
            ("/app.js", "application/javascript", ASSETS.app_js),
        ] {
            let resp = respond(&router, &get(path));
            assert_eq!(resp.status, Status::Ok);
            assert_eq!(resp.content_type, Some(content_type), "path {path}");
            assert_eq!(resp.body, body.as_bytes());
        }
    }

    #[test]
    fn test_data_json_alias_serves_snapshot() {
        // Arrange
        let mut source = MockSnapshotSource::new();
        source
            .expect_snapshot()
            .times(3)
            .returning(|| Snapshot::new("abc", "t1"));
        let router = WebRouter::new(Arc::new(source), ASSETS);

        // Act / Assert
        for path in ["/data", "/data/", "/data.json"] {
            let resp = respond(&router, &get(path));
            assert_eq!(
                String::from_utf8(resp.body).unwrap(),
                r#"{"text":"abc","size":3,"updatedAt":"t1"}"#
            );
        }
    }

    #[test]
    fn test_post_is_not_accepted_on_web_server() {
        let router = idle_router();
        let mut req = get("/data");
        req.method = "POST".to_string();
        assert_eq!(respond(&router, &req).status, Status::NotFound);
    }

    #[test]
    fn test_post_to_events_does_not_upgrade() {
        let router = idle_router();
        let mut req = get("/events");
        req.method = "POST".to_string();
        assert_eq!(respond(&router, &req).status, Status::NotFound);
    }

    #[test]
    fn test_options_and_ping_and_unknown() {
        let router = idle_router();
        let mut options = get("/anything");
        options.method = "OPTIONS".to_string();
        assert_eq!(respond(&router, &options).status, Status::NoContent);
        assert_eq!(respond(&router, &get("/ping?t=1")).body, b"ok");
        let unknown = respond(&router, &get("/unknown"));
        assert_eq!(unknown.status, Status::NotFound);
        assert_eq!(unknown.body, b"Not found");
    }
}
