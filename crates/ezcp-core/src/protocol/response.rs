//! HTTP response encoding.
//!
//! Wire format:
//! ```text
//! HTTP/1.1 <code> <reason>\r\n
//! Content-Type: <type>; charset=utf-8\r\n      (omitted when there is no body)
//! Content-Length: <body bytes>\r\n             (omitted for 204)
//! Access-Control-Allow-Origin: *\r\n
//! Access-Control-Allow-Methods: GET,POST,OPTIONS\r\n
//! Access-Control-Allow-Headers: Content-Type\r\n
//! Access-Control-Max-Age: 86400\r\n
//! Cache-Control: no-store\r\n
//! Connection: close\r\n
//! \r\n
//! <body>
//! ```
//!
//! `Content-Length` is the UTF-8 byte length of the body, never its
//! character count.

use serde::Serialize;

/// CORS headers present on every response, streaming or not.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,POST,OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Response statuses used by the ezcp servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoContent,
    NotFound,
    PayloadTooLarge,
    HeaderFieldsTooLarge,
    InternalServerError,
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::NotFound => 404,
            Status::PayloadTooLarge => 413,
            Status::HeaderFieldsTooLarge => 431,
            Status::InternalServerError => 500,
        }
    }

    /// Reason phrase for the status line.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NoContent => "No Content",
            Status::NotFound => "Not Found",
            Status::PayloadTooLarge => "Payload Too Large",
            Status::HeaderFieldsTooLarge => "Request Header Fields Too Large",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

/// A complete non-streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// MIME type without parameters; `charset=utf-8` is appended on the wire.
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Response {
    /// Response with a body of the given MIME type.
    pub fn new(status: Status, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some(content_type),
            body: body.into(),
        }
    }

    /// `text/plain` response.
    pub fn text(status: Status, body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::new(status, "text/plain", body)
    }

    /// `200 application/json` response.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be encoded.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(Status::Ok, "application/json", body))
    }

    /// `204 No Content` used for CORS preflight.
    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// `404 Not found`.
    pub fn not_found() -> Self {
        Self::text(Status::NotFound, "Not found")
    }

    /// `413 Too large`.
    pub fn payload_too_large() -> Self {
        Self::text(Status::PayloadTooLarge, "Too large")
    }

    /// `431 Headers too large`.
    pub fn header_fields_too_large() -> Self {
        Self::text(Status::HeaderFieldsTooLarge, "Headers too large")
    }

    /// `500 Error`.
    pub fn internal_error() -> Self {
        Self::text(Status::InternalServerError, "Error")
    }

    /// Encodes the status line, headers, and body into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status.code(), self.status.reason());
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {content_type}; charset=utf-8\r\n"));
        }
        if self.status != Status::NoContent {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        for (name, value) in CORS_HEADERS {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("Access-Control-Max-Age: 86400\r\n");
        head.push_str("Cache-Control: no-store\r\n");
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(resp: &Response) -> String {
        String::from_utf8(resp.to_bytes()).unwrap()
    }

    fn content_length(wire: &str) -> usize {
        wire.lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn test_status_line_and_terminator() {
        let out = wire(&Response::text(Status::Ok, "ok"));
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("\r\n\r\nok"));
    }

    #[test]
    fn test_content_length_counts_utf8_bytes() {
        // ASCII, 2-byte, 3-byte, and 4-byte (surrogate pair in UTF-16) characters
        for body in ["hello", "h\u{e9}llo", "\u{65e5}\u{672c}", "\u{1F600}\u{1F680}"] {
            let out = wire(&Response::text(Status::Ok, body));
            assert_eq!(content_length(&out), body.len(), "body {body:?}");
        }
        assert_eq!(content_length(&wire(&Response::text(Status::Ok, "\u{1F600}"))), 4);
    }

    #[test]
    fn test_every_response_has_cors_and_cache_headers() {
        for resp in [
            Response::text(Status::Ok, "ok"),
            Response::no_content(),
            Response::not_found(),
            Response::payload_too_large(),
            Response::header_fields_too_large(),
            Response::internal_error(),
        ] {
            let out = wire(&resp);
            assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
            assert!(out.contains("Access-Control-Allow-Methods: GET,POST,OPTIONS\r\n"));
            assert!(out.contains("Access-Control-Allow-Headers: Content-Type\r\n"));
            assert!(out.contains("Cache-Control: no-store\r\n"));
            assert!(out.contains("Connection: close\r\n"));
        }
    }

    #[test]
    fn test_no_content_has_no_body_or_length() {
        let out = wire(&Response::no_content());
        assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!out.contains("Content-Length"));
        assert!(!out.contains("Content-Type"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_json_response_content_type() {
        let resp = Response::json(&serde_json::json!({ "ok": true })).unwrap();
        let out = wire(&resp);
        assert!(out.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(out.ends_with(r#"{"ok":true}"#));
    }

    #[test]
    fn test_canned_error_bodies() {
        assert!(wire(&Response::not_found()).ends_with("\r\n\r\nNot found"));
        assert!(wire(&Response::payload_too_large()).starts_with("HTTP/1.1 413 Payload Too Large"));
        assert!(wire(&Response::header_fields_too_large())
            .starts_with("HTTP/1.1 431 Request Header Fields Too Large"));
        assert!(wire(&Response::internal_error()).starts_with("HTTP/1.1 500 Internal Server Error"));
    }
}
