//! Integration tests for the ezcp-core request framer.
//!
//! These tests drive [`RequestFramer`] through its public API the way the
//! host's connection loop does: bytes arrive in arbitrary chunks, complete
//! requests are pulled out one at a time, and oversized bodies are rejected
//! from the header block alone.

use ezcp_core::{FrameError, ParsedRequest, RequestFramer, Response, Status, MAX_BODY_BYTES};

/// Feeds `raw` to a fresh framer in chunks of `chunk_size` bytes and collects
/// every request produced.
fn frame_in_chunks(raw: &[u8], chunk_size: usize) -> Vec<ParsedRequest> {
    let mut framer = RequestFramer::new();
    let mut requests = Vec::new();
    for chunk in raw.chunks(chunk_size) {
        framer.push(chunk);
        while let Some(req) = framer.next_request().expect("framing must succeed") {
            requests.push(req);
        }
    }
    requests
}

#[test]
fn test_json_post_is_identical_for_every_chunk_size() {
    // Arrange
    let body = r#"{"text":"café 😀"}"#;
    let raw = format!(
        "POST /data HTTP/1.1\r\nHost: 192.168.0.10:8081\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );

    // Act
    let reference = frame_in_chunks(raw.as_bytes(), raw.len());

    // Assert
    assert_eq!(reference.len(), 1);
    for chunk_size in 1..=17 {
        assert_eq!(
            frame_in_chunks(raw.as_bytes(), chunk_size),
            reference,
            "chunk size {chunk_size}"
        );
    }
    assert_eq!(reference[0].header("content-type"), Some("application/json"));
    assert_eq!(reference[0].body, body.as_bytes());
}

#[test]
fn test_raw_utf8_body_split_inside_a_character() {
    // Arrange: the 4-byte emoji straddles two TCP segments
    let text = "\u{1F4CB} clipboard";
    let raw = format!(
        "POST /data HTTP/1.1\r\nContent-Length: {}\r\n\r\n{text}",
        text.len()
    );
    let bytes = raw.as_bytes();
    let split = bytes.len() - text.len() + 2;

    // Act
    let mut framer = RequestFramer::new();
    framer.push(&bytes[..split]);
    assert!(framer.next_request().unwrap().is_none());
    framer.push(&bytes[split..]);
    let req = framer.next_request().unwrap().unwrap();

    // Assert
    assert_eq!(String::from_utf8(req.body).unwrap(), text);
}

#[test]
fn test_oversized_declaration_needs_no_body_bytes() {
    let mut framer = RequestFramer::new();
    framer.push(b"POST /data HTTP/1.1\r\nContent-Length: 99999999\r\n\r\n");
    let err = framer.next_request().unwrap_err();
    assert_eq!(
        err,
        FrameError::PayloadTooLarge {
            declared: 99_999_999,
            limit: MAX_BODY_BYTES
        }
    );
    assert_eq!(Response::payload_too_large().status, Status::PayloadTooLarge);
}

#[test]
fn test_pipelined_requests_come_out_in_arrival_order() {
    let raw = b"GET /data HTTP/1.1\r\n\r\nGET /ping HTTP/1.1\r\n\r\nOPTIONS /data HTTP/1.1\r\n\r\n";
    let paths: Vec<(String, String)> = frame_in_chunks(raw, 5)
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("GET".to_string(), "/data".to_string()),
            ("GET".to_string(), "/ping".to_string()),
            ("OPTIONS".to_string(), "/data".to_string()),
        ]
    );
}
