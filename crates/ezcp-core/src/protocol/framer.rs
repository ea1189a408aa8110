//! Incremental HTTP/1.1 request framer.
//!
//! TCP is a stream protocol: a single `read()` may return part of a request,
//! or the tail of one request plus the start of the next.  The
//! [`RequestFramer`] owns a per-connection byte buffer, accepts whatever the
//! socket delivered via [`RequestFramer::push`], and hands out one complete
//! request at a time from [`RequestFramer::next_request`].
//!
//! Framing rules:
//!
//! ```text
//! <request-line> SEP <header> SEP ... SEP SEP <body: Content-Length bytes>
//! ```
//!
//! `SEP` is `\r\n`; a buffer with no `\r\n\r\n` but a `\n\n` is framed with
//! bare `\n` separators instead.  The buffer stays raw bytes until the header
//! block is complete, so multi-byte UTF-8 sequences split across reads are
//! reassembled before anything is decoded.
//!
//! The header block is capped at [`MAX_HEADER_BYTES`]; the terminator search
//! resumes where the previous one stopped, so a slow trickle of header bytes
//! is scanned once rather than on every push.

use thiserror::Error;
use tracing::debug;

use crate::protocol::request::{
    normalize_request_target, parse_content_length, parse_headers, parse_request_line,
    strip_query, ParsedRequest,
};

/// Largest accepted request body: 1 MiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Largest accepted header block (request line plus headers): 64 KiB.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

const CRLF_TERMINATOR: &[u8] = b"\r\n\r\n";
const LF_TERMINATOR: &[u8] = b"\n\n";

/// Errors that end the framing of the current request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The declared `Content-Length` exceeds the body cap.
    #[error("declared body of {declared} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { declared: usize, limit: usize },

    /// The header block grew past the header cap without terminating.
    #[error("header block exceeds the {limit}-byte limit")]
    HeaderTooLarge { limit: usize },
}

/// Location of the end of the header block inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderEnd {
    /// Offset of the first byte of the blank-line terminator.
    offset: usize,
    /// Length of the terminator (`4` for CRLF, `2` for LF).
    terminator_len: usize,
    /// Separator between header lines.
    line_separator: &'static str,
}

/// Per-connection request accumulator.
#[derive(Debug, Default)]
pub struct RequestFramer {
    buffer: Vec<u8>,
    /// Earliest offset at which a header terminator could still start.
    scan_from: usize,
}

impl RequestFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            scan_from: 0,
        }
    }

    /// Appends bytes received from the socket.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed by a parsed request.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Extracts the next complete request, if one is fully buffered.
    ///
    /// Returns `Ok(None)` while the header block or the body is still
    /// incomplete; the buffer is left untouched in that case.  On success the
    /// request's bytes are removed from the front of the buffer and any
    /// trailing bytes are kept for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] as soon as the header block
    /// declares a body over [`MAX_BODY_BYTES`], without waiting for the body
    /// to arrive, and [`FrameError::HeaderTooLarge`] once more than
    /// [`MAX_HEADER_BYTES`] are buffered without a complete header block.
    pub fn next_request(&mut self) -> Result<Option<ParsedRequest>, FrameError> {
        let Some(end) = find_header_end(&self.buffer, self.scan_from) else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(FrameError::HeaderTooLarge {
                    limit: MAX_HEADER_BYTES,
                });
            }
            self.scan_from = self
                .buffer
                .len()
                .saturating_sub(CRLF_TERMINATOR.len() - 1);
            return Ok(None);
        };
        if end.offset > MAX_HEADER_BYTES {
            return Err(FrameError::HeaderTooLarge {
                limit: MAX_HEADER_BYTES,
            });
        }

        let (method, path, headers) = {
            let header_block = String::from_utf8_lossy(&self.buffer[..end.offset]);
            let mut lines = header_block.split(end.line_separator);
            let (method, target) = parse_request_line(lines.next().unwrap_or_default());
            let target = normalize_request_target(&target);
            let path = strip_query(&target).to_string();
            (method, path, parse_headers(lines))
        };

        let content_length =
            parse_content_length(headers.get("content-length").map(String::as_str));
        if content_length > MAX_BODY_BYTES {
            return Err(FrameError::PayloadTooLarge {
                declared: content_length,
                limit: MAX_BODY_BYTES,
            });
        }

        let body_start = end.offset + end.terminator_len;
        let total_needed = body_start + content_length;
        if self.buffer.len() < total_needed {
            debug!(
                "awaiting body: have {} of {total_needed} bytes",
                self.buffer.len()
            );
            return Ok(None);
        }

        let body = self.buffer[body_start..total_needed].to_vec();
        self.buffer.drain(..total_needed);
        self.scan_from = 0;

        Ok(Some(ParsedRequest {
            method,
            path,
            headers,
            body,
        }))
    }
}

/// Finds the blank line ending the header block, preferring `\r\n\r\n`.
///
/// Bytes before `from` are known not to start either terminator.
fn find_header_end(buffer: &[u8], from: usize) -> Option<HeaderEnd> {
    if let Some(offset) = find_subslice(buffer, CRLF_TERMINATOR, from) {
        return Some(HeaderEnd {
            offset,
            terminator_len: CRLF_TERMINATOR.len(),
            line_separator: "\r\n",
        });
    }
    find_subslice(buffer, LF_TERMINATOR, from).map(|offset| HeaderEnd {
        offset,
        terminator_len: LF_TERMINATOR.len(),
        line_separator: "\n",
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
