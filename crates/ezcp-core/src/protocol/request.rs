//! Parsed HTTP request and the header-block parsing helpers used by the
//! framer.

use std::collections::HashMap;

use url::Url;

/// One fully-buffered HTTP request.
///
/// Built fresh for every request by [`crate::RequestFramer`], handed to a
/// router, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Uppercased method token, e.g. `GET`.  Empty when the request line was blank.
    pub method: String,
    /// Request path with the query string removed, e.g. `/data`.
    pub path: String,
    /// Header map keyed by lowercased header name.
    pub headers: HashMap<String, String>,
    /// Exactly `Content-Length` bytes of body.
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Returns the header value for a lowercase `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns `true` for the given method and one of the listed paths.
    pub fn matches(&self, method: &str, paths: &[&str]) -> bool {
        self.method == method && paths.contains(&self.path.as_str())
    }
}

/// Splits the request line into `(METHOD, request-target)`.
///
/// Missing pieces default to an empty method and `/`.
pub(crate) fn parse_request_line(line: &str) -> (String, String) {
    let mut parts = line.split(' ');
    let method = parts.next().unwrap_or_default().to_ascii_uppercase();
    let target = parts.next().unwrap_or("/").to_string();
    (method, target)
}

/// Reduces an absolute-form target (`http://host/path?q`) to `/path?q`.
///
/// Origin-form targets pass through trimmed; an empty target becomes `/`.
/// Unparseable absolute URLs are returned as-is.
pub(crate) fn normalize_request_target(target: &str) -> String {
    let trimmed = target.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return match Url::parse(trimmed) {
            Ok(url) => match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            },
            Err(_) => trimmed.to_string(),
        };
    }
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns the target with its query string removed.
pub(crate) fn strip_query(target: &str) -> &str {
    target.split('?').next().unwrap_or("/")
}

/// Parses `Name: value` lines into a lowercase-keyed map.
///
/// Lines without a colon, or with an empty name, are skipped.  A repeated
/// header keeps its last value.
pub(crate) fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        headers.insert(name, value.trim().to_string());
    }
    headers
}

/// Lenient `Content-Length` parse: leading decimal digits, otherwise 0.
///
/// Values too large for `usize` saturate so they always exceed the body cap.
pub(crate) fn parse_content_length(value: Option<&str>) -> usize {
    let Some(value) = value else {
        return 0;
    };
    value
        .trim()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0usize, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(usize::from(digit - b'0'))
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
