//! Text extraction from `POST /data` bodies.
//!
//! Every failure path yields an empty string instead of an error: a
//! malformed submission clears the shared text rather than being rejected.

use serde_json::Value;
use url::form_urlencoded;

/// Extracts the submitted text according to the request's `Content-Type`.
///
/// - `application/json` — the `text` string field, or a bare JSON string;
///   anything else (including invalid JSON) gives `""`.
/// - `application/x-www-form-urlencoded` — the first `text` field, decoded
///   (`+` is a space); missing gives `""`.
/// - otherwise — the raw body, decoded as UTF-8 with replacement characters.
///
/// `content_type` is matched case-insensitively by substring, so parameters
/// such as `; charset=utf-8` are ignored.
pub fn extract_text(content_type: &str, body: &[u8]) -> String {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("application/json") {
        return text_from_json(body);
    }
    if content_type.contains("application/x-www-form-urlencoded") {
        return form_urlencoded::parse(body)
            .find(|(key, _)| key == "text")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
    }
    String::from_utf8_lossy(body).into_owned()
}

fn text_from_json(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut map)) => match map.remove("text") {
            Some(Value::String(text)) => text,
            _ => String::new(),
        },
        Ok(Value::String(text)) => text,
        Ok(_) | Err(_) => String::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
