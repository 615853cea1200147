//! Response envelopes and error normalization
//!
//! The backend wraps successful payloads as `{ "data": ... }` and reports
//! failures in a handful of shapes:
//!
//! - `{ "error": { "message": "Title is required" } }`
//! - `{ "error": { "message": [{ "error": "A" }, { "error": "B" }] } }`
//! - `[{ "error": "A" }, { "error": "B" }]`
//! - `{ "message": "..." }` or `{ "error": "..." }`
//!
//! Every shape collapses to one display string; anything unrecognized falls
//! back to [`GENERIC_ERROR_MESSAGE`].

use crate::error::EssResult;
use serde_json::Value;

/// Shown when a failure carries no usable message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

const LIST_SEPARATOR: &str = " | ";
const MAX_DEPTH: usize = 4;

/// Extract the display message from an error body
pub fn normalize_error_body(body: &Value) -> Option<String> {
    message_from(body, 0)
}

/// Normalize a raw error body, falling back to the generic message
pub fn normalize_error_bytes(bytes: &[u8]) -> String {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|body| normalize_error_body(&body))
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

fn message_from(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }

    match value {
        Value::String(s) => non_empty(s),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| message_from(item, depth + 1))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(LIST_SEPARATOR))
            }
        }
        Value::Object(map) => ["error", "message", "errors"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|nested| message_from(nested, depth + 1)),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a response body; empty bodies are `Null`, non-JSON text is a string
pub fn parse_body(bytes: &[u8]) -> EssResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// `{data: x}` yields `x`; anything else is returned whole
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_list_is_joined() {
        let body = json!([{"error": "A"}, {"error": "B"}]);
        assert_eq!(normalize_error_body(&body).as_deref(), Some("A | B"));

        let nested = json!({"error": {"message": [{"error": "A"}, {"error": "B"}]}});
        assert_eq!(normalize_error_body(&nested).as_deref(), Some("A | B"));
    }

    #[test]
    fn test_single_message_is_passed_through() {
        let body = json!({"error": {"message": "C"}});
        assert_eq!(normalize_error_body(&body).as_deref(), Some("C"));
        assert_eq!(normalize_error_body(&json!("C")).as_deref(), Some("C"));
        assert_eq!(
            normalize_error_body(&json!({"message": "Leave overlaps"})).as_deref(),
            Some("Leave overlaps")
        );
    }

    #[test]
    fn test_unusable_bodies_fall_back() {
        assert_eq!(normalize_error_bytes(b""), GENERIC_ERROR_MESSAGE);
        assert_eq!(normalize_error_bytes(b"<html>502</html>"), GENERIC_ERROR_MESSAGE);
        assert_eq!(
            normalize_error_bytes(br#"{"error": {"code": 17}}"#),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(normalize_error_bytes(br#"{"error": {"message": "  "}}"#), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(unwrap_data(json!({"data": [1, 2]})), json!([1, 2]));
        assert_eq!(unwrap_data(json!({"id": 1})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!({"data": null})), Value::Null);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b" \n").unwrap(), Value::Null);
        assert_eq!(parse_body(b"{\"a\":1}").unwrap(), json!({"a": 1}));
        assert_eq!(parse_body(b"ok").unwrap(), json!("ok"));
    }
}
