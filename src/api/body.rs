//! Lenient response-body readers. None of these fail: a body that is empty or
//! not the expected JSON is treated as absent.

use serde_json::Value;

const ERROR_FIELDS: &[&str] = &["detail", "message"];
const SUMMARY_FIELDS: &[&str] = &["summary", "description", "detail", "message"];

pub fn parse_json(body: &str) -> Option<Value> {
	let body = body.trim();
	if body.is_empty() {
		return None;
	}
	serde_json::from_str(body).ok()
}

/// Human-readable error text from a `{detail|message}` body.
///
/// Validation errors arrive as `detail: [{msg: ...}, ...]`; their messages
/// are joined.
pub fn error_detail(body: &str) -> Option<String> {
	let value = parse_json(body)?;
	for field in ERROR_FIELDS {
		match value.get(field) {
			Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
			Some(Value::Array(items)) => {
				let msgs: Vec<&str> = items
					.iter()
					.filter_map(|item| item.get("msg").and_then(Value::as_str))
					.collect();
				if !msgs.is_empty() {
					return Some(msgs.join("; "));
				}
			}
			_ => {}
		}
	}
	None
}

/// Concept summary text: a bare JSON string, or the first non-empty of
/// `summary`, `description`, `detail`, `message`. Anything else is `""`.
pub fn summary_text(body: &str) -> String {
	match parse_json(body) {
		Some(Value::String(s)) => s,
		Some(value @ Value::Object(_)) => SUMMARY_FIELDS
			.iter()
			.filter_map(|field| value.get(field).and_then(Value::as_str))
			.find(|s| !s.trim().is_empty())
			.unwrap_or_default()
			.to_string(),
		_ => String::new(),
	}
}
