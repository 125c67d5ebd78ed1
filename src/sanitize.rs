//! Cleaning of credentials and header maps before they reach an HTTP client.
//!
//! A pasted key often carries a trailing newline, a tab, or a stray NUL from
//! the clipboard. Any of those inside a header value makes the HTTP client
//! refuse the request, so they are stripped here and the cleaned value is
//! validated again.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::labels::{EMPTY_VALUE_HEADER, MIN_SECRET_LEN};
use crate::registry;

static HEADER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("header name pattern is a valid regex"));

/// Result of cleaning one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationResult {
    pub sanitized_value: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of cleaning a whole header map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSanitization {
    pub valid: bool,
    pub headers: BTreeMap<String, String>,
    pub errors: Vec<String>,
}

/// Remove ASCII control characters (CR, LF, tab and NUL included) and trim.
pub fn strip_control_chars(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Clean a credential and re-validate it for `provider_id`.
pub fn sanitize_secret(value: &str, provider_id: &str) -> SanitizationResult {
    let cleaned = strip_control_chars(value);

    if cleaned.is_empty() {
        return SanitizationResult {
            sanitized_value: cleaned,
            is_valid: false,
            format_label: None,
            error: Some("API key contains only invalid characters".to_string()),
        };
    }

    if cleaned.chars().count() < MIN_SECRET_LEN {
        return SanitizationResult {
            sanitized_value: cleaned,
            is_valid: false,
            format_label: None,
            error: Some(format!(
                "API key is too short (minimum {MIN_SECRET_LEN} characters)"
            )),
        };
    }

    let verdict = registry::validate(&cleaned, provider_id);
    SanitizationResult {
        sanitized_value: cleaned,
        is_valid: verdict.is_valid,
        format_label: Some(verdict.format_label),
        error: verdict.error,
    }
}

/// Clean a header map received as JSON, collecting every problem.
///
/// Values go through [`strip_control_chars`], so leading and trailing spaces
/// are trimmed as well. Trimming alone is not reported; only removed control
/// characters are.
///
/// Entries with an invalid name, a non-string value or an empty cleaned value
/// are dropped from the output. Values that needed cleaning are kept in their
/// cleaned form and still reported, so the caller sees every problem at once.
pub fn sanitize_header_map(headers: &Map<String, Value>) -> HeaderSanitization {
    sanitize_headers(headers.iter().map(|(name, value)| {
        let value = match value {
            Value::String(s) => HeaderInput::Text(s.as_str()),
            Value::Null => HeaderInput::Missing,
            _ => HeaderInput::NotText,
        };
        (name.as_str(), value)
    }))
}

/// A header value before cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderInput<'a> {
    Text(&'a str),
    /// null or undefined on the caller's side.
    Missing,
    /// Present but not a string.
    NotText,
}

impl<'a> From<Option<&'a str>> for HeaderInput<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(s) => Self::Text(s),
            None => Self::Missing,
        }
    }
}

/// Clean typed `(name, value)` pairs, collecting every problem.
pub fn sanitize_headers<'a, I, V>(headers: I) -> HeaderSanitization
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: Into<HeaderInput<'a>>,
{
    let mut out = HeaderSanitization::default();

    for (name, value) in headers {
        if !HEADER_NAME.is_match(name) {
            out.errors.push(format!("Invalid header name: {name:?}"));
            continue;
        }

        let raw = match value.into() {
            HeaderInput::Text(s) => s,
            HeaderInput::Missing => {
                out.errors.push(format!("Header {name} has no value"));
                continue;
            }
            HeaderInput::NotText => {
                out.errors.push(format!("Header {name} value is not a string"));
                continue;
            }
        };

        let cleaned = strip_control_chars(raw);
        if cleaned.is_empty() && !name.eq_ignore_ascii_case(EMPTY_VALUE_HEADER) {
            out.errors
                .push(format!("Header {name} is empty after removing invalid characters"));
            continue;
        }
        if raw.chars().any(|c| c.is_ascii_control()) {
            out.errors
                .push(format!("Header {name} contained control characters; they were removed"));
        }

        out.headers.insert(name.to_string(), cleaned);
    }

    out.valid = out.errors.is_empty();
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::labels::FORMAT_GROK_MODERN;

    #[test]
    fn strips_newline_and_nul_then_revalidates() {
        let result = sanitize_secret("xai-abc\n123\x00", "grok");
        assert_eq!(result.sanitized_value, "xai-abc123");
        assert!(result.is_valid);
        assert_eq!(result.format_label.as_deref(), Some(FORMAT_GROK_MODERN));
    }

    #[test]
    fn strips_every_control_range() {
        let dirty = "\t sk-\x01abc\x08def\x0b\x0cghi\x0e\x1fjkl\x7f\r\n ";
        assert_eq!(strip_control_chars(dirty), "sk-abcdefghijkl");
    }

    #[test]
    fn only_invalid_characters() {
        let result = sanitize_secret("\r\n\t\x00 ", "openai");
        assert!(!result.is_valid);
        assert!(result.sanitized_value.is_empty());
        assert!(result.error.unwrap().contains("only invalid characters"));
    }

    #[test]
    fn too_short() {
        let result = sanitize_secret("xai-abc", "grok");
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("too short"));
    }

    #[test]
    fn propagates_format_verdict() {
        let result = sanitize_secret("sk-proj-abcdef\n", "grok");
        assert_eq!(result.sanitized_value, "sk-proj-abcdef");
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("xai-"));
    }

    #[test]
    fn header_map_collects_every_error() {
        let headers = json!({
            "Authorization": null,
            "X-Api-Key": "xai-abc\r\n123",
        });
        let result = sanitize_header_map(headers.as_object().unwrap());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert!(!result.headers.contains_key("Authorization"));
        assert_eq!(result.headers["X-Api-Key"], "xai-abc123");
    }

    #[test]
    fn header_map_rejects_bad_names_and_types() {
        let headers = json!({
            "Bad Header": "value",
            "X-Count": 3,
            "X-Empty": "\r\n",
            "Content-Length": "",
            "Accept": "application/json",
        });
        let result = sanitize_header_map(headers.as_object().unwrap());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.headers.len(), 2);
        assert_eq!(result.headers["Content-Length"], "");
        assert_eq!(result.headers["Accept"], "application/json");
    }

    #[test]
    fn typed_headers() {
        let result = sanitize_headers([
            ("authorization", Some("Bearer sk-abc\n")),
            ("x-missing", None),
        ]);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "Header authorization contained control characters; they were removed".to_string(),
                "Header x-missing has no value".to_string(),
            ]
        );
        assert_eq!(result.headers["authorization"], "Bearer sk-abc");
    }

    #[test]
    fn surrounding_spaces_trimmed_silently() {
        let headers = json!({ "Accept": "  application/json " });
        let result = sanitize_header_map(headers.as_object().unwrap());
        assert!(result.valid);
        assert_eq!(result.headers["Accept"], "application/json");
    }

    #[test]
    fn clean_map_is_valid() {
        let result = sanitize_headers([("content-type", "application/json")].map(|(n, v)| (n, Some(v))));
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }
}
