//! Request body validation.
//!
//! Validation returns values, never panics, and runs before any store
//! access. The two failure kinds carry distinct messages so a client can
//! tell a malformed body from a wrong-shaped one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// Why a request body was rejected. Both kinds surface as HTTP 400.
#[derive(Debug, PartialEq, Eq)]
pub enum BodyError {
    /// Body is not parseable JSON.
    Syntax,
    /// Body parses but lacks the required shape.
    Schema {
        /// Extra detail appended to the message, when available.
        detail: Option<String>,
    },
}

impl BodyError {
    fn message(&self) -> String {
        match self {
            BodyError::Syntax => "syntactically invalid JSON request".to_owned(),
            BodyError::Schema { detail: None } => {
                "semantically invalid JSON request".to_owned()
            }
            BodyError::Schema { detail: Some(detail) } => {
                format!("semantically invalid JSON request: {detail}")
            }
        }
    }
}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.message()).into_response()
    }
}

/// Extract the `current_state` value from a poll body.
///
/// The body must be a JSON object containing the key `current_state`;
/// extra keys are tolerated.
pub fn parse_poll_body(raw: &[u8]) -> Result<Value, BodyError> {
    let body: Value = serde_json::from_slice(raw).map_err(|_| BodyError::Syntax)?;
    match body {
        Value::Object(mut fields) => fields.remove("current_state").ok_or(BodyError::Schema {
            detail: Some("missing key 'current_state'".to_owned()),
        }),
        _ => Err(BodyError::Schema {
            detail: Some("expected a JSON object".to_owned()),
        }),
    }
}

/// Extract `(old, new)` from a CAS write body.
///
/// The body must be a JSON object whose key set is exactly `{old, new}`.
pub fn parse_write_body(raw: &[u8]) -> Result<(Value, Value), BodyError> {
    let body: Value = serde_json::from_slice(raw).map_err(|_| BodyError::Syntax)?;
    if let Value::Object(mut fields) = body {
        if let (Some(old), Some(new)) = (fields.remove("old"), fields.remove("new")) {
            if fields.is_empty() {
                return Ok((old, new));
            }
        }
    }
    Err(BodyError::Schema { detail: None })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn poll_body_extracts_current_state() {
        let value = parse_poll_body(br#"{"current_state": {"x": 1}}"#).unwrap();
        assert_eq!(value, json!({"x": 1}));
    }

    #[test]
    fn poll_body_tolerates_extra_keys() {
        let value = parse_poll_body(br#"{"current_state": 1, "note": "hi"}"#).unwrap();
        assert_eq!(value, json!(1));
    }

    #[test]
    fn poll_body_rejections() {
        assert_eq!(parse_poll_body(b"not json").unwrap_err(), BodyError::Syntax);
        assert!(matches!(
            parse_poll_body(br#"{"state": 1}"#).unwrap_err(),
            BodyError::Schema { .. }
        ));
        assert!(matches!(
            parse_poll_body(br#"[1, 2]"#).unwrap_err(),
            BodyError::Schema { .. }
        ));
    }

    #[test]
    fn write_body_extracts_old_and_new() {
        let (old, new) = parse_write_body(br#"{"old": null, "new": {"x": 1}}"#).unwrap();
        assert_eq!(old, Value::Null);
        assert_eq!(new, json!({"x": 1}));
    }

    #[test]
    fn write_body_requires_exactly_old_and_new() {
        assert_eq!(parse_write_body(b"not json").unwrap_err(), BodyError::Syntax);
        // Missing 'old'.
        assert!(matches!(
            parse_write_body(br#"{"new": 1}"#).unwrap_err(),
            BodyError::Schema { .. }
        ));
        // Extra key.
        assert!(matches!(
            parse_write_body(br#"{"old": 1, "new": 2, "x": 3}"#).unwrap_err(),
            BodyError::Schema { .. }
        ));
        // Not an object.
        assert!(matches!(
            parse_write_body(br#""old and new""#).unwrap_err(),
            BodyError::Schema { .. }
        ));
    }

    #[test]
    fn syntax_and_schema_messages_are_distinct() {
        let syntax = BodyError::Syntax.message();
        let schema = BodyError::Schema { detail: None }.message();
        assert_ne!(syntax, schema);
        assert!(syntax.contains("syntactically"));
        assert!(schema.contains("semantically"));
    }
}
