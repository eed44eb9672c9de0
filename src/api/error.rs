//! Error type for the Vizzle backend client.
//!
//! Every failure the transport layer can observe ends up as an [`ApiError`].
//! HTTP failures carry the parsed error body alongside a message already
//! normalized for display, so callers never need to dig through JSON.

use serde_json::{Value, json};
use thiserror::Error;

/// Message used when a non-2xx response body is not valid JSON.
pub const REQUEST_FAILED: &str = "Request failed";

/// Message used when an error body has neither `detail` nor `message`.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is derived from `body` (`detail` first,
    /// then `message`, then a fixed fallback) and is what `Display` shows.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Value,
    },

    /// Network-level failure (DNS, connection refused, timeout).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build an HTTP error from a raw response body.
    ///
    /// Unparseable bodies are replaced by `{"detail": "Request failed"}` so
    /// the error value is never dropped. Valid JSON that is not an object is
    /// kept as is and gets the generic message.
    pub fn from_body(status: u16, raw: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| json!({ "detail": REQUEST_FAILED }));
        let message = error_message(&body).unwrap_or_else(|| UNEXPECTED_ERROR.to_string());
        Self::Http {
            status,
            message,
            body,
        }
    }

    /// Same as [`from_body`](Self::from_body), but with an endpoint-specific
    /// fallback when the body carries no `detail`.
    pub fn from_upload_body(status: u16, raw: &str, fallback: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw).unwrap_or(Value::Null);
        let message = body
            .get("detail")
            .and_then(field_text)
            .unwrap_or_else(|| fallback.to_string());
        Self::Http {
            status,
            message,
            body,
        }
    }

    /// HTTP status code, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

// `detail` wins over `message`; FastAPI validation errors put an array in
// `detail`, which is rendered as compact JSON.
fn error_message(body: &Value) -> Option<String> {
    body.get("detail")
        .and_then(field_text)
        .or_else(|| body.get("message").and_then(field_text))
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_preferred() {
        let err = ApiError::from_body(500, r#"{"detail":"boom","message":"other"}"#);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn message_used_without_detail() {
        let err = ApiError::from_body(400, r#"{"message":"bad image"}"#);
        assert_eq!(err.to_string(), "bad image");
    }

    #[test]
    fn unparseable_body_falls_back() {
        let err = ApiError::from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), REQUEST_FAILED);
        match err {
            ApiError::Http { body, .. } => assert_eq!(body["detail"], REQUEST_FAILED),
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn non_object_json_uses_generic_message() {
        let err = ApiError::from_body(500, r#"["boom"]"#);
        assert_eq!(err.to_string(), UNEXPECTED_ERROR);
        match err {
            ApiError::Http { body, .. } => assert!(body.is_array()),
            other => panic!("expected Http, got {other:?}"),
        }

        let err = ApiError::from_body(500, r#""down for maintenance""#);
        assert_eq!(err.to_string(), UNEXPECTED_ERROR);
    }

    #[test]
    fn empty_object_uses_generic_message() {
        let err = ApiError::from_body(500, "{}");
        assert_eq!(err.to_string(), UNEXPECTED_ERROR);
    }

    #[test]
    fn structured_detail_is_rendered() {
        let err = ApiError::from_body(422, r#"{"detail":[{"loc":["body","fps"]}]}"#);
        assert_eq!(err.to_string(), r#"[{"loc":["body","fps"]}]"#);
    }

    #[test]
    fn upload_fallback_applies() {
        let err = ApiError::from_upload_body(413, "too large", "Failed to upload human image");
        assert_eq!(err.to_string(), "Failed to upload human image");

        let err = ApiError::from_upload_body(400, r#"{"detail":"not an image"}"#, "unused");
        assert_eq!(err.to_string(), "not an image");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
