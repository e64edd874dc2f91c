use thiserror::Error;

use crate::models::ApiEnvelope;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Delivered fine, but the envelope carried a non-zero code.
    #[error("Request failed with code {code}: {}", .message.as_deref().unwrap_or("no message"))]
    Application { code: i64, message: Option<String> },

    #[error("Unauthorized - token may be expired")]
    Unauthorized(Option<String>),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a non-success HTTP status, pulling the server message out of
    /// the envelope when the body carries one.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ApiEnvelope>(body)
            .ok()
            .and_then(|env| env.message().map(str::to_string));
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message.unwrap_or_else(|| Self::truncate_body(body))),
            code => ApiError::Status {
                status: code,
                message,
            },
        }
    }

    /// Whether the response pipeline has already shown this failure to the
    /// user as an error. A 401 only produces a session-expired warning.
    pub fn is_error_notified(&self) -> bool {
        matches!(
            self,
            ApiError::Application { .. } | ApiError::Forbidden(_) | ApiError::Status { .. }
        )
    }

    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Application { message, .. }
            | ApiError::Status { message, .. }
            | ApiError::Unauthorized(message) => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_reads_envelope_message() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"code":1,"message":"insufficient stock"}"#,
        );
        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(err.server_message(), Some("insufficient stock"));
    }

    #[test]
    fn test_from_status_plain_body() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.server_message(), None);
        assert_eq!(err.status(), Some(502));
        assert!(err.is_error_notified());
    }

    #[test]
    fn test_unauthorized_and_forbidden() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized(None)
        ));
        let revoked = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"code":1,"message":"Token has been revoked"}"#,
        );
        assert_eq!(revoked.server_message(), Some("Token has been revoked"));
        assert!(!revoked.is_error_notified());
        let forbidden = ApiError::from_status(StatusCode::FORBIDDEN, "no");
        assert!(matches!(forbidden, ApiError::Forbidden(ref body) if body == "no"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_transport_failures_are_not_error_notified() {
        assert!(!ApiError::Timeout.is_error_notified());
        assert!(!ApiError::InvalidResponse("x".into()).is_error_notified());
    }
}
