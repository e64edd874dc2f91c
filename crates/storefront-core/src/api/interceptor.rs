//! The request and response interceptor stages.
//!
//! Both stages are pure: the request stage rewrites a built request, and the
//! response stages turn what came back from the network into an outcome plus
//! an ordered list of side effects. `ApiClient` runs the effects against the
//! session, navigator and notifier.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::models::ApiEnvelope;
use crate::notify::{
    Notification, FORBIDDEN_MESSAGE, REQUEST_FAILED_MESSAGE, SERVER_ERROR_MESSAGE,
    SESSION_EXPIRED_MESSAGE,
};

use super::ApiError;

/// Scheme prefix of the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Side effect requested by the response stage, run in list order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Force the session closed.
    Logout,
    /// Send the user to the login page, remembering where they were.
    RedirectToLogin,
    Notify(Notification),
}

/// Result of classifying a response or transport failure.
#[derive(Debug)]
pub struct Classified {
    /// `data` of a successful envelope, or the failure to hand the caller.
    pub outcome: Result<Value, ApiError>,
    pub effects: Vec<Effect>,
}

/// Attach the bearer token when there is one. Never fails: a token that
/// cannot be encoded as a header value is dropped and the server decides.
pub fn authorize(mut request: Request, token: Option<&str>) -> Request {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return request;
    };

    match HeaderValue::from_str(&format!("{} {}", BEARER_SCHEME, token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(_) => warn!(
            url = %request.url(),
            "Token is not a valid header value, sending without it"
        ),
    }
    request
}

/// Classify a response that arrived from the server.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Classified {
    if status.is_success() {
        return classify_envelope(body);
    }

    let text = String::from_utf8_lossy(body);
    let err = ApiError::from_status(status, &text);
    let effects = match &err {
        ApiError::Unauthorized(_) => vec![
            Effect::Logout,
            Effect::RedirectToLogin,
            Effect::Notify(Notification::warning(SESSION_EXPIRED_MESSAGE)),
        ],
        ApiError::Forbidden(_) => vec![Effect::Notify(Notification::error(FORBIDDEN_MESSAGE))],
        _ => vec![Effect::Notify(Notification::error(
            err.server_message().unwrap_or(SERVER_ERROR_MESSAGE),
        ))],
    };

    Classified {
        outcome: Err(err),
        effects,
    }
}

/// Classify a request that got no response at all. Left to the caller to report.
pub fn classify_transport_error(err: reqwest::Error) -> Classified {
    Classified {
        outcome: Err(err.into()),
        effects: Vec::new(),
    }
}

fn classify_envelope(body: &[u8]) -> Classified {
    let envelope: ApiEnvelope = match serde_json::from_slice(body) {
        Ok(env) => env,
        Err(e) => {
            let text = String::from_utf8_lossy(body);
            return Classified {
                outcome: Err(ApiError::InvalidResponse(format!(
                    "{}: {}",
                    e,
                    ApiError::truncate_body(&text)
                ))),
                effects: Vec::new(),
            };
        }
    };

    if envelope.is_success() {
        return Classified {
            outcome: Ok(envelope.data.unwrap_or(Value::Null)),
            effects: Vec::new(),
        };
    }

    let message = envelope.message().map(str::to_string);
    let notification = Notification::error(message.as_deref().unwrap_or(REQUEST_FAILED_MESSAGE));
    Classified {
        outcome: Err(ApiError::Application {
            code: envelope.code,
            message,
        }),
        effects: vec![Effect::Notify(notification)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;

    fn request() -> Request {
        reqwest::Client::new()
            .get("http://localhost/api/products")
            .build()
            .unwrap()
    }

    #[test]
    fn test_authorize_attaches_bearer_token() {
        let req = authorize(request(), Some("abc"));
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn test_authorize_without_token_leaves_request_alone() {
        assert!(authorize(request(), None).headers().is_empty());
        assert!(authorize(request(), Some("")).headers().is_empty());
    }

    #[test]
    fn test_authorize_drops_unencodable_token() {
        let req = authorize(request(), Some("bad\ntoken"));
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_success_envelope_passes_data_through() {
        let c = classify_response(
            StatusCode::OK,
            br#"{"code":0,"message":"success","data":{"id":1}}"#,
        );
        assert_eq!(c.outcome.unwrap(), serde_json::json!({"id": 1}));
        assert!(c.effects.is_empty());
    }

    #[test]
    fn test_application_failure_notifies_with_server_message() {
        let c = classify_response(StatusCode::OK, br#"{"code":1,"message":"bad credentials"}"#);
        assert!(matches!(c.outcome, Err(ApiError::Application { code: 1, .. })));
        assert_eq!(c.effects, vec![Effect::Notify(Notification::error("bad credentials"))]);
    }

    #[test]
    fn test_application_failure_without_message_uses_fallback() {
        let c = classify_response(StatusCode::OK, br#"{"code":7}"#);
        assert!(c.outcome.is_err());
        assert_eq!(c.effects, vec![Effect::Notify(Notification::error(REQUEST_FAILED_MESSAGE))]);
    }

    #[test]
    fn test_unauthorized_logs_out_redirects_then_warns() {
        let c = classify_response(
            StatusCode::UNAUTHORIZED,
            br#"{"code":1,"message":"token invalid"}"#,
        );
        assert!(matches!(c.outcome, Err(ApiError::Unauthorized(_))));
        assert_eq!(c.effects.len(), 3);
        assert_eq!(c.effects[0], Effect::Logout);
        assert_eq!(c.effects[1], Effect::RedirectToLogin);
        match &c.effects[2] {
            Effect::Notify(n) => {
                assert_eq!(n.level, Level::Warning);
                assert_eq!(n.message, SESSION_EXPIRED_MESSAGE);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_forbidden_notifies_without_session_change() {
        let c = classify_response(StatusCode::FORBIDDEN, b"");
        assert!(matches!(c.outcome, Err(ApiError::Forbidden(_))));
        assert_eq!(c.effects, vec![Effect::Notify(Notification::error(FORBIDDEN_MESSAGE))]);
    }

    #[test]
    fn test_other_status_uses_server_message_or_fallback() {
        let c = classify_response(
            StatusCode::BAD_REQUEST,
            br#"{"code":1,"message":"insufficient balance"}"#,
        );
        assert_eq!(c.effects, vec![Effect::Notify(Notification::error("insufficient balance"))]);

        let c = classify_response(StatusCode::INTERNAL_SERVER_ERROR, b"oops");
        assert_eq!(c.effects, vec![Effect::Notify(Notification::error(SERVER_ERROR_MESSAGE))]);
    }

    #[test]
    fn test_malformed_success_body_is_invalid_and_silent() {
        let c = classify_response(StatusCode::OK, b"<html></html>");
        assert!(matches!(c.outcome, Err(ApiError::InvalidResponse(_))));
        assert!(c.effects.is_empty());
    }
}
