use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::de;

/// Credentials submitted to `POST /api/auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Payload of a successful login (and of a token refresh).
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, deserialize_with = "de::roles")]
    pub roles: BTreeSet<String>,
}

impl LoginResponse {
    /// The access token, if the server sent a non-blank one.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("has_access_token", &self.token().is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("id", &self.id)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub refresh_token: String,
}

impl fmt::Debug for RefreshTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenRequest").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response_with_string_id_and_role_objects() {
        let json = r#"{
            "id": "1001",
            "username": "jason",
            "email": "tes*@example.com",
            "phone": "138****1234",
            "balance": 100.2,
            "roles": [{"name": "USER", "code": "U"}, {"code": "MERCHANT"}],
            "accessToken": "eyJhbGci",
            "refreshToken": "eyJhbGcj",
            "tokenType": "Bearer"
        }"#;

        let resp: LoginResponse = serde_json::from_str(json).expect("login response should parse");
        assert_eq!(resp.id, 1001);
        assert_eq!(resp.token(), Some("eyJhbGci"));
        assert!(resp.roles.contains("USER"));
        assert!(resp.roles.contains("MERCHANT"));
    }

    #[test]
    fn test_blank_access_token_is_missing() {
        let json = r#"{"id": 1, "username": "alice", "accessToken": "  "}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token(), None);
        assert!(resp.roles.is_empty());
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let req = LoginRequest::new("alice", "hunter2");
        let debug = format!("{:?}", req);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
