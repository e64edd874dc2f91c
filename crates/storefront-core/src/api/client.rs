//! API client for the storefront backend.
//!
//! Every call goes through the same pipeline: build the request, attach the
//! session token, send it, classify what came back and run the resulting
//! side effects before handing the typed result to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{Authenticator, SessionStore};
use crate::models::{
    LoginRequest, LoginResponse, Page, ProductDetail, ProductPublic, ProductQuery,
    RefreshTokenRequest, RegisterRequest, RegisterResponse,
};
use crate::router::Navigator;

use super::interceptor::{self, Classified, Effect};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Anything slower is reported to the caller as a network failure.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const REFRESH_PATH: &str = "/api/auth/refresh";
const ME_PATH: &str = "/api/auth/me";
const PRODUCTS_PATH: &str = "/api/products";

/// API client bound to one session and navigator.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
    navigator: Navigator,
}

impl ApiClient {
    /// Create a client with the default timeout
    pub fn new(
        base_url: impl Into<String>,
        session: SessionStore,
        navigator: Navigator,
    ) -> Result<Self, ApiError> {
        Self::with_timeout(
            base_url,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            session,
            navigator,
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
        session: SessionStore,
        navigator: Navigator,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            navigator,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Run a request through the interceptor pipeline.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let request = interceptor::authorize(builder.build()?, self.session.token().as_deref());
        let method = request.method().clone();
        let url = request.url().clone();
        let authorized = request.headers().contains_key(reqwest::header::AUTHORIZATION);
        debug!(%method, %url, authorized, "Sending request");

        let classified = match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) => interceptor::classify_response(status, &body),
                    Err(e) => interceptor::classify_transport_error(e),
                }
            }
            Err(e) => interceptor::classify_transport_error(e),
        };

        let Classified { outcome, effects } = classified;
        self.apply(effects);

        let data = outcome.inspect_err(|e| warn!(%method, %url, error = %e, "Request failed"))?;
        serde_json::from_value(data).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to decode data from {}: {}", url, e))
        })
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Logout => self.session.logout(),
                Effect::RedirectToLogin => self.navigator.redirect_to_login(),
                Effect::Notify(notification) => self.session.notifier().notify(notification),
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    // ===== Session =====

    /// Log in and update the session. See `SessionStore::login`.
    pub async fn login(&self, credentials: &LoginRequest) -> bool {
        self.session.login(self, credentials).await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    // ===== Auth endpoints =====

    pub async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.post(REGISTER_PATH, req).await
    }

    /// Exchange a refresh token for a new login payload.
    /// The session is not updated; nothing calls this automatically.
    pub async fn refresh(&self, req: &RefreshTokenRequest) -> Result<LoginResponse, ApiError> {
        self.post(REFRESH_PATH, req).await
    }

    /// Name of the user the server associates with the current token.
    pub async fn me(&self) -> Result<String, ApiError> {
        self.get(ME_PATH).await
    }

    // ===== Products =====

    pub async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<Page<ProductPublic>, ApiError> {
        self.send(self.request(Method::GET, PRODUCTS_PATH).query(query))
            .await
    }

    pub async fn get_product(&self, id: i64) -> Result<ProductDetail, ApiError> {
        self.get(&format!("{}/{}", PRODUCTS_PATH, id)).await
    }
}

#[async_trait]
impl Authenticator for ApiClient {
    async fn authenticate(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post(LOGIN_PATH, credentials).await
    }
}
