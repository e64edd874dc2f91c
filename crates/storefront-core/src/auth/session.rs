use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::{LoginRequest, LoginResponse, Profile};
use crate::notify::{Notification, Notifier, LOGIN_FAILED_MESSAGE};

use super::SessionPersistence;

/// Persisted projection of the session: the token and the user snapshot.
///
/// An empty token means nobody is logged in, and a profile is only ever
/// present alongside a token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Build an authenticated record from a login payload.
    /// Returns `None` when the payload carries no access token.
    pub fn from_login(resp: &LoginResponse) -> Option<Self> {
        let token = resp.token()?;
        Some(Self {
            token: token.to_string(),
            user: Some(Profile::from(resp)),
            logged_in_at: Some(Utc::now()),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty()
    }

    /// Token and profile are either both present or both absent.
    pub fn is_consistent(&self) -> bool {
        self.token.is_empty() == self.user.is_none()
    }
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token_len", &self.token.len())
            .field("user", &self.user.as_ref().map(|u| u.username.as_str()))
            .field("logged_in_at", &self.logged_in_at)
            .finish()
    }
}

/// Lifecycle state of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { user: Profile },
}

/// Exchanges credentials for a login payload.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError>;
}

struct Inner {
    data: RwLock<SessionData>,
    persistence: Box<dyn SessionPersistence>,
    notifier: Arc<dyn Notifier>,
}

/// Owner of the client session.
///
/// All mutation goes through `login` and `logout`, each of which saves the
/// new record before returning. Clone is cheap and every clone sees the same
/// session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Rehydrate the session from `persistence` and return the store.
    ///
    /// Absent, unreadable or inconsistent records start the session
    /// unauthenticated.
    pub fn open<P>(persistence: P, notifier: Arc<dyn Notifier>) -> Self
    where
        P: SessionPersistence + 'static,
    {
        let data = match persistence.load() {
            Ok(Some(record)) if record.is_consistent() => {
                debug!(logged_in = record.is_logged_in(), "Session rehydrated");
                record
            }
            Ok(Some(record)) => {
                warn!(?record, "Discarding inconsistent session record");
                SessionData::default()
            }
            Ok(None) => {
                debug!("No stored session");
                SessionData::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load session, starting logged out");
                SessionData::default()
            }
        };

        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(data),
                persistence: Box::new(persistence),
                notifier,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the session and persist it while still holding the write lock,
    /// so saves land in the same order as the transitions.
    fn commit(&self, data: SessionData) {
        let mut guard = self
            .inner
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        if let Err(e) = self.inner.persistence.save(&guard) {
            warn!(error = %e, "Failed to save session");
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_logged_in()
    }

    /// The bearer token, if logged in.
    pub fn token(&self) -> Option<String> {
        let data = self.read();
        data.is_logged_in().then(|| data.token.clone())
    }

    pub fn user(&self) -> Option<Profile> {
        self.read().user.clone()
    }

    pub fn state(&self) -> SessionState {
        match self.read().user.clone() {
            Some(user) => SessionState::Authenticated { user },
            None => SessionState::Unauthenticated,
        }
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> SessionData {
        self.read().clone()
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Log in with `credentials` through `auth`.
    ///
    /// Failures never escape: they leave the session unauthenticated, notify
    /// the user with an error (unless the response pipeline already showed
    /// one) and return false.
    /// Two overlapping calls race; whichever resolves last wins.
    pub async fn login<A>(&self, auth: &A, credentials: &LoginRequest) -> bool
    where
        A: Authenticator + ?Sized,
    {
        debug!(username = %credentials.username, "Logging in");

        let err = match auth.authenticate(credentials).await {
            Ok(resp) => match SessionData::from_login(&resp) {
                Some(data) => {
                    info!(username = %resp.username, user_id = resp.id, "Login successful");
                    self.commit(data);
                    return true;
                }
                None => ApiError::InvalidResponse("login response carried no access token".into()),
            },
            Err(e) => e,
        };

        warn!(username = %credentials.username, error = %err, "Login failed");
        if self.is_logged_in() {
            self.commit(SessionData::default());
        }
        if !err.is_error_notified() {
            let message = err.server_message().unwrap_or(LOGIN_FAILED_MESSAGE);
            self.inner.notifier.notify(Notification::error(message));
        }
        false
    }

    /// Clear the session. Calling it while logged out changes nothing.
    pub fn logout(&self) {
        if !self.is_logged_in() {
            debug!("Logout requested while already logged out");
            return;
        }
        self.commit(SessionData::default());
        info!("Logged out");
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("data", &*self.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::notify::{Level, NotificationLog};

    /// Authenticator returning a canned result.
    struct Canned(fn() -> Result<LoginResponse, ApiError>);

    #[async_trait]
    impl Authenticator for Canned {
        async fn authenticate(&self, _: &LoginRequest) -> Result<LoginResponse, ApiError> {
            (self.0)()
        }
    }

    fn alice() -> Result<LoginResponse, ApiError> {
        Ok(serde_json::from_value(serde_json::json!({
            "accessToken": "abc",
            "id": 1,
            "username": "alice",
            "email": "a@x.com",
            "phone": "1",
            "balance": 0,
            "roles": ["user"]
        }))
        .expect("fixture should parse"))
    }

    fn no_token() -> Result<LoginResponse, ApiError> {
        Ok(serde_json::from_value(serde_json::json!({"id": 1, "username": "alice"})).unwrap())
    }

    fn timed_out() -> Result<LoginResponse, ApiError> {
        Err(ApiError::Timeout)
    }

    fn revoked() -> Result<LoginResponse, ApiError> {
        Err(ApiError::Unauthorized(Some("Token has been revoked".to_string())))
    }

    /// Persistence whose writes always fail.
    struct ReadOnly;

    impl SessionPersistence for ReadOnly {
        fn load(&self) -> anyhow::Result<Option<SessionData>> {
            Ok(None)
        }

        fn save(&self, _: &SessionData) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    fn store() -> (SessionStore, Arc<MemoryStore>, Arc<NotificationLog>) {
        let persistence = Arc::new(MemoryStore::new());
        let log = Arc::new(NotificationLog::new());
        let store = SessionStore::open(persistence.clone(), log.clone());
        (store, persistence, log)
    }

    fn assert_invariant(store: &SessionStore) {
        let data = store.snapshot();
        assert_eq!(store.is_logged_in(), !data.token.is_empty());
        assert!(data.is_consistent());
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let (store, persistence, log) = store();
        let creds = LoginRequest::new("alice", "pw");
        assert_invariant(&store);

        assert!(store.login(&Canned(alice), &creds).await);
        assert_invariant(&store);
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert_eq!(store.user().unwrap().username, "alice");
        assert!(persistence.raw().unwrap().contains(r#""token":"abc""#));

        store.logout();
        assert_invariant(&store);
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert_eq!(persistence.load().unwrap(), Some(SessionData::default()));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_does_not_save() {
        let (store, persistence, _) = store();
        store.logout();
        store.logout();
        assert!(persistence.raw().is_none());
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn test_missing_token_is_a_failed_login() {
        let (store, _, log) = store();
        assert!(!store.login(&Canned(no_token), &LoginRequest::new("alice", "pw")).await);
        assert!(!store.is_logged_in());

        let notes = log.snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, Level::Error);
        assert_eq!(notes[0].message, LOGIN_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_failed_login_drops_existing_session() {
        let (store, _, log) = store();
        let creds = LoginRequest::new("alice", "pw");
        assert!(store.login(&Canned(alice), &creds).await);

        assert!(!store.login(&Canned(timed_out), &creds).await);
        assert_invariant(&store);
        assert!(!store.is_logged_in());
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_login_still_reports_an_error() {
        let (store, _, log) = store();
        assert!(!store.login(&Canned(revoked), &LoginRequest::new("alice", "pw")).await);

        let notes = log.snapshot();
        assert_eq!(notes, vec![Notification::error("Token has been revoked")]);
    }

    #[tokio::test]
    async fn test_save_failure_does_not_block_transitions() {
        let log = Arc::new(NotificationLog::new());
        let store = SessionStore::open(ReadOnly, log.clone());

        assert!(store.login(&Canned(alice), &LoginRequest::new("alice", "pw")).await);
        assert!(matches!(store.state(), SessionState::Authenticated { .. }));
        assert_eq!(store.token().as_deref(), Some("abc"));

        store.logout();
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert_invariant(&store);
        assert!(log.is_empty());
    }

    #[test]
    fn test_inconsistent_record_starts_logged_out() {
        let persistence = MemoryStore::with_raw(
            r#"{"token":"","user":{"id":1,"username":"ghost"}}"#,
        );
        let store = SessionStore::open(persistence, Arc::new(NotificationLog::new()));
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert!(store.user().is_none());
    }

    #[test]
    fn test_corrupt_record_starts_logged_out() {
        let persistence = MemoryStore::with_raw("not json at all");
        let store = SessionStore::open(persistence, Arc::new(NotificationLog::new()));
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_debug_hides_token() {
        let data = SessionData {
            token: "secret-token".into(),
            user: None,
            logged_in_at: None,
        };
        assert!(!format!("{:?}", data).contains("secret-token"));
    }
}
