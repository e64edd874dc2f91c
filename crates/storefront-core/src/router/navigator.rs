use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::SessionStore;

use super::guard::REDIRECT_PARAM;
use super::{Decision, Location, NavigationGuard, RouteTable, LOGIN_ROUTE};

/// Login path used when the route table has no `login` route.
const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No route matches {0}")]
    NotFound(String),
}

struct Inner {
    routes: RouteTable,
    guard: NavigationGuard,
    session: SessionStore,
    history: RwLock<Vec<Location>>,
}

/// Tracks the current location and runs every transition through the guard.
///
/// Clone is cheap; clones share the same history.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<Inner>,
}

impl Navigator {
    pub fn new(routes: RouteTable, session: SessionStore) -> Self {
        let login_path = routes
            .by_name(LOGIN_ROUTE)
            .map(|r| r.path.clone())
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        Self {
            inner: Arc::new(Inner {
                routes,
                guard: NavigationGuard::new(login_path),
                session,
                history: RwLock::new(vec![Location::new("/")]),
            }),
        }
    }

    pub fn current(&self) -> Location {
        self.inner
            .history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    /// Navigate to `target`, adding a history entry.
    pub fn push(&self, target: &str) -> Result<Location, NavigationError> {
        let location = self.resolve(Location::parse(target))?;
        self.inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.clone());
        Ok(location)
    }

    /// Navigate to `target`, replacing the current history entry.
    pub fn replace(&self, target: Location) -> Result<Location, NavigationError> {
        let location = self.resolve(target)?;
        let mut history = self
            .inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        history.pop();
        history.push(location.clone());
        Ok(location)
    }

    /// Go back one entry. The first entry is never removed.
    pub fn back(&self) -> Location {
        let mut history = self
            .inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if history.len() > 1 {
            history.pop();
        }
        history.last().cloned().unwrap_or_default()
    }

    /// Send the user to the login page, remembering the current location.
    /// Does nothing if already there.
    pub fn redirect_to_login(&self) {
        let current = self.current();
        if self.is_login(&current) {
            debug!(location = %current, "Already on login page");
            return;
        }
        let login = self.inner.guard.login_location(&current.full_path());
        info!(from = %current, "Redirecting to login");
        self.commit_replace(login);
    }

    /// After logging in, continue to the location the login page was asked
    /// to return to, or home.
    pub fn resume_after_login(&self) -> Result<Location, NavigationError> {
        let current = self.current();
        let target = current
            .query_value(REDIRECT_PARAM)
            .filter(|_| self.is_login(&current))
            .filter(|t| is_local_path(t))
            .unwrap_or("/")
            .to_string();
        self.replace(Location::parse(&target))
    }

    fn is_login(&self, location: &Location) -> bool {
        self.inner
            .routes
            .resolve(&location.path)
            .is_some_and(|r| r.name == LOGIN_ROUTE)
    }

    fn resolve(&self, target: Location) -> Result<Location, NavigationError> {
        let route = self
            .inner
            .routes
            .resolve(&target.path)
            .ok_or_else(|| NavigationError::NotFound(target.path.clone()))?;

        match self
            .inner
            .guard
            .check(route, &target, self.inner.session.is_logged_in())
        {
            Decision::Allow => {
                debug!(location = %target, route = %route.name, "Navigation allowed");
                Ok(target)
            }
            Decision::Redirect(login) => {
                info!(requested = %target, "Protected route requires login");
                Ok(login)
            }
        }
    }

    fn commit_replace(&self, location: Location) {
        let mut history = self
            .inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        history.pop();
        history.push(location);
    }
}

/// Only same-origin paths are followed; `//host/...` would leave the site.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
