use super::{Location, Route};

/// Query parameter carrying the path to return to after logging in.
pub const REDIRECT_PARAM: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Location),
}

/// Keeps unauthenticated users out of protected routes.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    login_path: String,
}

impl NavigationGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// Login location that returns to `return_to` afterwards.
    pub fn login_location(&self, return_to: &str) -> Location {
        Location::new(self.login_path.clone()).with_query(REDIRECT_PARAM, return_to)
    }

    /// Decide on a transition using the session state at this instant.
    pub fn check(&self, route: &Route, target: &Location, logged_in: bool) -> Decision {
        if route.requires_auth && !logged_in {
            Decision::Redirect(self.login_location(&target.full_path()))
        } else {
            Decision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_route_redirects_when_logged_out() {
        let guard = NavigationGuard::new("/login");
        let route = Route::new("orders", "/orders").protected();
        let target = Location::parse("/orders?page=2");

        match guard.check(&route, &target, false) {
            Decision::Redirect(loc) => {
                assert_eq!(loc.path, "/login");
                assert_eq!(loc.query_value(REDIRECT_PARAM), Some("/orders?page=2"));
            }
            Decision::Allow => panic!("expected redirect"),
        }
        assert_eq!(guard.check(&route, &target, true), Decision::Allow);
    }

    #[test]
    fn test_public_route_always_allowed() {
        let guard = NavigationGuard::new("/login");
        let route = Route::new("home", "/");
        let target = Location::new("/");
        assert_eq!(guard.check(&route, &target, false), Decision::Allow);
        assert_eq!(guard.check(&route, &target, true), Decision::Allow);
    }
}
