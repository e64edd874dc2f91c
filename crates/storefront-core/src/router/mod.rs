//! Client-side routing with an authentication guard.
//!
//! Routes flagged `requires_auth` are only reachable with a session; any
//! other attempt is redirected to the login page with a `redirect` query
//! parameter holding the requested path.

pub mod guard;
pub mod location;
pub mod navigator;
pub mod route;

pub use guard::{Decision, NavigationGuard, REDIRECT_PARAM};
pub use location::Location;
pub use navigator::{NavigationError, Navigator};
pub use route::{Route, RouteTable, LOGIN_ROUTE};
