/// Name of the route unauthenticated users are sent to.
pub const LOGIN_ROUTE: &str = "login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    /// Path pattern; segments starting with `:` match any single segment.
    pub path: String,
    pub requires_auth: bool,
}

impl Route {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            requires_auth: false,
        }
    }

    /// Mark the route as reachable only with a session.
    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        let pattern: Vec<&str> = segments(&self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        pattern.len() == actual.len()
            && pattern
                .iter()
                .zip(&actual)
                .all(|(p, a)| p.starts_with(':') || p == a)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// First route whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            Route::new("home", "/"),
            Route::new("product-detail", "/product/:id"),
            Route::new(LOGIN_ROUTE, "/login"),
            Route::new("register", "/register"),
            Route::new("orders", "/orders").protected(),
            Route::new("profile", "/profile").protected(),
        ])
    }
}
