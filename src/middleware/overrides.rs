use std::collections::HashMap;

use axum::http::Method;

/// Explicit per-handler enforcement, overriding the global mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfCheck {
    /// Always verify, even with global mode off
    Required,
    /// Never verify, even with global mode on
    NotRequired,
}

/// Per-handler annotations, keyed by the route pattern the handler is
/// mounted on (as reported by axum's `MatchedPath`).
///
/// A method-specific entry wins over an entry covering every method of
/// the same route. Routes without an entry are unset and follow the
/// global mode.
#[derive(Debug, Clone, Default)]
pub struct CsrfOverrides {
    routes: HashMap<(Option<Method>, String), CsrfCheck>,
}

impl CsrfOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always check every handler on `route`.
    pub fn require(self, route: impl Into<String>) -> Self {
        self.with(None, route, CsrfCheck::Required)
    }

    /// Never check any handler on `route`.
    pub fn exempt(self, route: impl Into<String>) -> Self {
        self.with(None, route, CsrfCheck::NotRequired)
    }

    /// Always check the `method` handler on `route`.
    pub fn require_on(self, method: Method, route: impl Into<String>) -> Self {
        self.with(Some(method), route, CsrfCheck::Required)
    }

    /// Never check the `method` handler on `route`.
    pub fn exempt_on(self, method: Method, route: impl Into<String>) -> Self {
        self.with(Some(method), route, CsrfCheck::NotRequired)
    }

    fn with(mut self, method: Option<Method>, route: impl Into<String>, check: CsrfCheck) -> Self {
        self.routes.insert((method, route.into()), check);
        self
    }

    pub fn lookup(&self, method: &Method, route: &str) -> Option<CsrfCheck> {
        self.routes
            .get(&(Some(method.clone()), route.to_owned()))
            .or_else(|| self.routes.get(&(None, route.to_owned())))
            .copied()
    }
}
