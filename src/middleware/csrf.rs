use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{request::Parts, Extensions, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::overrides::{CsrfCheck, CsrfOverrides};
use crate::error::{CsrfError, Result};
use crate::policy::CsrfPolicy;
use crate::storage::{CsrfStorage, RequestScope};

pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_SESSION_KEY: &str = "csrf_token";
pub const CSRF_FORM_FIELD: &str = "_csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Builds the response sent when verification fails.
pub type ErrorRenderer = Arc<dyn Fn() -> Response + Send + Sync>;

/// Request-scoped access to the token storage.
///
/// Inserted into the request extensions by [`csrf_middleware`]. Clones share
/// the same per-request token cache.
#[derive(Clone)]
pub struct CsrfHandle {
    storage: Arc<dyn CsrfStorage>,
    scope: Arc<RequestScope>,
}

impl CsrfHandle {
    pub fn new(storage: Arc<dyn CsrfStorage>, scope: RequestScope) -> Self {
        Self {
            storage,
            scope: Arc::new(scope),
        }
    }

    /// Token currently stored for the client.
    pub async fn get_token(&self) -> Result<Option<String>> {
        self.storage.get(&self.scope).await
    }

    /// Token to embed in forms; the same value for the whole request.
    pub fn generate_token(&self) -> String {
        self.storage.generate_new_token(&self.scope)
    }

    async fn save_token(&self, response: &mut Response) -> Result<()> {
        self.storage.save_token(&self.scope, response).await
    }
}

impl std::fmt::Debug for CsrfHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfHandle")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<S> FromRequestParts<S> for CsrfHandle
where
    S: Send + Sync,
{
    type Rejection = CsrfError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        handle(&parts.extensions)
    }
}

fn handle(extensions: &Extensions) -> Result<CsrfHandle> {
    extensions
        .get::<CsrfHandle>()
        .cloned()
        .ok_or(CsrfError::MiddlewareNotInstalled)
}

/// Token currently stored for the client of this request
pub async fn get_token(extensions: &Extensions) -> Result<Option<String>> {
    let handle = handle(extensions)?;
    handle.get_token().await
}

/// Token for this request, generated on first use and saved on the response
pub fn generate_token(extensions: &Extensions) -> Result<String> {
    Ok(handle(extensions)?.generate_token())
}

/// Guard configuration, shared by every request.
pub struct CsrfMiddleware {
    policy: Arc<dyn CsrfPolicy>,
    storage: Arc<dyn CsrfStorage>,
    global_mode: bool,
    methods: Vec<Method>,
    overrides: CsrfOverrides,
    error_renderer: ErrorRenderer,
}

impl CsrfMiddleware {
    pub fn new(policy: impl CsrfPolicy + 'static, storage: impl CsrfStorage + 'static) -> Self {
        Self::from_shared(Arc::new(policy), Arc::new(storage))
    }

    /// Same as `new`, for components chosen at runtime.
    pub fn from_shared(policy: Arc<dyn CsrfPolicy>, storage: Arc<dyn CsrfStorage>) -> Self {
        Self {
            policy,
            storage,
            global_mode: false,
            methods: vec![Method::POST, Method::PUT, Method::DELETE],
            overrides: CsrfOverrides::default(),
            error_renderer: Arc::new(|| StatusCode::FORBIDDEN.into_response()),
        }
    }

    /// Check every handler without an explicit override
    pub fn global_mode(mut self, enabled: bool) -> Self {
        self.global_mode = enabled;
        self
    }

    /// Methods that are verified at all
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn overrides(mut self, overrides: CsrfOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn error_renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn() -> Response + Send + Sync + 'static,
    {
        self.error_renderer = Arc::new(renderer);
        self
    }

    /// Resolve whether a request must pass verification.
    ///
    /// An explicit override beats the global mode; the method filter applies
    /// to whatever that yields.
    pub fn needs_check(&self, method: &Method, route: Option<&str>) -> bool {
        let required = route
            .and_then(|route| self.overrides.lookup(method, route))
            .map_or(self.global_mode, |check| check == CsrfCheck::Required);

        required && self.methods.contains(method)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl std::fmt::Debug for CsrfMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfMiddleware")
            .field("global_mode", &self.global_mode)
            .field("methods", &self.methods)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// Middleware enforcing the CSRF check on state-changing requests
///
/// Install with `axum::middleware::from_fn_with_state` through
/// `Router::layer`, inside the session layer when using session storage.
/// Per-handler overrides are resolved against the matched route.
pub async fn csrf_middleware(
    State(guard): State<Arc<CsrfMiddleware>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let handle = CsrfHandle::new(
        guard.storage.clone(),
        RequestScope::from_request_parts(request.headers(), request.extensions()),
    );
    request.extensions_mut().insert(handle.clone());

    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());

    if guard.needs_check(&method, route.as_deref()) {
        debug!("Validating CSRF for {} {:?}", method, route);

        let original_token = handle.get_token().await?;
        let is_valid = guard
            .policy
            .check(&mut request, original_token.as_deref())
            .await?;

        if !is_valid {
            warn!("CSRF check failed for {} {}", method, request.uri().path());
            return Ok((guard.error_renderer)());
        }
    }

    let mut response = next.run(request).await;

    // Upgraded connections no longer belong to this response
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        handle.save_token(&mut response).await?;
    }

    Ok(response)
}
