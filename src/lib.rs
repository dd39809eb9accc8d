//! Cross-site request forgery guard for axum routers.
//!
//! State-changing requests must echo back a token previously issued to the
//! same client. The token lives in a cookie or in the `tower-sessions`
//! record ([`storage`]), is resubmitted in a form field or a header
//! ([`policy`]), and the [`middleware`] checks one against the other before
//! the handler runs.
//!
//! ```rust,no_run
//! use axum::{middleware, routing::post, Router};
//! use csrf_guard::{
//!     middleware::{csrf_middleware, CsrfMiddleware, CsrfOverrides},
//!     policy::FormPolicy,
//!     storage::CookieStorage,
//! };
//!
//! let guard = CsrfMiddleware::new(FormPolicy::new("_csrf_token"), CookieStorage::new("csrf_token"))
//!     .global_mode(true)
//!     .overrides(CsrfOverrides::new().exempt("/webhook"))
//!     .into_shared();
//!
//! let app: Router = Router::new()
//!     .route("/webhook", post(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(guard, csrf_middleware));
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod storage;
pub mod token_generator;

pub use error::{CsrfError, Result};
pub use middleware::{
    csrf_middleware, generate_token, get_token, CsrfCheck, CsrfHandle, CsrfMiddleware,
    CsrfOverrides,
};
