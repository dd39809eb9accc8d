pub mod cookie;
pub mod session;

pub use cookie::CookieStorage;
pub use session::SessionStorage;

use async_trait::async_trait;
use axum::{
    http::{Extensions, HeaderMap},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use once_cell::sync::OnceCell;
use tower_sessions::Session;
use tracing::debug;

use crate::error::Result;
use crate::token_generator::TokenGenerator;

/// Shortened token for log lines.
pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Everything a storage needs to know about the current request.
///
/// Built once per request by the guard. Holds the incoming cookies, the
/// bound session (when a session layer runs in front of the guard) and the
/// single-assignment cell for the token generated during this request.
#[derive(Debug)]
pub struct RequestScope {
    cookies: CookieJar,
    session: Option<Session>,
    new_token: OnceCell<String>,
}

impl RequestScope {
    pub fn new(cookies: CookieJar, session: Option<Session>) -> Self {
        Self {
            cookies,
            session,
            new_token: OnceCell::new(),
        }
    }

    pub fn from_request_parts(headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self::new(
            CookieJar::from_headers(headers),
            extensions.get::<Session>().cloned(),
        )
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Token generated during this request, if any.
    pub fn new_token(&self) -> Option<&str> {
        self.new_token.get().map(String::as_str)
    }
}

/// Where the durable copy of the token lives between requests.
///
/// Implementors provide the slot primitives `get` and `persist`; token
/// generation and the save-at-end-of-request protocol are shared.
#[async_trait]
pub trait CsrfStorage: Send + Sync {
    fn token_generator(&self) -> &dyn TokenGenerator;

    /// Seed clients that have no token yet, even if no handler asked for one.
    fn issues_when_missing(&self) -> bool {
        false
    }

    /// Token currently stored for this client, without generating one.
    async fn get(&self, scope: &RequestScope) -> Result<Option<String>>;

    /// Write `token` into the durable slot.
    async fn persist(&self, scope: &RequestScope, response: &mut Response, token: &str)
        -> Result<()>;

    /// Token for this request, generated at most once per request.
    ///
    /// The durable slot is left alone until `save_token`.
    fn generate_new_token(&self, scope: &RequestScope) -> String {
        scope
            .new_token
            .get_or_init(|| {
                let token = self.token_generator().generate();
                debug!("Generated new CSRF token: {}", token_prefix(&token));
                token
            })
            .clone()
    }

    /// Persist the token generated during this request, if there was one.
    async fn save_token(&self, scope: &RequestScope, response: &mut Response) -> Result<()> {
        let token = match scope.new_token() {
            Some(token) => token.to_owned(),
            None if self.issues_when_missing() && self.get(scope).await?.is_none() => {
                self.generate_new_token(scope)
            }
            None => return Ok(()),
        };

        debug!("Persisting CSRF token: {}", token_prefix(&token));
        self.persist(scope, response, &token).await
    }
}
