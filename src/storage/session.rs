use async_trait::async_trait;
use axum::response::Response;
use tower_sessions::Session;
use tracing::warn;

use super::{CsrfStorage, RequestScope};
use crate::error::{CsrfError, Result};
use crate::token_generator::{SimpleTokenGenerator, TokenGenerator};

/// Keeps the token under a single key of the `tower-sessions` record.
///
/// The session layer must run in front of the guard; persistence of the
/// record itself is left to the session layer.
pub struct SessionStorage {
    session_key: String,
    issue_when_missing: bool,
    token_generator: Box<dyn TokenGenerator>,
}

impl SessionStorage {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            issue_when_missing: false,
            token_generator: Box::new(SimpleTokenGenerator),
        }
    }

    pub fn with_token_generator(mut self, generator: impl TokenGenerator + 'static) -> Self {
        self.token_generator = Box::new(generator);
        self
    }

    pub fn issue_when_missing(mut self, enabled: bool) -> Self {
        self.issue_when_missing = enabled;
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    fn session<'a>(&self, scope: &'a RequestScope) -> Result<&'a Session> {
        scope.session().ok_or_else(|| {
            warn!("Session storage used on a request without a session layer");
            CsrfError::SessionNotInstalled
        })
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("session_key", &self.session_key)
            .field("issue_when_missing", &self.issue_when_missing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CsrfStorage for SessionStorage {
    fn token_generator(&self) -> &dyn TokenGenerator {
        self.token_generator.as_ref()
    }

    fn issues_when_missing(&self) -> bool {
        self.issue_when_missing
    }

    async fn get(&self, scope: &RequestScope) -> Result<Option<String>> {
        let session = self.session(scope)?;
        Ok(session.get::<String>(&self.session_key).await?)
    }

    async fn persist(
        &self,
        scope: &RequestScope,
        _response: &mut Response,
        token: &str,
    ) -> Result<()> {
        let session = self.session(scope)?;
        session.insert(&self.session_key, token).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_generator::MockTokenGenerator;
    use axum::body::Body;
    use axum_extra::extract::cookie::CookieJar;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn new_session() -> Session {
        let store = Arc::new(MemoryStore::default());
        Session::new(None, store, None)
    }

    #[tokio::test]
    async fn test_round_trip_through_session() {
        let storage = SessionStorage::new("csrf_token");
        let session = new_session();

        let first = RequestScope::new(CookieJar::new(), Some(session.clone()));
        assert_eq!(storage.get(&first).await.unwrap(), None);

        let token = storage.generate_new_token(&first);
        let mut response = Response::new(Body::empty());
        storage.save_token(&first, &mut response).await.unwrap();

        let stored: Option<String> = session.get("csrf_token").await.unwrap();
        assert_eq!(stored.as_deref(), Some(token.as_str()));

        let second = RequestScope::new(CookieJar::new(), Some(session));
        assert_eq!(storage.get(&second).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_generate_does_not_touch_session_until_saved() {
        let mut generator = MockTokenGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|| "session-token".to_string());

        let storage = SessionStorage::new("csrf_token").with_token_generator(generator);
        let session = new_session();
        let scope = RequestScope::new(CookieJar::new(), Some(session.clone()));

        storage.generate_new_token(&scope);
        storage.generate_new_token(&scope);
        storage.generate_new_token(&scope);

        let stored: Option<String> = session.get("csrf_token").await.unwrap();
        assert_eq!(stored, None);
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_an_error() {
        let storage = SessionStorage::new("csrf_token");
        let scope = RequestScope::new(CookieJar::new(), None);

        assert!(matches!(
            storage.get(&scope).await,
            Err(CsrfError::SessionNotInstalled)
        ));

        storage.generate_new_token(&scope);
        let mut response = Response::new(Body::empty());
        assert!(matches!(
            storage.save_token(&scope, &mut response).await,
            Err(CsrfError::SessionNotInstalled)
        ));
    }
}
