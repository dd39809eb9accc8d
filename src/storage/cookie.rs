use async_trait::async_trait;
use axum::{
    http::{header, HeaderValue},
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::{CsrfStorage, RequestScope};
use crate::error::{CsrfError, Result};
use crate::token_generator::{SimpleTokenGenerator, TokenGenerator};

/// Keeps the token in a cookie on the client.
///
/// The cookie value is the raw token. Attributes default to `Path=/` and
/// nothing else; `Secure`, `HttpOnly`, `SameSite`, `Domain` and `Max-Age`
/// are opt-in.
pub struct CookieStorage {
    cookie_name: String,
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
    max_age: Option<Duration>,
    issue_when_missing: bool,
    token_generator: Box<dyn TokenGenerator>,
}

impl CookieStorage {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
            max_age: None,
            issue_when_missing: false,
            token_generator: Box::new(SimpleTokenGenerator),
        }
    }

    pub fn with_token_generator(mut self, generator: impl TokenGenerator + 'static) -> Self {
        self.token_generator = Box::new(generator);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn issue_when_missing(mut self, enabled: bool) -> Self {
        self.issue_when_missing = enabled;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn build_cookie(&self, token: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((self.cookie_name.clone(), token.to_owned()))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only);

        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }
        if let Some(max_age) = self.max_age {
            builder = builder.max_age(max_age);
        }

        builder.build()
    }
}

impl std::fmt::Debug for CookieStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStorage")
            .field("cookie_name", &self.cookie_name)
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("max_age", &self.max_age)
            .field("issue_when_missing", &self.issue_when_missing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CsrfStorage for CookieStorage {
    fn token_generator(&self) -> &dyn TokenGenerator {
        self.token_generator.as_ref()
    }

    fn issues_when_missing(&self) -> bool {
        self.issue_when_missing
    }

    async fn get(&self, scope: &RequestScope) -> Result<Option<String>> {
        Ok(scope
            .cookies()
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty()))
    }

    async fn persist(
        &self,
        _scope: &RequestScope,
        response: &mut Response,
        token: &str,
    ) -> Result<()> {
        let cookie = self.build_cookie(token);
        let header_value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| CsrfError::InvalidCookie(e.to_string()))?;

        response
            .headers_mut()
            .append(header::SET_COOKIE, header_value);

        Ok(())
    }
}
