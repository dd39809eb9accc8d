use std::{env, sync::Arc};

use axum::http::Method;
use axum_extra::extract::cookie::SameSite;
use tower_sessions::{cookie::SameSite as SessionSameSite, MemoryStore, SessionManagerLayer};
use tracing::warn;

use super::{env_flag_enabled, env_or, is_production};
use crate::error::{CsrfError, Result};
use crate::middleware::{
    CsrfMiddleware, CsrfOverrides, CSRF_COOKIE_NAME, CSRF_FORM_FIELD, CSRF_HEADER,
    CSRF_SESSION_KEY,
};
use crate::policy::{CsrfPolicy, FormPolicy, HeaderPolicy};
use crate::storage::{CookieStorage, CsrfStorage, SessionStorage};
use crate::token_generator::{HashedTokenGenerator, SimpleTokenGenerator, TokenGenerator};

/// Process-wide guard settings, read once at startup.
#[derive(Clone)]
pub struct CsrfConfig {
    pub production: bool,
    pub global_mode: bool,
    pub methods: Vec<Method>,
    pub secret_phrase: Option<String>,
    pub cookie_name: String,
    pub session_key: String,
    pub form_field: String,
    pub header_name: String,
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("production", &self.production)
            .field("global_mode", &self.global_mode)
            .field("methods", &self.methods)
            .field(
                "secret_phrase",
                &self.secret_phrase.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cookie_name", &self.cookie_name)
            .field("session_key", &self.session_key)
            .field("form_field", &self.form_field)
            .field("header_name", &self.header_name)
            .finish()
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            production: false,
            global_mode: false,
            methods: vec![Method::POST, Method::PUT, Method::DELETE],
            secret_phrase: None,
            cookie_name: CSRF_COOKIE_NAME.to_string(),
            session_key: CSRF_SESSION_KEY.to_string(),
            form_field: CSRF_FORM_FIELD.to_string(),
            header_name: CSRF_HEADER.to_string(),
        }
    }
}

fn parse_methods(value: &str) -> Result<Vec<Method>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|method| !method.is_empty())
        .map(|method| {
            Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                CsrfError::Configuration(format!("Invalid HTTP method in CSRF_METHODS: {method}"))
            })
        })
        .collect()
}

impl CsrfConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let methods = match env::var("CSRF_METHODS") {
            Ok(value) if !value.trim().is_empty() => parse_methods(&value)?,
            _ => defaults.methods,
        };

        let secret_phrase = env::var("CSRF_SECRET_PHRASE")
            .ok()
            .filter(|secret| !secret.is_empty());

        let config = Self {
            production: is_production(),
            global_mode: env_flag_enabled("CSRF_GLOBAL_MODE"),
            methods,
            secret_phrase,
            cookie_name: env_or("CSRF_COOKIE_NAME", &defaults.cookie_name),
            session_key: env_or("CSRF_SESSION_KEY", &defaults.session_key),
            form_field: env_or("CSRF_FORM_FIELD", &defaults.form_field),
            header_name: env_or("CSRF_HEADER_NAME", &defaults.header_name),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(CsrfError::Configuration(
                "CSRF_METHODS must name at least one method".to_string(),
            ));
        }

        if self.production && self.secret_phrase.is_none() {
            return Err(CsrfError::Configuration(
                "CSRF_SECRET_PHRASE must be set in production".to_string(),
            ));
        }

        if self.secret_phrase.is_none() {
            warn!("CSRF_SECRET_PHRASE not set; using plain random tokens");
        }

        Ok(())
    }

    /// Hashed generator when a secret phrase is configured, plain otherwise.
    pub fn token_generator(&self) -> Result<Box<dyn TokenGenerator>> {
        Ok(match &self.secret_phrase {
            Some(secret) => Box::new(HashedTokenGenerator::new(secret.clone())?),
            None => Box::new(SimpleTokenGenerator),
        })
    }

    pub fn cookie_storage(&self) -> Result<CookieStorage> {
        Ok(CookieStorage::new(self.cookie_name.clone())
            .with_token_generator(self.token_generator()?)
            .with_secure(self.production)
            .with_same_site(SameSite::Lax))
    }

    pub fn session_storage(&self) -> Result<SessionStorage> {
        Ok(SessionStorage::new(self.session_key.clone())
            .with_token_generator(self.token_generator()?))
    }

    pub fn form_policy(&self) -> FormPolicy {
        FormPolicy::new(self.form_field.clone())
    }

    pub fn header_policy(&self) -> Result<HeaderPolicy> {
        HeaderPolicy::new(&self.header_name)
    }

    /// In-memory session layer for routers using session storage.
    ///
    /// Must wrap the guard; the session cookie is `Secure` in production.
    pub fn session_layer(&self) -> SessionManagerLayer<MemoryStore> {
        SessionManagerLayer::new(MemoryStore::default())
            .with_secure(self.production)
            .with_http_only(true)
            .with_same_site(SessionSameSite::Lax)
    }

    /// Guard with this config's global mode and methods.
    pub fn middleware(
        &self,
        policy: Arc<dyn CsrfPolicy>,
        storage: Arc<dyn CsrfStorage>,
        overrides: CsrfOverrides,
    ) -> CsrfMiddleware {
        CsrfMiddleware::from_shared(policy, storage)
            .global_mode(self.global_mode)
            .methods(self.methods.iter().cloned())
            .overrides(overrides)
    }
}
