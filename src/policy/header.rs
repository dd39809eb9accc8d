use async_trait::async_trait;
use axum::{extract::Request, http::HeaderName};

use super::{tokens_match, CsrfPolicy};
use crate::error::{CsrfError, Result};

/// Reads the token from a request header, for AJAX clients.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    header_name: HeaderName,
}

impl HeaderPolicy {
    pub fn new(header_name: impl AsRef<str>) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_ref().as_bytes())
            .map_err(|e| CsrfError::Configuration(format!("Invalid CSRF header name: {e}")))?;

        Ok(Self { header_name })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }
}

#[async_trait]
impl CsrfPolicy for HeaderPolicy {
    async fn check(&self, request: &mut Request, expected: Option<&str>) -> Result<bool> {
        let submitted = request
            .headers()
            .get(&self.header_name)
            .and_then(|value| value.to_str().ok());

        Ok(tokens_match(submitted, expected))
    }
}
