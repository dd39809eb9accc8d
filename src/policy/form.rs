use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap},
};
use tracing::debug;

use super::{tokens_match, CsrfPolicy};
use crate::error::{CsrfError, Result};

/// Same default as axum's `DefaultBodyLimit`.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Reads the token from a field of a url-encoded or multipart form body.
#[derive(Debug, Clone)]
pub struct FormPolicy {
    field_name: String,
    body_limit: usize,
}

impl FormPolicy {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

/// Body encodings the policy knows how to read a field from.
#[derive(Debug, PartialEq, Eq)]
enum FormEncoding {
    UrlEncoded,
    Multipart { boundary: String },
}

fn form_encoding(headers: &HeaderMap) -> Option<FormEncoding> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())?;
    let mime = content_type.split(';').next()?.trim();

    if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(FormEncoding::UrlEncoded)
    } else if mime.eq_ignore_ascii_case("multipart/form-data") {
        multer::parse_boundary(content_type)
            .ok()
            .map(|boundary| FormEncoding::Multipart { boundary })
    } else {
        None
    }
}

/// First non-file part named `field_name`. Malformed bodies yield `None`.
async fn multipart_field(bytes: Bytes, boundary: &str, field_name: &str) -> Option<String> {
    let stream = Body::from(bytes).into_data_stream();
    let mut multipart = multer::Multipart::new(stream, boundary);

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some(field_name) && field.file_name().is_none() {
                    return field.text().await.ok();
                }
            }
            Ok(None) => return None,
            Err(e) => {
                debug!("Malformed multipart body: {}", e);
                return None;
            }
        }
    }
}

#[async_trait]
impl CsrfPolicy for FormPolicy {
    async fn check(&self, request: &mut Request, expected: Option<&str>) -> Result<bool> {
        if expected.is_none() {
            debug!("No stored CSRF token to compare the form field against");
            return Ok(false);
        }

        let Some(encoding) = form_encoding(request.headers()) else {
            debug!("Request body is not a form");
            return Ok(false);
        };

        // Buffer the body so the handler can still extract the form afterwards
        let body = std::mem::take(request.body_mut());
        let bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(CsrfError::Body)?;

        let submitted = match &encoding {
            FormEncoding::UrlEncoded => form_urlencoded::parse(&bytes)
                .find(|(key, _)| key == self.field_name.as_str())
                .map(|(_, value)| value.into_owned()),
            FormEncoding::Multipart { boundary } => {
                multipart_field(bytes.clone(), boundary, &self.field_name).await
            }
        };

        *request.body_mut() = Body::from(bytes);

        Ok(tokens_match(submitted.as_deref(), expected))
    }
}
