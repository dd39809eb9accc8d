pub mod form;
pub mod header;

pub use form::FormPolicy;
pub use header::HeaderPolicy;

use async_trait::async_trait;
use axum::extract::Request;
use subtle::ConstantTimeEq;

use crate::error::Result;

/// Extracts the token the client submitted and compares it to the stored one.
///
/// A policy may read the body, but must leave the request usable for the
/// handler that runs after a successful check.
#[async_trait]
pub trait CsrfPolicy: Send + Sync {
    async fn check(&self, request: &mut Request, expected: Option<&str>) -> Result<bool>;
}

/// True iff both tokens are present and equal.
///
/// Byte comparison runs in constant time for equal-length inputs.
pub fn tokens_match(submitted: Option<&str>, expected: Option<&str>) -> bool {
    match (submitted, expected) {
        (Some(submitted), Some(expected)) => {
            submitted.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}
