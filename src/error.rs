use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

// Type alias for Result with our CsrfError
pub type Result<T> = std::result::Result<T, CsrfError>;

/// Errors raised by the CSRF guard and its components.
///
/// A failed token check is *not* an error: the guard answers it with the
/// configured rejection response. Everything here is either a setup mistake
/// or a failure of a collaborator (session backend, request body).
#[derive(Debug, Error)]
pub enum CsrfError {
    /// A component was built with unusable settings
    ///
    /// Raised at construction time only, e.g. a hashed generator without a
    /// secret phrase or a header policy with an invalid header name.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// `get_token`/`generate_token` was called on a request the guard never saw
    #[error("Install the CSRF middleware on this router before requesting tokens")]
    MiddlewareNotInstalled,

    /// Session storage was used without a `tower-sessions` layer in front of the guard
    #[error("Session storage requires the tower-sessions layer to be installed")]
    SessionNotInstalled,

    /// The session backend failed while reading or writing the token
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The request body could not be buffered for form verification
    #[error("Failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The token could not be written into a `Set-Cookie` header
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        let (status, error_code, description) = match self {
            CsrfError::Body(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "The request body could not be read",
            ),
            CsrfError::Configuration(_)
            | CsrfError::MiddlewareNotInstalled
            | CsrfError::SessionNotInstalled
            | CsrfError::Session(_)
            | CsrfError::InvalidCookie(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred",
            ),
        };

        let body = json!({
            "error": error_code,
            "error_description": description,
        });

        (status, Json(body)).into_response()
    }
}
