pub mod csrf;
pub mod overrides;

pub use csrf::{
    csrf_middleware, generate_token, get_token, CsrfHandle, CsrfMiddleware, ErrorRenderer,
    CSRF_COOKIE_NAME, CSRF_FORM_FIELD, CSRF_HEADER, CSRF_SESSION_KEY,
};
pub use overrides::{CsrfCheck, CsrfOverrides};
