#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    middleware,
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::Cookie;
use csrf_guard::{
    csrf_middleware, policy::CsrfPolicy, storage::CsrfStorage, CsrfHandle, CsrfMiddleware,
    CsrfOverrides,
};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub const FORM_FIELD_NAME: &str = "_csrf_token";
pub const HEADER_NAME: &str = "X-CSRF-TOKEN";
pub const COOKIE_NAME: &str = "csrf_token";
pub const SESSION_NAME: &str = "csrf_token";
pub const MULTIPART_BOUNDARY: &str = "csrf-test-boundary";

/// Minimal browser: keeps cookies between requests.
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<Cookie<'static>>,
    pub body: String,
}

impl TestResponse {
    pub fn set_cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.set_cookies.iter().find(|cookie| cookie.name() == name)
    }
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, cookie_header.parse().unwrap());
        }

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router to respond");

        self.read(response).await
    }

    async fn read(&mut self, response: Response<Body>) -> TestResponse {
        let status = response.status();
        let set_cookies: Vec<Cookie<'static>> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| {
                let value = value.to_str().expect("cookie header to be valid ASCII");
                Cookie::parse(value.to_owned()).expect("cookie header to parse correctly")
            })
            .collect();

        for cookie in &set_cookies {
            self.cookies
                .insert(cookie.name().to_owned(), cookie.value().to_owned());
        }

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body to be readable");

        TestResponse {
            status,
            set_cookies,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, data: &[(&str, &str)]) -> TestResponse {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(data)
            .finish();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_multipart(&mut self, uri: &str, data: &[(&str, &str)]) -> TestResponse {
        let mut body = String::new();
        for (name, value) in data {
            body.push_str(&format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"\r\n\r\n\
                 {value}\r\n"
            ));
        }
        body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn send_with_header(
        &mut self,
        method: Method,
        uri: &str,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(HEADER_NAME, token);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_with_header(&mut self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send_with_header(Method::POST, uri, token).await
    }
}

async fn issue_token(csrf: CsrfHandle) -> String {
    csrf.generate_token()
}

async fn ok() -> &'static str {
    "OK"
}

async fn manual_check(
    csrf: CsrfHandle,
    Form(form): Form<HashMap<String, String>>,
) -> Result<&'static str, StatusCode> {
    let original_token = csrf
        .get_token()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if form.get(FORM_FIELD_NAME) != original_token.as_ref() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok("OK")
}

/// Router shaped like the usual test application: `GET /` issues a token
/// and returns it as the body, the POST routes cover every annotation.
pub fn create_app(
    policy: Arc<dyn CsrfPolicy>,
    storage: Arc<dyn CsrfStorage>,
    global_mode: bool,
) -> Router {
    let overrides = CsrfOverrides::new()
        .require("/required_check")
        .exempt("/required_not_check")
        .exempt("/manual_check");

    let guard = CsrfMiddleware::from_shared(policy, storage)
        .global_mode(global_mode)
        .overrides(overrides)
        .into_shared();

    Router::new()
        .route("/", get(issue_token))
        .route("/global_check", post(ok).put(ok).delete(ok))
        .route("/required_check", get(ok).post(ok))
        .route("/required_not_check", post(ok))
        .route("/manual_check", post(manual_check))
        .layer(middleware::from_fn_with_state(guard, csrf_middleware))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
}
