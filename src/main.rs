use csrf_guard::{
    config::CsrfConfig,
    csrf_middleware,
    policy::CsrfPolicy,
    storage::CsrfStorage,
    CsrfHandle, CsrfOverrides,
};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    middleware,
    routing::{get, post},
    Router,
};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageKind {
    Cookie,
    Session,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    Form,
    Header,
}

#[derive(Parser)]
#[command(name = "csrf-guard-demo")]
#[command(about = "Demo server for the CSRF guard", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Where the token is kept between requests
    #[arg(long, value_enum, default_value_t = StorageKind::Cookie)]
    storage: StorageKind,

    /// Where the client resubmits the token
    #[arg(long, value_enum, default_value_t = PolicyKind::Form)]
    policy: PolicyKind,
}

#[derive(Clone)]
struct DemoState {
    form_field: String,
    header_name: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "form_with_check.html")]
struct FormWithCheckTemplate {
    field: String,
    token: String,
    header: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "form_without_check.html")]
struct FormWithoutCheckTemplate;

#[derive(Deserialize)]
struct HelloForm {
    name: String,
}

async fn form_with_check(State(state): State<DemoState>, csrf: CsrfHandle) -> FormWithCheckTemplate {
    FormWithCheckTemplate {
        field: state.form_field,
        token: csrf.generate_token(),
        header: state.header_name.unwrap_or_default(),
    }
}

async fn form_without_check() -> FormWithoutCheckTemplate {
    FormWithoutCheckTemplate
}

async fn say_hello(Form(form): Form<HelloForm>) -> String {
    format!("Hello, {}", form.name)
}

fn build_app(config: &CsrfConfig, storage: StorageKind, policy: PolicyKind) -> anyhow::Result<Router> {
    let csrf_policy: Arc<dyn CsrfPolicy> = match policy {
        PolicyKind::Form => Arc::new(config.form_policy()),
        PolicyKind::Header => Arc::new(config.header_policy()?),
    };
    let csrf_storage: Arc<dyn CsrfStorage> = match storage {
        StorageKind::Cookie => Arc::new(config.cookie_storage()?),
        StorageKind::Session => Arc::new(config.session_storage()?),
    };

    let overrides = CsrfOverrides::new()
        .require("/post_with_check")
        .exempt("/post_without_check");
    let guard = config
        .middleware(csrf_policy, csrf_storage, overrides)
        .into_shared();

    let state = DemoState {
        form_field: config.form_field.clone(),
        header_name: matches!(policy, PolicyKind::Header).then(|| config.header_name.clone()),
    };

    let mut app = Router::new()
        .route("/form_with_check", get(form_with_check))
        .route("/form_without_check", get(form_without_check))
        .route("/post_with_check", post(say_hello))
        .route("/post_without_check", post(say_hello))
        .with_state(state)
        .layer(middleware::from_fn_with_state(guard, csrf_middleware));

    if matches!(storage, StorageKind::Session) {
        app = app.layer(config.session_layer());
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csrf_guard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = CsrfConfig::from_env()?;
    tracing::debug!("CSRF configuration: {:?}", config);

    let app = build_app(&config, cli.storage, cli.policy)?;

    let listener = tokio::net::TcpListener::bind(cli.addr).await?;
    tracing::info!(
        "Listening on {} ({:?} storage, {:?} policy)",
        cli.addr,
        cli.storage,
        cli.policy
    );
    axum::serve(listener, app).await?;

    Ok(())
}
