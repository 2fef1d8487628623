use axum::{
    extract::{Request, State},
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use csrf_sync::config::ServerConfig;
use csrf_sync::middleware::memory_session_layer;
use csrf_sync::{csrf_synchronised_protection, CsrfSync, CsrfSyncConfig, CsrfTokenGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "csrf_sync=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = ServerConfig::from_env()?;
    let csrf = CsrfSync::new(CsrfSyncConfig::from_env()?);

    // ⚠️ Demo only: in-memory sessions, use a persistent session store in a deployment
    let app = create_app(csrf, server.session_inactivity_minutes);

    let addr = server.server_address();
    tracing::info!("Starting csrf-sync demo server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_app(csrf: CsrfSync, session_inactivity_minutes: i64) -> Router {
    // Routes merged without the guard stay unprotected
    let public = Router::new()
        .route("/csrf-token", get(csrf_token))
        .route("/hello", get(hello))
        .with_state(csrf.clone());

    let protected = Router::new()
        .route("/csrf-token-test", get(protected_test).post(protected_test))
        .layer(middleware::from_fn_with_state(
            csrf,
            csrf_synchronised_protection,
        ));

    Router::new().merge(public).merge(protected).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(memory_session_layer(session_inactivity_minutes)),
    )
}

async fn csrf_token(State(csrf): State<CsrfSync>, request: Request) -> String {
    let (parts, _) = request.into_parts();
    csrf.generate_token(&parts.extensions, false).await
}

async fn hello() -> &'static str {
    "Hello World!"
}

/// Behind the guard, so the generator is attached
async fn protected_test(csrf_token: CsrfTokenGenerator) -> String {
    format!(
        "Test endpoint... (token length {})",
        csrf_token.token().await.len()
    )
}
