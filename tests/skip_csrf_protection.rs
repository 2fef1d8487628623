// Skip predicate: only a predicate answering `true` bypasses validation
// Run with: cargo test --test skip_csrf_protection

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use axum_test::TestServer;
use csrf_sync::{csrf_synchronised_protection, CsrfSync, CsrfSyncConfig, CsrfTokenGenerator};
use tower_sessions::{MemoryStore, SessionManagerLayer};

async fn token(csrf_token: CsrfTokenGenerator) -> String {
    csrf_token.token().await
}

fn server(csrf: CsrfSync) -> TestServer {
    let app = Router::new()
        .route("/token", get(token).post(token))
        .route("/webhooks/payment", post(token))
        .layer(middleware::from_fn_with_state(
            csrf,
            csrf_synchronised_protection,
        ))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_skips_when_predicate_returns_true() {
    let csrf = CsrfSync::new(CsrfSyncConfig::new().skip_csrf_protection(|_| true));

    let response = server(csrf).post("/token").await;

    // Skipped, yet the generator is still attached
    response.assert_status_ok();
    assert_eq!(response.text().len(), 256);
}

/// The predicate doesn't bypass: a valid token is still required and accepted
async fn assert_still_protected(csrf: CsrfSync) {
    let server = server(csrf);

    server
        .post("/token")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let minted = server.get("/token").await;
    minted.assert_status_ok();
    let stored = minted.text();
    let cookie = minted
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie issued")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = server
        .post("/token")
        .add_header(header::COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .add_header(
            HeaderName::from_static("x-csrf-token"),
            HeaderValue::from_str(&stored).unwrap(),
        )
        .await;

    response.assert_status_ok();
    response.assert_text(stored);
}

#[tokio::test]
async fn test_does_not_skip_when_predicate_returns_false() {
    assert_still_protected(CsrfSync::new(
        CsrfSyncConfig::new().skip_csrf_protection(|_| false),
    ))
    .await;
}

#[tokio::test]
async fn test_does_not_skip_without_predicate() {
    assert_still_protected(CsrfSync::new(CsrfSyncConfig::new())).await;
}

#[tokio::test]
async fn test_predicate_scoped_to_path() {
    let csrf = CsrfSync::new(
        CsrfSyncConfig::new()
            .skip_csrf_protection(|request| request.uri().path().starts_with("/webhooks/")),
    );
    let server = server(csrf);

    server.post("/webhooks/payment").await.assert_status_ok();
    server
        .post("/token")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
