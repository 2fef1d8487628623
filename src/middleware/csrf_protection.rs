// ============================================================================
// CSRF Protection Middleware - Synchronizer Token Pattern
// ============================================================================
//
// 🔒 SECURITY: The server generates a random token per session and keeps it in
// session state. State-changing requests must echo it back (header
// `x-csrf-token` by default, or a body field). A cross-site attacker can make
// the browser send cookies but can't read the token, so the echo never matches.
//
// ## Per-request flow:
// 1. Attach a `CsrfTokenGenerator` to the request extensions
// 2. Ignored method (GET/HEAD/OPTIONS) or skip predicate → next service
// 3. Buffer the body if the token lives there
// 4. Valid token → next service, otherwise `InvalidCsrfTokenError`
//
// ## Usage:
// ```rust
// let csrf = CsrfSync::new(CsrfSyncConfig::default());
//
// Router::new()
//     .route("/transfer", post(transfer))
//     .layer(middleware::from_fn_with_state(csrf.clone(), csrf_synchronised_protection))
//     .layer(SessionManagerLayer::new(store));  // must run first so `Session` is in extensions
// ```
//
// ============================================================================

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::middleware::error_handling::InvalidCsrfTokenError;
use crate::models::CsrfRequest;
use crate::services::csrf_sync_service::CsrfSync;
use crate::utils::log_sanitizer::sanitize_for_log;

/// CSRF protection middleware, install with `middleware::from_fn_with_state`
pub async fn csrf_synchronised_protection(
    State(csrf): State<CsrfSync>,
    request: Request,
    next: Next,
) -> Result<Response, InvalidCsrfTokenError> {
    let (mut parts, body) = request.into_parts();

    let generator = csrf.token_generator(&parts.extensions);
    parts.extensions.insert(generator);

    if csrf.is_exempt(&CsrfRequest::from_parts(&parts)) {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    if !csrf.config().token_source.needs_body() {
        csrf.check(&CsrfRequest::from_parts(&parts)).await?;
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let bytes = match axum::body::to_bytes(body, csrf.config().body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                method = %parts.method,
                path = %sanitize_for_log(parts.uri.path()),
                "CSRF: failed to buffer request body: {}",
                err
            );
            return Err(csrf.invalid_csrf_token_error());
        }
    };

    csrf.check(&CsrfRequest::from_parts(&parts).with_body(&bytes)).await?;

    // Downstream handlers still get the full body
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
