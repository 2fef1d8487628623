//! Synchronizer-token CSRF protection for axum.
//!
//! A per-session secret is generated, stored server-side in the host's session
//! state, and must be echoed back (header or body field) on state-changing
//! requests.
//!
//! ```rust,no_run
//! use axum::{middleware, routing::{get, post}, Router};
//! use csrf_sync::{csrf_synchronised_protection, CsrfSync, CsrfSyncConfig, CsrfTokenGenerator};
//! use tower_sessions::{MemoryStore, SessionManagerLayer};
//!
//! async fn token(csrf_token: CsrfTokenGenerator) -> String {
//!     csrf_token.token().await
//! }
//!
//! async fn transfer() -> &'static str {
//!     "done"
//! }
//!
//! let csrf = CsrfSync::new(CsrfSyncConfig::default());
//!
//! // The session layer runs first so `tower_sessions::Session` is in the extensions
//! let app: Router = Router::new()
//!     .route("/csrf-token", get(token))
//!     .route("/transfer", post(transfer))
//!     .layer(middleware::from_fn_with_state(csrf, csrf_synchronised_protection))
//!     .layer(SessionManagerLayer::new(MemoryStore::default()));
//! ```

pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{CsrfSyncConfig, ErrorConfig, SkipPredicate};
pub use middleware::{csrf_synchronised_protection, CsrfTokenGenerator, InvalidCsrfTokenError};
pub use models::{CsrfRequest, TokenSource};
pub use services::{CsrfSync, FnTokenStore, SessionTokenStore, TokenStore};
