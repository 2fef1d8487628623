//! Session layer for the demo server and tests
//!
//! ⚠️ `MemoryStore` keeps sessions in process memory: they are lost on restart
//! and not shared between instances. Deployments should back the
//! `SessionManagerLayer` with a persistent store.

use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub const SESSION_COOKIE_NAME: &str = "csrf_sync.sid";

/// Sessions expire after this long without a request
pub const DEFAULT_SESSION_INACTIVITY_MINUTES: i64 = 30;

/// In-memory session layer keyed by the `csrf_sync.sid` cookie
///
/// A session is only stored once something (e.g. token generation) writes
/// to it, so requests that never touch the token leave no record behind.
pub fn memory_session_layer(inactivity_minutes: i64) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(false) // Set to true in production with HTTPS
        .with_expiry(Expiry::OnInactivity(Duration::minutes(inactivity_minutes)))
}
