//! Server-side storage of the synchronizer token
//!
//! The guard never owns session state. A `TokenStore` reads and writes the
//! token through whatever the host's session layer attached to the request
//! extensions (a `tower_sessions::Session` for the default store).

use axum::{async_trait, http::Extensions};
use tower_sessions::Session;

/// Session key used by the default store
pub const DEFAULT_STATE_KEY: &str = "csrfToken";

/// Accessor/mutator pair for the stored token
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Current token, `None` when never generated or revoked
    async fn get_token(&self, extensions: &Extensions) -> Option<String>;

    /// Store a token, `None` clears it
    async fn store_token(&self, extensions: &Extensions, token: Option<String>);

    /// Extensions the token generator keeps for later store calls
    ///
    /// The default clones the whole map. Stores that only need one handle
    /// should return just that.
    fn scope(&self, extensions: &Extensions) -> Extensions {
        extensions.clone()
    }
}

/// Stores the token under a single key of the request's `tower_sessions::Session`
#[derive(Debug, Clone)]
pub struct SessionTokenStore {
    key: String,
}

impl SessionTokenStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn session<'a>(&self, extensions: &'a Extensions) -> Option<&'a Session> {
        let session = extensions.get::<Session>();
        if session.is_none() {
            // Without a session layer the token can never be validated
            tracing::warn!(
                key = %self.key,
                "CSRF: no session attached to request"
            );
        }
        session
    }
}

impl Default for SessionTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_KEY)
    }
}

#[async_trait]
impl TokenStore for SessionTokenStore {
    async fn get_token(&self, extensions: &Extensions) -> Option<String> {
        let session = self.session(extensions)?;

        match session.get::<String>(&self.key).await {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(key = %self.key, "CSRF: failed to load session: {}", err);
                None
            }
        }
    }

    async fn store_token(&self, extensions: &Extensions, token: Option<String>) {
        let Some(session) = self.session(extensions) else {
            return;
        };

        let result = match token {
            Some(token) => session.insert(&self.key, token).await,
            None => session.remove_value(&self.key).await.map(|_| ()),
        };

        if let Err(err) = result {
            tracing::error!(key = %self.key, "CSRF: failed to update session: {}", err);
        }
    }

    fn scope(&self, extensions: &Extensions) -> Extensions {
        let mut scoped = Extensions::new();
        if let Some(session) = extensions.get::<Session>() {
            scoped.insert(session.clone());
        }
        scoped
    }
}

/// Store built from two synchronous closures
pub struct FnTokenStore<G, S> {
    get: G,
    store: S,
}

impl<G, S> FnTokenStore<G, S>
where
    G: Fn(&Extensions) -> Option<String> + Send + Sync + 'static,
    S: Fn(&Extensions, Option<String>) + Send + Sync + 'static,
{
    pub fn new(get: G, store: S) -> Self {
        Self { get, store }
    }
}

#[async_trait]
impl<G, S> TokenStore for FnTokenStore<G, S>
where
    G: Fn(&Extensions) -> Option<String> + Send + Sync + 'static,
    S: Fn(&Extensions, Option<String>) + Send + Sync + 'static,
{
    async fn get_token(&self, extensions: &Extensions) -> Option<String> {
        (self.get)(extensions)
    }

    async fn store_token(&self, extensions: &Extensions, token: Option<String>) {
        (self.store)(extensions, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tower_sessions::MemoryStore;

    fn new_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn extensions_with(session: &Session) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(session.clone());
        extensions
    }

    #[tokio::test]
    async fn test_session_store_round_trip() {
        let session = new_session();
        let extensions = extensions_with(&session);
        let store = SessionTokenStore::default();

        assert_eq!(store.get_token(&extensions).await, None);

        store
            .store_token(&extensions, Some("test token".to_string()))
            .await;
        assert_eq!(store.get_token(&extensions).await.as_deref(), Some("test token"));
        assert_eq!(
            session.get::<String>(DEFAULT_STATE_KEY).await.unwrap().as_deref(),
            Some("test token")
        );

        store.store_token(&extensions, None).await;
        assert_eq!(store.get_token(&extensions).await, None);
        assert_eq!(session.get::<String>(DEFAULT_STATE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_store_custom_key() {
        let session = new_session();
        let extensions = extensions_with(&session);
        let store = SessionTokenStore::new("_csrf");

        store.store_token(&extensions, Some("abc".to_string())).await;
        assert_eq!(
            session.get::<String>("_csrf").await.unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(session.get::<String>(DEFAULT_STATE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_store_without_session() {
        let extensions = Extensions::new();
        let store = SessionTokenStore::default();

        store.store_token(&extensions, Some("abc".to_string())).await;
        assert_eq!(store.get_token(&extensions).await, None);
    }

    #[derive(Clone, Default)]
    struct Slot(Arc<Mutex<Option<String>>>);

    #[tokio::test]
    async fn test_session_store_scope_keeps_only_session() {
        let session = new_session();
        let mut extensions = extensions_with(&session);
        extensions.insert(Slot::default());

        let scoped = SessionTokenStore::default().scope(&extensions);
        assert!(scoped.get::<Session>().is_some());
        assert!(scoped.get::<Slot>().is_none());

        // Writes through the scoped copy land in the same session
        let store = SessionTokenStore::default();
        store.store_token(&scoped, Some("abc".to_string())).await;
        assert_eq!(store.get_token(&extensions).await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_fn_store_delegates() {
        let slot = Slot::default();
        let mut extensions = Extensions::new();
        extensions.insert(slot.clone());

        let store = FnTokenStore::new(
            |ext: &Extensions| ext.get::<Slot>()?.0.lock().unwrap().clone(),
            |ext: &Extensions, token: Option<String>| {
                if let Some(slot) = ext.get::<Slot>() {
                    *slot.0.lock().unwrap() = token;
                }
            },
        );

        store.store_token(&extensions, Some("xyz".to_string())).await;
        assert_eq!(store.get_token(&extensions).await.as_deref(), Some("xyz"));
        assert_eq!(slot.0.lock().unwrap().as_deref(), Some("xyz"));

        // The default scope keeps every extension
        assert!(store.scope(&extensions).get::<Slot>().is_some());
    }
}
