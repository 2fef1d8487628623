//! Synchronizer-token CSRF guard
//!
//! Generates a per-session secret, keeps it in the host's session state and
//! requires state-changing requests to echo it back.
//! - Token: `size` bytes from the OS CSPRNG, hex-encoded
//! - Storage: pluggable `TokenStore`, session key `csrfToken` by default
//! - Gate: ignored method or skip predicate → allow, else valid token → allow, else reject

use axum::http::{Extensions, Method};
use rand::{rngs::OsRng, RngCore};
use std::{fmt, sync::Arc};
use subtle::ConstantTimeEq;

use crate::config::CsrfSyncConfig;
use crate::middleware::error_handling::InvalidCsrfTokenError;
use crate::middleware::token_generator::CsrfTokenGenerator;
use crate::models::CsrfRequest;
use crate::utils::log_sanitizer::{redact_sensitive, sanitize_for_log};

/// Generate a hex-encoded token from `size` random bytes
pub fn generate_random_token(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare tokens without short-circuiting on the first differing byte
fn tokens_match(received: &str, stored: &str) -> bool {
    // 🔒 SECURITY: Constant-time comparison prevents timing attacks
    if received.len() != stored.len() {
        return false;
    }

    received.as_bytes().ct_eq(stored.as_bytes()).into()
}

struct CsrfSyncInner {
    config: CsrfSyncConfig,
    invalid_csrf_token_error: InvalidCsrfTokenError,
}

/// The CSRF guard, cheap to clone and shared across requests
#[derive(Clone)]
pub struct CsrfSync {
    inner: Arc<CsrfSyncInner>,
}

impl fmt::Debug for CsrfSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfSync")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for CsrfSync {
    fn default() -> Self {
        Self::new(CsrfSyncConfig::default())
    }
}

impl CsrfSync {
    pub fn new(config: CsrfSyncConfig) -> Self {
        let invalid_csrf_token_error = InvalidCsrfTokenError::from(&config.error_config);

        Self {
            inner: Arc::new(CsrfSyncInner {
                config,
                invalid_csrf_token_error,
            }),
        }
    }

    pub fn config(&self) -> &CsrfSyncConfig {
        &self.inner.config
    }

    /// The single error returned for every rejected request
    pub fn invalid_csrf_token_error(&self) -> InvalidCsrfTokenError {
        self.inner.invalid_csrf_token_error.clone()
    }

    /// Return the stored token, or mint and store a new one
    ///
    /// With `overwrite == false` an existing token is returned unchanged, so
    /// repeated calls within a session agree. `overwrite == true` always rotates.
    pub async fn generate_token(&self, extensions: &Extensions, overwrite: bool) -> String {
        if !overwrite {
            if let Some(existing) = self.get_token_from_state(extensions).await {
                return existing;
            }
        }

        let token = generate_random_token(self.inner.config.size);
        self.store_token_in_state(extensions, Some(token.clone())).await;

        tracing::debug!(
            overwrite,
            token = %redact_sensitive(&token),
            "CSRF: generated new token"
        );

        token
    }

    /// Clear the stored token. No-op when there is none.
    pub async fn revoke_token(&self, extensions: &Extensions) {
        self.store_token_in_state(extensions, None).await;
        tracing::debug!("CSRF: token revoked");
    }

    /// Token echoed by the client, from the configured source
    pub fn get_token_from_request(&self, request: &CsrfRequest<'_>) -> Option<String> {
        self.inner.config.token_source.retrieve(request)
    }

    /// Token held in session state; an empty string reads as absent
    pub async fn get_token_from_state(&self, extensions: &Extensions) -> Option<String> {
        self.inner
            .config
            .token_store
            .get_token(extensions)
            .await
            .filter(|token| !token.is_empty())
    }

    pub async fn store_token_in_state(&self, extensions: &Extensions, token: Option<String>) {
        self.inner
            .config
            .token_store
            .store_token(extensions, token)
            .await;
    }

    /// True iff the client token and the stored token are both present and equal
    pub async fn is_request_valid(&self, request: &CsrfRequest<'_>) -> bool {
        let received = self.get_token_from_request(request);
        let stored = self.get_token_from_state(request.extensions()).await;

        match (received, stored) {
            (Some(received), Some(stored)) if !received.is_empty() => {
                tokens_match(&received, &stored)
            }
            _ => false,
        }
    }

    pub fn is_ignored_method(&self, method: &Method) -> bool {
        self.inner.config.ignored_methods.contains(method)
    }

    /// Ignored method, or the skip predicate answered `true`
    pub fn is_exempt(&self, request: &CsrfRequest<'_>) -> bool {
        if self.is_ignored_method(request.method()) {
            return true;
        }

        self.inner
            .config
            .skip_csrf_protection
            .as_ref()
            .map_or(false, |skip| skip(request))
    }

    /// Validate a non-exempt request
    pub async fn check(&self, request: &CsrfRequest<'_>) -> Result<(), InvalidCsrfTokenError> {
        if self.is_request_valid(request).await {
            return Ok(());
        }

        tracing::warn!(
            method = %request.method(),
            path = %sanitize_for_log(request.uri().path()),
            "CSRF: invalid or missing token"
        );

        Err(self.invalid_csrf_token_error())
    }

    /// The per-request gate: exempt requests pass, others must validate
    pub async fn protect(&self, request: &CsrfRequest<'_>) -> Result<(), InvalidCsrfTokenError> {
        if self.is_exempt(request) {
            return Ok(());
        }

        self.check(request).await
    }

    /// Token generator bound to one request's session
    ///
    /// Holds only what the token store asks for (the `Session` handle for the
    /// default store), not the whole extensions map.
    pub fn token_generator(&self, extensions: &Extensions) -> CsrfTokenGenerator {
        let scoped = self.inner.config.token_store.scope(extensions);
        CsrfTokenGenerator::new(self.clone(), scoped)
    }
}
