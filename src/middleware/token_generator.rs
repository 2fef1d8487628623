use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Extensions, StatusCode},
};
use std::fmt;

use crate::services::csrf_sync_service::CsrfSync;

/// Token generator attached to each request by the CSRF middleware
///
/// Lets downstream handlers mint or read the session's token in the same
/// request cycle, e.g. to embed it in a form or serve it from a token endpoint.
///
/// ```rust,ignore
/// async fn form(csrf_token: CsrfTokenGenerator) -> Html<String> {
///     let token = csrf_token.token().await;
///     Html(format!(r#"<input type="hidden" name="csrfToken" value="{token}">"#))
/// }
/// ```
#[derive(Clone)]
pub struct CsrfTokenGenerator {
    csrf: CsrfSync,
    /// Scoped by the token store, the `Session` alone for the default store
    pub(crate) extensions: Extensions,
}

impl CsrfTokenGenerator {
    pub(crate) fn new(csrf: CsrfSync, extensions: Extensions) -> Self {
        Self { csrf, extensions }
    }

    /// Same contract as [`CsrfSync::generate_token`] for the bound request
    pub async fn generate(&self, overwrite: bool) -> String {
        self.csrf.generate_token(&self.extensions, overwrite).await
    }

    /// Current token, minted on first use
    pub async fn token(&self) -> String {
        self.generate(false).await
    }

    pub async fn revoke(&self) {
        self.csrf.revoke_token(&self.extensions).await
    }
}

impl fmt::Debug for CsrfTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfTokenGenerator").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CsrfTokenGenerator
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CsrfTokenGenerator>().cloned().ok_or_else(|| {
            tracing::error!("CsrfTokenGenerator requested but CSRF middleware is not installed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CSRF token generator missing from request extensions",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::sync::Arc;
    use tower_sessions::{MemoryStore, Session};

    #[tokio::test]
    async fn test_generator_shares_session_with_request() {
        let csrf = CsrfSync::default();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut request = Request::builder().uri("/").body(()).unwrap();
        request.extensions_mut().insert(session);

        let generator = csrf.token_generator(request.extensions());
        let token = generator.token().await;

        assert_eq!(generator.token().await, token);
        assert_eq!(csrf.generate_token(request.extensions(), false).await, token);

        let rotated = generator.generate(true).await;
        assert_ne!(rotated, token);
        assert_eq!(
            csrf.get_token_from_state(request.extensions()).await,
            Some(rotated)
        );

        generator.revoke().await;
        assert_eq!(csrf.get_token_from_state(request.extensions()).await, None);
    }

    #[tokio::test]
    async fn test_extractor_without_middleware() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();

        let rejection = CsrfTokenGenerator::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
