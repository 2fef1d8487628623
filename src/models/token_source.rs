use axum::http::{header, HeaderName};
use serde_json::Value;
use std::{fmt, sync::Arc};

use super::CsrfRequest;

/// Default header carrying the client's token
pub const DEFAULT_HEADER_NAME: &str = "x-csrf-token";

/// Closure reading the client-supplied token from a request
pub type TokenRetriever = Arc<dyn Fn(&CsrfRequest<'_>) -> Option<String> + Send + Sync>;

/// Where the guard looks for the token echoed back by the client
#[derive(Clone)]
pub enum TokenSource {
    /// A request header (default `x-csrf-token`)
    Header(HeaderName),
    /// A field of a form-urlencoded or JSON body
    BodyField(String),
    /// Caller-supplied retriever
    Custom {
        retriever: TokenRetriever,
        needs_body: bool,
    },
}

impl TokenSource {
    pub fn header(name: HeaderName) -> Self {
        Self::Header(name)
    }

    pub fn body_field(field: impl Into<String>) -> Self {
        Self::BodyField(field.into())
    }

    pub fn custom<F>(retriever: F, needs_body: bool) -> Self
    where
        F: Fn(&CsrfRequest<'_>) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom {
            retriever: Arc::new(retriever),
            needs_body,
        }
    }

    /// Whether the middleware has to buffer the body before retrieval
    pub fn needs_body(&self) -> bool {
        match self {
            Self::Header(_) => false,
            Self::BodyField(_) => true,
            Self::Custom { needs_body, .. } => *needs_body,
        }
    }

    pub fn retrieve(&self, request: &CsrfRequest<'_>) -> Option<String> {
        match self {
            Self::Header(name) => request
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            Self::BodyField(field) => token_from_body(request, field),
            Self::Custom { retriever, .. } => retriever(request),
        }
    }
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::Header(HeaderName::from_static(DEFAULT_HEADER_NAME))
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(name) => f.debug_tuple("Header").field(name).finish(),
            Self::BodyField(field) => f.debug_tuple("BodyField").field(field).finish(),
            Self::Custom { needs_body, .. } => f
                .debug_struct("Custom")
                .field("needs_body", needs_body)
                .finish_non_exhaustive(),
        }
    }
}

/// `application/json` or any `+json` media type, parameters and case ignored
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// JSON bodies are matched on a top-level string field, anything else is
/// parsed as `application/x-www-form-urlencoded`.
fn token_from_body(request: &CsrfRequest<'_>, field: &str) -> Option<String> {
    let body = request.body()?;

    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, is_json_content_type);

    if is_json {
        let value: Value = serde_json::from_slice(body).ok()?;
        return value.get(field)?.as_str().map(str::to_owned);
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == field)
        .map(|(_, value)| value.into_owned())
}
