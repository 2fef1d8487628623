use anyhow::{bail, Context, Result};
use axum::http::{HeaderName, Method, StatusCode};
use std::{collections::HashSet, env, fmt, str::FromStr, sync::Arc};

use crate::models::{CsrfRequest, TokenSource};
use crate::services::token_store::{SessionTokenStore, TokenStore};

/// Random bytes per token (hex-encoded to twice as many characters)
pub const DEFAULT_TOKEN_SIZE: usize = 128;

/// Largest body buffered when the token is read from the body
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

pub const DEFAULT_ERROR_MESSAGE: &str = "invalid csrf token";
pub const DEFAULT_ERROR_CODE: &str = "EBADCSRFTOKEN";

/// Predicate consulted before validation; only `true` bypasses protection
pub type SkipPredicate = Arc<dyn Fn(&CsrfRequest<'_>) -> bool + Send + Sync>;

/// Status, message and machine code of the rejection error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorConfig {
    pub status_code: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            status_code: StatusCode::FORBIDDEN,
            message: DEFAULT_ERROR_MESSAGE.to_string(),
            code: Some(DEFAULT_ERROR_CODE.to_string()),
        }
    }
}

impl ErrorConfig {
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
}

/// Configuration of a [`CsrfSync`](crate::CsrfSync) guard
///
/// Fixed once the guard is built. Every field has a default:
///
/// ```rust
/// use csrf_sync::{CsrfSync, CsrfSyncConfig};
///
/// let csrf = CsrfSync::new(CsrfSyncConfig::new().body_field("_csrf").size(64));
/// assert_eq!(csrf.config().size, 64);
/// ```
#[derive(Clone)]
pub struct CsrfSyncConfig {
    pub ignored_methods: HashSet<Method>,
    pub token_source: TokenSource,
    pub token_store: Arc<dyn TokenStore>,
    pub size: usize,
    pub error_config: ErrorConfig,
    pub skip_csrf_protection: Option<SkipPredicate>,
    pub body_limit: usize,
}

impl Default for CsrfSyncConfig {
    fn default() -> Self {
        Self {
            ignored_methods: [Method::GET, Method::HEAD, Method::OPTIONS]
                .into_iter()
                .collect(),
            token_source: TokenSource::default(),
            token_store: Arc::new(SessionTokenStore::default()),
            size: DEFAULT_TOKEN_SIZE,
            error_config: ErrorConfig::default(),
            skip_csrf_protection: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl fmt::Debug for CsrfSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfSyncConfig")
            .field("ignored_methods", &self.ignored_methods)
            .field("token_source", &self.token_source)
            .field("size", &self.size)
            .field("error_config", &self.error_config)
            .field("skip_csrf_protection", &self.skip_csrf_protection.is_some())
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl CsrfSyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of methods exempt from validation
    pub fn ignored_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.ignored_methods = methods.into_iter().collect();
        self
    }

    /// Read the client token from a header
    pub fn header_name(mut self, name: HeaderName) -> Self {
        self.token_source = TokenSource::Header(name);
        self
    }

    /// Read the client token from a form or JSON body field
    pub fn body_field(mut self, field: impl Into<String>) -> Self {
        self.token_source = TokenSource::body_field(field);
        self
    }

    pub fn token_source(mut self, source: TokenSource) -> Self {
        self.token_source = source;
        self
    }

    /// Read the client token with a custom retriever (headers/extensions only)
    pub fn token_retriever<F>(mut self, retriever: F) -> Self
    where
        F: Fn(&CsrfRequest<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.token_source = TokenSource::custom(retriever, false);
        self
    }

    pub fn token_store(mut self, store: impl TokenStore) -> Self {
        self.token_store = Arc::new(store);
        self
    }

    /// Keep the default session store, under another key
    pub fn state_key(self, key: impl Into<String>) -> Self {
        self.token_store(SessionTokenStore::new(key))
    }

    /// Random bytes per token, at least 1
    pub fn size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    pub fn error_config(mut self, error_config: ErrorConfig) -> Self {
        self.error_config = error_config;
        self
    }

    pub fn skip_csrf_protection<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CsrfRequest<'_>) -> bool + Send + Sync + 'static,
    {
        self.skip_csrf_protection = Some(Arc::new(predicate));
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Load overrides from the environment (and `.env` when present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(methods) = lookup("CSRF_IGNORED_METHODS") {
            config.ignored_methods = methods
                .split(',')
                .map(str::trim)
                .filter(|method| !method.is_empty())
                .map(|method| {
                    Method::from_str(&method.to_uppercase())
                        .with_context(|| format!("invalid method in CSRF_IGNORED_METHODS: {method}"))
                })
                .collect::<Result<_>>()?;
        }

        if let Some(header) = lookup("CSRF_HEADER_NAME") {
            let name = HeaderName::from_str(header.trim())
                .with_context(|| format!("invalid CSRF_HEADER_NAME: {header}"))?;
            config.token_source = TokenSource::Header(name);
        }

        // A body field wins over a header name when both are set
        if let Some(field) = lookup("CSRF_BODY_FIELD") {
            config.token_source = TokenSource::body_field(field.trim());
        }

        if let Some(key) = lookup("CSRF_STATE_KEY") {
            config = config.state_key(key.trim());
        }

        if let Some(size) = parse_var::<usize, _>(&lookup, "CSRF_TOKEN_SIZE")? {
            if size == 0 {
                bail!("CSRF_TOKEN_SIZE must be greater than zero");
            }
            config.size = size;
        }

        if let Some(status) = parse_var::<u16, _>(&lookup, "CSRF_ERROR_STATUS")? {
            config.error_config.status_code = StatusCode::from_u16(status)
                .with_context(|| format!("invalid CSRF_ERROR_STATUS: {status}"))?;
        }

        if let Some(message) = lookup("CSRF_ERROR_MESSAGE") {
            config.error_config.message = message;
        }

        if let Some(code) = lookup("CSRF_ERROR_CODE") {
            // Empty means "no machine code"
            config.error_config.code = Some(code).filter(|code| !code.is_empty());
        }

        if let Some(limit) = parse_var::<usize, _>(&lookup, "CSRF_BODY_LIMIT")? {
            config.body_limit = limit;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid {key}: {value}"))
        })
        .transpose()
}

/// Listener settings for the demo server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_host: String,
    pub server_port: u16,
    pub session_inactivity_minutes: i64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5555".to_string())
                .parse()
                .context("invalid SERVER_PORT")?,
            session_inactivity_minutes: env::var("SESSION_INACTIVITY_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("invalid SESSION_INACTIVITY_MINUTES")?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
