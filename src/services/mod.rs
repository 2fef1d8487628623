pub mod csrf_sync_service;
pub mod token_store;

pub use csrf_sync_service::{generate_random_token, CsrfSync};
pub use token_store::{FnTokenStore, SessionTokenStore, TokenStore, DEFAULT_STATE_KEY};
