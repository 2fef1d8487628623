pub mod csrf_protection;
pub mod error_handling;
pub mod session_layer;
pub mod token_generator;

pub use csrf_protection::*;
pub use error_handling::InvalidCsrfTokenError;
pub use session_layer::{
    memory_session_layer, DEFAULT_SESSION_INACTIVITY_MINUTES, SESSION_COOKIE_NAME,
};
pub use token_generator::CsrfTokenGenerator;
