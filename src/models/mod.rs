pub mod csrf_request;
pub mod token_source;

pub use csrf_request::CsrfRequest;
pub use token_source::{TokenRetriever, TokenSource, DEFAULT_HEADER_NAME};
