use axum::{
    body::Bytes,
    http::{request::Parts, Extensions, HeaderMap, Method, Request, Uri},
};

/// Borrowed view of an inbound request as seen by the CSRF guard
///
/// Token retrievers and skip predicates receive this view. `body` is only
/// populated when the configured token source reads from the body.
#[derive(Clone, Copy, Debug)]
pub struct CsrfRequest<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap,
    extensions: &'a Extensions,
    body: Option<&'a Bytes>,
}

impl<'a> CsrfRequest<'a> {
    pub fn new(
        method: &'a Method,
        uri: &'a Uri,
        headers: &'a HeaderMap,
        extensions: &'a Extensions,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            extensions,
            body: None,
        }
    }

    pub fn from_parts(parts: &'a Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    /// View over a request whose body is not buffered
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        Self::new(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    /// Attach the buffered request body
    pub fn with_body(mut self, body: &'a Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn uri(&self) -> &'a Uri {
        self.uri
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    pub fn extensions(&self) -> &'a Extensions {
        self.extensions
    }

    pub fn body(&self) -> Option<&'a Bytes> {
        self.body
    }
}
