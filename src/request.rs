//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Uri};

use crate::method::Method;

/// An incoming HTTP request, already matched to a route.
///
/// Extensions carry the router's injected state and, on gated routes, the
/// authenticated [`Principal`](crate::Principal).
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    extensions: Extensions,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
        extensions: Extensions,
    ) -> Self {
        Self { method, uri, headers, body, params, extensions }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }

    pub(crate) fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/cars/{id}`, `req.param("id")` on `/cars/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}
