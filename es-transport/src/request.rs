//! Per-call request parameters.

use std::sync::Arc;

use crate::agent::Agent;
use crate::body::Body;
use crate::headers::Headers;
use crate::host::Scheme;
use crate::query::Query;

/// What the caller asks for. Every field is optional and is merged with the
/// endpoint's defaults when the call is made.
///
/// ```
/// use es_transport::{Query, RequestParams};
///
/// let params = RequestParams::new()
///     .method("POST")
///     .path("/index/_doc")
///     .query(Query::from([("refresh", "true")]))
///     .header("content-type", "application/json")
///     .body(r#"{"title":"pasta"}"#);
/// assert_eq!(params.method.as_deref(), Some("POST"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Defaults to `GET`.
    pub method: Option<String>,
    /// Appended to the endpoint's path prefix.
    pub path: Option<String>,
    /// Overlaid on the endpoint's default query.
    pub query: Option<Query>,
    pub body: Option<Body>,
    /// Overlaid on the connection's baseline headers when given.
    pub headers: Option<Headers>,
    /// Overrides the connection's request timeout, in milliseconds.
    /// 0 means no timeout.
    pub timeout_ms: Option<u64>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Add a header.
    pub fn header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set the request body. An empty body counts as no body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Fully merged parameters for one call, in the shape handed to the
/// transport.
#[derive(Debug, Clone)]
pub struct ReqParams {
    pub method: String,
    pub protocol: Scheme,
    pub auth: Option<String>,
    pub hostname: String,
    pub port: u16,
    /// Request target: merged path plus serialized query.
    pub path: String,
    pub headers: Headers,
    pub agent: Arc<Agent>,
}

impl PartialEq for ReqParams {
    /// Agents compare by identity.
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.protocol == other.protocol
            && self.auth == other.auth
            && self.hostname == other.hostname
            && self.port == other.port
            && self.path == other.path
            && self.headers == other.headers
            && Arc::ptr_eq(&self.agent, &other.agent)
    }
}
