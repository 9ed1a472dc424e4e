//! Request specification and response types.

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// How the pipeline treats an auth failure on this request.
///
/// Login and refresh calls never trigger the refresh protocol: a 401 from
/// login is a bad-password answer, and a 401 from the refresh endpoint is the
/// session-expired verdict itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndpointClass {
    #[default]
    Standard,
    Login,
    Refresh,
}

/// The minimal description of one outbound request: method, path, query,
/// headers (sans auth), and JSON body.
///
/// Captured as a plain value rather than a closure so the pipeline can replay
/// it after a refresh, deterministically and independent of surrounding state.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    class: EndpointClass,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            class: EndpointClass::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a header. The authorization header is attached by the pipeline;
    /// setting it here overrides that for this request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_class(mut self, class: EndpointClass) -> Self {
        self.class = class;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn class(&self) -> EndpointClass {
        self.class
    }
}

/// A successful response: status plus opaque body bytes.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    status: u16,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
