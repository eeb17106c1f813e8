//! Request and response types.
//!
//! The kernel shares one [`Request`] between the request stack, the stage
//! events and the resolvers, so it is handed around as `Arc<Request>`. The
//! header map and the attribute bag sit behind locks: listeners and resolvers
//! stash bookkeeping there (route parameters, nesting markers) while the
//! request is shared.
//!
//! Responses are plain [`http::Response`] values with a [`Bytes`] body.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri, header};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

/// An HTTP response produced by the pipeline.
pub type Response = http::Response<Bytes>;

/// Whether a request is the top-level one or nested inside another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestKind {
    /// The request received from the transport layer.
    #[default]
    Main,
    /// A request dispatched while another one is being handled.
    Sub,
}

impl RequestKind {
    /// Whether this is the top-level request.
    pub fn is_main(self) -> bool {
        self == RequestKind::Main
    }
}

/// An inbound HTTP request.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: RwLock<HeaderMap>,
    attributes: RwLock<Map<String, Value>>,
    body: Bytes,
}

impl Request {
    /// Create a request from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers: RwLock::new(headers),
            attributes: RwLock::new(Map::new()),
            body,
        }
    }

    /// A bodiless `GET` request.
    ///
    /// An unparsable `uri` falls back to `/`.
    pub fn get(uri: &str) -> Self {
        Self::new(
            Method::GET,
            uri.parse().unwrap_or_else(|_| Uri::from_static("/")),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The path component of the URI.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Read access to the headers.
    pub fn headers(&self) -> RwLockReadGuard<'_, HeaderMap> {
        self.headers.read()
    }

    /// Write access to the headers.
    pub fn headers_mut(&self) -> RwLockWriteGuard<'_, HeaderMap> {
        self.headers.write()
    }

    /// A single header value as a string, when present and valid.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .read()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// An attribute value.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }

    /// Store an attribute, returning the previous value.
    pub fn set_attribute(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.attributes.write().insert(key.into(), value)
    }

    /// Read access to all attributes.
    pub fn attributes(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.attributes.read()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &*self.headers.read())
            .field("attributes", &*self.attributes.read())
            .finish_non_exhaustive()
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Start building a request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }
}

impl RequestBuilder {
    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the URI.
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Add a header. Invalid values are skipped.
    pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Finish.
    pub fn build(self) -> Request {
        Request::new(self.method, self.uri, self.headers, self.body)
    }
}

/// Convenience queries on [`Response`].
pub trait ResponseExt {
    /// 4xx.
    fn is_client_error(&self) -> bool;
    /// 5xx.
    fn is_server_error(&self) -> bool;
    /// A redirect in the kernel's sense: 201, 301, 302, 303, 307 or 308.
    fn is_redirect(&self) -> bool;
    /// The body as UTF-8 text (lossy).
    fn body_text(&self) -> String;
    /// Replace every header named in `headers` with all of its values there.
    fn merge_headers(&mut self, headers: &HeaderMap);
}

impl ResponseExt for Response {
    fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn is_redirect(&self) -> bool {
        matches!(self.status().as_u16(), 201 | 301 | 302 | 303 | 307 | 308)
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    fn merge_headers(&mut self, headers: &HeaderMap) {
        let target = self.headers_mut();
        for name in headers.keys() {
            target.remove(name);
            for value in headers.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}

/// Response constructors.
pub mod response {
    use super::Response;
    use bytes::Bytes;
    use http::{HeaderValue, StatusCode, header};
    use serde_json::Value;

    /// `200 OK` with the given body.
    pub fn text(body: impl Into<Bytes>) -> Response {
        Response::new(body.into())
    }

    /// The given body with an explicit status.
    pub fn with_status(body: impl Into<Bytes>, status: StatusCode) -> Response {
        let mut response = Response::new(body.into());
        *response.status_mut() = status;
        response
    }

    /// A JSON response (`application/json`).
    pub fn json(value: &Value) -> Response {
        let mut response = Response::new(Bytes::from(value.to_string()));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// The stack of requests currently being handled by one kernel.
///
/// Pushed when a request enters the pipeline and popped after its finish
/// stage, so finish listeners still see it as current.
#[derive(Debug, Clone, Default)]
pub struct RequestStack {
    requests: Arc<parking_lot::Mutex<Vec<Arc<Request>>>>,
}

impl RequestStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a request.
    pub fn push(&self, request: Arc<Request>) {
        self.requests.lock().push(request);
    }

    /// Pop the current request.
    pub fn pop(&self) -> Option<Arc<Request>> {
        self.requests.lock().pop()
    }

    /// The request being handled right now.
    pub fn current_request(&self) -> Option<Arc<Request>> {
        self.requests.lock().last().cloned()
    }

    /// The request that dispatched the current one.
    pub fn parent_request(&self) -> Option<Arc<Request>> {
        let requests = self.requests.lock();
        let len = requests.len();
        if len < 2 {
            return None;
        }
        requests.get(len - 2).cloned()
    }

    /// The top-level request.
    pub fn main_request(&self) -> Option<Arc<Request>> {
        self.requests.lock().first().cloned()
    }

    /// Number of requests in flight.
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    /// Whether no request is in flight.
    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_request_stack_parent_lookup() {
        let stack = RequestStack::new();
        assert!(stack.current_request().is_none());

        let main = Arc::new(Request::get("/main"));
        let sub = Arc::new(Request::get("/sub"));
        stack.push(main.clone());
        assert!(stack.parent_request().is_none());
        stack.push(sub.clone());

        assert_eq!(stack.current_request().unwrap().path(), "/sub");
        assert_eq!(stack.parent_request().unwrap().path(), "/main");
        assert_eq!(stack.main_request().unwrap().path(), "/main");

        stack.pop();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.current_request().unwrap().path(), "/main");
    }

    #[test]
    fn test_attributes_are_mutable_through_shared_request() {
        let request = Arc::new(Request::get("/users/7"));
        let shared = request.clone();
        shared.set_attribute("id", Value::from("7"));
        assert_eq!(request.attribute("id"), Some(Value::from("7")));
    }

    #[test]
    fn test_redirect_includes_created() {
        assert!(response::with_status("", StatusCode::CREATED).is_redirect());
        assert!(response::with_status("", StatusCode::FOUND).is_redirect());
        assert!(!response::text("ok").is_redirect());
        assert!(response::with_status("", StatusCode::NOT_FOUND).is_client_error());
    }

    #[test]
    fn test_json_response_sets_content_type() {
        let response = response::json(&serde_json::json!(["a", "b"]));
        assert_eq!(response.body_text(), r#"["a","b"]"#);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_merge_headers_keeps_every_value() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("5"));

        let mut response = response::text("rescued");
        response
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_static("old=0"));
        response.merge_headers(&headers);

        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "5");
    }
}
