//! Inbound requests.
//!
//! # Responsibilities
//! - Hold the parameter sets a handler reads (query, body, attributes,
//!   cookies, files)
//! - Derive a [`Uri`] from the transport-level scheme/host/path/query
//! - Carry the identity the request runs as
//!
//! # Design Decisions
//! - Request ID assigned at construction (UUID v4) unless the transport
//!   supplied one
//! - The query lives in the Uri only; there is no second copy to drift
//! - Attributes are the only state listeners and routing write to

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::http::{header, request::Parts, uri::Authority, HeaderMap, HeaderName, HeaderValue, Method};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Credentials};
use crate::query::{self, parse::percent_decode, QueryNode};
use crate::uri::{Uri, UriError};

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Metadata of an uploaded file. Contents stay with the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// A request moving through dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: QueryNode,
    attributes: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    files: Vec<UploadedFile>,
    credentials: Option<Credentials>,
    user: AuthenticatedUser,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            uri,
            headers: HeaderMap::new(),
            body: QueryNode::empty(),
            attributes: BTreeMap::new(),
            cookies: BTreeMap::new(),
            files: Vec::new(),
            credentials: None,
            user: AuthenticatedUser::anonymous(),
        }
    }

    /// A `GET` request for `uri`.
    pub fn get(uri: &str) -> Result<Self, UriError> {
        Ok(Self::new(Method::GET, Uri::parse(uri)?))
    }

    /// A `POST` request for `uri` with form body parameters.
    pub fn post(uri: &str, body: &str) -> Result<Self, UriError> {
        Ok(Self::new(Method::POST, Uri::parse(uri)?).with_body(query::parse(body)))
    }

    /// Rebuild the Uri from the fields a transport extracts: scheme, the
    /// `Host` header (which may carry a port) and the request target.
    ///
    /// The host must be a bare authority; path, query and fragment come
    /// from the request target only.
    pub fn from_transport(
        method: Method,
        scheme: &str,
        host: Option<&str>,
        path_and_query: &str,
    ) -> Result<Self, UriError> {
        let (target, fragment) = match path_and_query.split_once('#') {
            Some((target, fragment)) => (target, Some(fragment)),
            None => (path_and_query, None),
        };
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        let mut builder = Uri::builder().path(path).query(query);
        if let Some(fragment) = fragment {
            builder = builder.fragment(fragment);
        }
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            let authority = parse_host(host)?;
            builder = builder
                .scheme(scheme)
                .host(authority.host())
                .port(authority.port_u16());
        }
        Ok(Self::new(method, builder.build()?))
    }

    /// Build a request from axum request parts and the buffered body.
    ///
    /// Reads the `Host`, `Cookie`, `Authorization` and `X-Request-ID`
    /// headers, and url-encoded form bodies. Other body types are left to
    /// handlers through [`Request::headers`].
    pub fn from_http(parts: &Parts, body: &[u8]) -> Result<Self, UriError> {
        let scheme = parts.uri.scheme_str().unwrap_or("http");
        let host = parts
            .uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| header_str(&parts.headers, header::HOST));
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut request = Self::from_transport(parts.method.clone(), scheme, host, target)?;
        request.headers = parts.headers.clone();

        if let Some(id) = header_str(&parts.headers, X_REQUEST_ID) {
            request.id = id.to_string();
        }
        if let Some(auth) = header_str(&parts.headers, header::AUTHORIZATION) {
            request.credentials = Credentials::from_basic_header(auth);
        }
        for cookies in parts.headers.get_all(header::COOKIE) {
            if let Ok(cookies) = cookies.to_str() {
                request.cookies.extend(parse_cookies(cookies));
            }
        }

        let is_form = header_str(&parts.headers, header::CONTENT_TYPE)
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            request.body = query::parse(&String::from_utf8_lossy(body));
        }

        Ok(request)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_body(mut self, body: QueryNode) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn uri_mut(&mut self) -> &mut Uri {
        &mut self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query parameters, as parsed into the Uri.
    pub fn query(&self) -> &QueryNode {
        self.uri.query()
    }

    /// Form body parameters.
    pub fn body(&self) -> &QueryNode {
        &self.body
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn set_user(&mut self, user: AuthenticatedUser) {
        self.user = user;
    }

    /// A scalar parameter by name, looked up in the query, then the body,
    /// then the attributes.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query()
            .get(&[name])
            .and_then(QueryNode::as_leaf)
            .or_else(|| self.body.get(&[name]).and_then(QueryNode::as_leaf))
            .or_else(|| self.attribute(name))
    }
}

/// Validate a `Host` value as `host[:port]` with nothing else in it.
fn parse_host(host: &str) -> Result<Authority, UriError> {
    if host.contains(['/', '?', '#', '@']) {
        return Err(UriError::format(host, "invalid host"));
    }
    Authority::from_str(host).map_err(|_| UriError::format(host, "invalid host"))
}

fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Split a `Cookie` header into decoded name/value pairs.
fn parse_cookies(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), percent_decode(value.trim().trim_matches('"'))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(Body::empty()).unwrap().into_parts().0
    }

    #[test]
    fn test_from_transport_with_port() {
        let req = Request::from_transport(Method::GET, "https", Some("Example.com:8443"), "/sample/uri?toc=1").unwrap();
        assert_eq!(req.uri().host(), Some("example.com"));
        assert_eq!(req.uri().port(), Some(8443));
        assert_eq!(req.uri().path(), "/sample/uri");
        assert_eq!(req.uri().query_string(), "toc=1");
    }

    #[test]
    fn test_host_cannot_rewrite_target() {
        for host in ["example.com/admin?", "example.com?x=1", "example.com#frag", "user@example.com"] {
            assert!(
                Request::from_transport(Method::GET, "http", Some(host), "/public").is_err(),
                "{} should be rejected",
                host
            );
        }

        let parts = parts(
            axum::http::Request::builder()
                .uri("/public")
                .header("Host", "example.com/admin?"),
        );
        assert!(Request::from_http(&parts, b"").is_err());
    }

    #[test]
    fn test_target_slashes_stay_in_path() {
        let req = Request::from_transport(Method::GET, "http", Some("example.com"), "//evil.example/x?a=1").unwrap();
        assert_eq!(req.uri().host(), Some("example.com"));
        assert_eq!(req.uri().path(), "/evil.example/x");
        assert_eq!(req.uri().query_string(), "a=1");
    }

    #[test]
    fn test_from_http_headers() {
        let parts = parts(
            axum::http::Request::builder()
                .method("POST")
                .uri("/login?next=%2Fhome")
                .header("Host", "example.com")
                .header("Cookie", "session=abc; theme=dark%20blue")
                .header("Authorization", "Basic cGV0ZTpodW50ZXIy")
                .header("X-Request-ID", "req-1")
                .header("Content-Type", "application/x-www-form-urlencoded"),
        );
        let req = Request::from_http(&parts, b"user[name]=pete&remember=1").unwrap();

        assert_eq!(req.id(), "req-1");
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.uri().to_string(), "http://example.com/login?next=%2Fhome");
        assert_eq!(req.param("next"), Some("/home"));
        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookie("theme"), Some("dark blue"));
        assert_eq!(req.credentials().map(|c| c.username()), Some("pete"));
        assert_eq!(req.body().get(&["user", "name"]).and_then(QueryNode::as_leaf), Some("pete"));
        assert_eq!(req.param("remember"), Some("1"));
    }

    #[test]
    fn test_non_form_body_ignored() {
        let parts = parts(
            axum::http::Request::builder()
                .uri("/x")
                .header("Content-Type", "application/json"),
        );
        let req = Request::from_http(&parts, br#"{"a":1}"#).unwrap();
        assert!(req.body().is_empty());
        assert!(req.uri().host().is_none());
    }

    #[test]
    fn test_param_lookup_order() {
        let mut req = Request::post("/p?a=query", "a=body&b=body").unwrap();
        req.set_attribute("a", "attr");
        req.set_attribute("c", "attr");

        assert_eq!(req.param("a"), Some("query"));
        assert_eq!(req.param("b"), Some("body"));
        assert_eq!(req.param("c"), Some("attr"));
        assert_eq!(req.param("d"), None);
    }

    #[test]
    fn test_defaults() {
        let req = Request::get("/").unwrap();
        assert!(req.user().is_anonymous());
        assert!(Uuid::parse_str(req.id()).is_ok());
        assert!(req.files().is_empty());
    }
}
