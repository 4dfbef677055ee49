//! Structured URIs with a query tree.
//!
//! # Responsibilities
//! - Parse absolute and relative URI strings
//! - Hold scheme/host/port/path/fragment plus one query tree
//! - Mutate the query by path (scrub / rewrite) without touching the rest
//! - Reassemble a canonical string form
//!
//! # Design Decisions
//! - Scheme and host are lowercased on construction
//! - Path always begins with exactly one `/`; an empty path becomes `/`
//! - Query mutation happens in place on `&mut Uri`
//! - Ports equal to the scheme default are dropped from the string form

mod parser;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::query::{self, QueryNode};

/// Errors raised while building a [`Uri`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    /// The input cannot be read as a URI.
    #[error("malformed URI {input:?}: {reason}")]
    Format { input: String, reason: &'static str },
}

impl UriError {
    pub(crate) fn format(input: &str, reason: &'static str) -> Self {
        UriError::Format {
            input: input.to_string(),
            reason,
        }
    }
}

/// Conventional port for a scheme, if it has one.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

/// A parsed URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: Option<String>,
    user_info: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: QueryNode,
    fragment: Option<String>,
}

impl Uri {
    /// Parse a URI string.
    ///
    /// Absolute input must yield both a scheme and a host; relative input
    /// leaves them absent.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let raw = parser::split(input)?;
        Ok(Self {
            scheme: raw.scheme.map(str::to_ascii_lowercase),
            user_info: raw.user_info.map(str::to_string),
            host: raw.host.map(str::to_ascii_lowercase),
            port: raw.port,
            path: normalize_path(raw.path),
            query: raw.query.map(query::parse).unwrap_or_default(),
            fragment: raw.fragment.map(str::to_string),
        })
    }

    /// Start building a URI from its parts.
    pub fn builder() -> UriBuilder {
        UriBuilder::default()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn user_info(&self) -> Option<&str> {
        self.user_info.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The explicit port, `None` meaning the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The port in effect: explicit, or the scheme's default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.scheme().and_then(default_port))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some() && self.host.is_some()
    }

    pub fn set_path(&mut self, path: &str) {
        self.path = normalize_path(path);
    }

    pub fn set_fragment(&mut self, fragment: Option<&str>) {
        self.fragment = fragment.map(str::to_string);
    }

    /// The query tree.
    pub fn query(&self) -> &QueryNode {
        &self.query
    }

    /// The query as a plain nested mapping.
    pub fn query_array(&self) -> Value {
        Value::from(&self.query)
    }

    /// The serialized query, without the leading `?`.
    pub fn query_string(&self) -> String {
        query::serialize(&self.query)
    }

    /// Replace the whole query from a query string, a tree or a JSON mapping.
    pub fn set_query(&mut self, value: impl IntoQuery) {
        self.query = value.into_query();
    }

    /// Delete the paths `spec` marks, keeping everything else.
    pub fn remove_from_query(&mut self, spec: &QueryNode) {
        self.query = query::remove_at_paths(&self.query, spec);
    }

    /// Deep-merge `spec` into the query.
    pub fn update_query_values(&mut self, spec: &QueryNode) {
        self.query = query::merge_at_paths(&self.query, spec);
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(scheme), Some(host)) = (&self.scheme, &self.host) {
            write!(f, "{}://", scheme)?;
            if let Some(info) = &self.user_info {
                write!(f, "{}@", info)?;
            }
            f.write_str(host)?;
            if let Some(port) = self.port {
                if default_port(scheme) != Some(port) {
                    write!(f, ":{}", port)?;
                }
            }
        }
        f.write_str(&self.path)?;
        let query = self.query_string();
        if !query.is_empty() {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// Exactly one leading `/`. A path starting `//` would be written out as a
/// network-path reference and read back as an authority.
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Values accepted by [`Uri::set_query`].
pub trait IntoQuery {
    fn into_query(self) -> QueryNode;
}

impl IntoQuery for &str {
    fn into_query(self) -> QueryNode {
        query::parse(self)
    }
}

impl IntoQuery for String {
    fn into_query(self) -> QueryNode {
        query::parse(&self)
    }
}

/// A leaf is read as a query string so the root always stays a branch.
impl IntoQuery for QueryNode {
    fn into_query(self) -> QueryNode {
        match self {
            QueryNode::Leaf(s) => query::parse(&s),
            branch => branch,
        }
    }
}

impl IntoQuery for Value {
    fn into_query(self) -> QueryNode {
        QueryNode::from(self).into_query()
    }
}

/// Builder for [`Uri`] from component parts.
#[derive(Debug, Default)]
pub struct UriBuilder {
    scheme: Option<String>,
    user_info: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    query: Option<QueryNode>,
    fragment: Option<String>,
}

impl UriBuilder {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn user_info(mut self, info: impl Into<String>) -> Self {
        self.user_info = Some(info.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, query: impl IntoQuery) -> Self {
        self.query = Some(query.into_query());
        self
    }

    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Assemble the URI. A host without a scheme (or the reverse) cannot be
    /// written back out, so it is rejected.
    pub fn build(self) -> Result<Uri, UriError> {
        let described = self.host.clone().unwrap_or_default();
        match (&self.scheme, &self.host) {
            (Some(_), None) => return Err(UriError::format(&described, "missing host")),
            (None, Some(_)) => return Err(UriError::format(&described, "missing scheme")),
            (Some(s), Some(h)) if s.is_empty() || h.is_empty() => {
                return Err(UriError::format(&described, "empty scheme or host"))
            }
            _ => {}
        }

        Ok(Uri {
            scheme: self.scheme.map(|s| s.to_ascii_lowercase()),
            user_info: self.user_info,
            host: self.host.map(|h| h.to_ascii_lowercase()),
            port: self.port,
            path: normalize_path(self.path.as_deref().unwrap_or("/")),
            query: self.query.unwrap_or_default(),
            fragment: self.fragment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "http://example.com/sample/uri?user[alias]=mr.pete&user[name]=pete&toc=1&options[contact_methods][email]=pete@ex.com";

    #[test]
    fn test_parse_components() {
        let uri = Uri::parse("HTTPS://Example.COM:8443/a?x=1#frag").unwrap();
        assert_eq!(uri.scheme(), Some("https"));
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port(), Some(8443));
        assert_eq!(uri.path(), "/a");
        assert_eq!(uri.query_string(), "x=1");
        assert_eq!(uri.fragment(), Some("frag"));
    }

    #[test]
    fn test_default_port_omitted() {
        let uri = Uri::parse("http://example.com:80/a").unwrap();
        assert_eq!(uri.to_string(), "http://example.com/a");
        assert_eq!(uri.effective_port(), Some(80));

        let uri = Uri::parse("https://example.com:8443").unwrap();
        assert_eq!(uri.to_string(), "https://example.com:8443/");
    }

    #[test]
    fn test_relative_uri() {
        let uri: Uri = "sample/uri?a=1#x".parse().unwrap();
        assert!(!uri.is_absolute());
        assert_eq!(uri.path(), "/sample/uri");
        assert_eq!(uri.to_string(), "/sample/uri?a=1#x");
    }

    #[test]
    fn test_format_error() {
        let err = Uri::parse("mailto:pete@ex.com").unwrap_err();
        assert!(matches!(err, UriError::Format { .. }));
    }

    #[test]
    fn test_round_trip() {
        for input in [SAMPLE, "https://u@h.org:444/p/q#f", "/x?a[]=1&a[]=2", "http://h//p"] {
            let uri = Uri::parse(input).unwrap();
            assert_eq!(Uri::parse(&uri.to_string()).unwrap(), uri);
        }

        let mut relative = Uri::parse("/start").unwrap();
        relative.set_path("//evil.example/x");
        assert_eq!(relative.to_string(), "/evil.example/x");
        assert_eq!(Uri::parse(&relative.to_string()).unwrap(), relative);
    }

    #[test]
    fn test_remove_from_query_in_place() {
        let mut uri = Uri::parse(SAMPLE).unwrap();
        uri.remove_from_query(&json!({
            "user": {"name": false},
            "options": {"contact_methods": {"email": false}}
        }).into());

        assert_eq!(uri.query_string(), "user[alias]=mr.pete&toc=1");
        assert_eq!(uri.path(), "/sample/uri");
        assert_eq!(uri.host(), Some("example.com"));
    }

    #[test]
    fn test_update_query_values() {
        let mut uri = Uri::parse(SAMPLE).unwrap();
        uri.update_query_values(&json!({"user": {"name": "peter"}, "page": "2"}).into());
        assert_eq!(uri.query_array()["user"]["name"], json!("peter"));
        assert_eq!(uri.query_array()["user"]["alias"], json!("mr.pete"));
        assert_eq!(uri.query_array()["page"], json!("2"));
    }

    #[test]
    fn test_set_query_variants() {
        let mut uri = Uri::parse("http://h/p?old=1").unwrap();
        uri.set_query("a[b]=1");
        assert_eq!(uri.query_string(), "a[b]=1");

        uri.set_query(json!({"x": {"y": "z"}}));
        assert_eq!(uri.query_string(), "x[y]=z");

        uri.set_query(QueryNode::empty());
        assert_eq!(uri.to_string(), "http://h/p");
    }

    #[test]
    fn test_builder() {
        let uri = Uri::builder()
            .scheme("HTTP")
            .host("Example.com")
            .port(Some(8080))
            .path("sample/uri")
            .query("toc=1")
            .fragment("top")
            .build()
            .unwrap();
        assert_eq!(uri.to_string(), "http://example.com:8080/sample/uri?toc=1#top");

        assert!(Uri::builder().host("h").build().is_err());
        assert!(Uri::builder().path("/only").build().is_ok());
    }
}
