//! Path templates.
//!
//! # Responsibilities
//! - Parse `/users/{id}/posts` into literal and parameter segments
//! - Match a request path segment by segment, binding parameters
//!
//! # Design Decisions
//! - Literal matching is case-sensitive
//! - A parameter binds exactly one non-empty segment, percent-decoded
//!   (`+` stays literal); literals compare against the raw segment
//! - Empty segments are ignored, so `/a//b/` matches `/a/b`
//! - No regex to guarantee O(n) matching

use thiserror::Error;

use crate::query::parse::percent_decode;

/// A template string that cannot be compiled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid route template {template:?}: {reason}")]
pub struct TemplateSyntaxError {
    pub template: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateSyntaxError> {
        let error = |reason| TemplateSyntaxError {
            template: template.to_string(),
            reason,
        };
        if !template.starts_with('/') {
            return Err(error("must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in template.split('/').filter(|p| !p.is_empty()) {
            let segment = match part.strip_prefix('{') {
                Some(inner) => {
                    let name = inner.strip_suffix('}').ok_or_else(|| error("unclosed '{'"))?;
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(error("bad parameter name"));
                    }
                    if segments.iter().any(|s| matches!(s, Segment::Param(p) if p == name)) {
                        return Err(error("duplicate parameter name"));
                    }
                    Segment::Param(name.to_string())
                }
                None if part.contains(['{', '}']) => return Err(error("braces inside a literal segment")),
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of `{name}` segments.
    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count()
    }

    /// Match `path`, returning the bound parameters in template order.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push((name.clone(), percent_decode(part))),
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let t = RouteTemplate::parse("/sample/uri").unwrap();
        assert_eq!(t.matches("/sample/uri"), Some(vec![]));
        assert_eq!(t.matches("/sample/uri/"), Some(vec![]));
        assert_eq!(t.matches("/Sample/uri"), None);
        assert_eq!(t.matches("/sample"), None);
    }

    #[test]
    fn test_param_binding() {
        let t = RouteTemplate::parse("/users/{id}/posts/{post}").unwrap();
        assert_eq!(t.wildcard_count(), 2);
        assert_eq!(
            t.matches("/users/7/posts/hello"),
            Some(vec![("id".into(), "7".into()), ("post".into(), "hello".into())])
        );
        assert_eq!(t.matches("/users/7/comments/hello"), None);
    }

    #[test]
    fn test_params_are_decoded() {
        let t = RouteTemplate::parse("/users/{id}").unwrap();
        assert_eq!(t.matches("/users/a%20b+c"), Some(vec![("id".into(), "a b+c".into())]));
        assert_eq!(t.matches("/users/%2Fetc"), Some(vec![("id".into(), "/etc".into())]));
    }

    #[test]
    fn test_root() {
        let t = RouteTemplate::parse("/").unwrap();
        assert_eq!(t.matches("/"), Some(vec![]));
        assert_eq!(t.matches("/x"), None);
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["users", "/users/{id", "/users/{}", "/a{b}", "/{x}/{x}"] {
            assert!(RouteTemplate::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
