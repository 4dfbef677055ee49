//! URI string splitting.
//!
//! Accepts absolute form (`scheme://[userinfo@]host[:port][/path][?query][#fragment]`)
//! and relative references (`/path?query#fragment`, `path`, `?query`).

use crate::uri::UriError;

/// Raw components of a URI string before validation.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RawUri<'a> {
    pub scheme: Option<&'a str>,
    pub user_info: Option<&'a str>,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

pub(crate) fn split(input: &str) -> Result<RawUri<'_>, UriError> {
    let input = input.trim();
    let mut raw = RawUri::default();

    let (rest, fragment) = match input.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (input, None),
    };
    raw.fragment = fragment;

    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };
    raw.query = query;

    if rest.starts_with("//") {
        return Err(UriError::format(input, "missing scheme"));
    }

    let Some((scheme, hier)) = scheme_split(rest) else {
        raw.path = rest;
        return Ok(raw);
    };

    let Some(hier) = hier.strip_prefix("//") else {
        return Err(UriError::format(input, "missing host"));
    };
    raw.scheme = Some(scheme);

    let (authority, path) = match hier.find('/') {
        Some(i) => (&hier[..i], &hier[i..]),
        None => (hier, ""),
    };
    raw.path = path;

    let host_port = match authority.rsplit_once('@') {
        Some((info, host_port)) => {
            raw.user_info = Some(info);
            host_port
        }
        None => authority,
    };

    let (host, port) = split_host_port(host_port).ok_or_else(|| UriError::format(input, "malformed authority"))?;
    if host.is_empty() {
        return Err(UriError::format(input, "missing host"));
    }
    raw.host = Some(host);
    raw.port = match port {
        Some(p) => Some(p.parse().map_err(|_| UriError::format(input, "invalid port"))?),
        None => None,
    };

    Ok(raw)
}

/// `scheme:` prefix per RFC 3986: a letter followed by letters, digits,
/// `+`, `-` or `.`, ending before any `/`.
fn scheme_split(s: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = s.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

fn split_host_port(s: &str) -> Option<(&str, Option<&str>)> {
    if let Some(v6) = s.strip_prefix('[') {
        let close = v6.find(']')?;
        let host = &s[..close + 2];
        let after = &v6[close + 1..];
        return match after.strip_prefix(':') {
            Some(port) => Some((host, Some(port))),
            None if after.is_empty() => Some((host, None)),
            None => None,
        };
    }
    match s.rsplit_once(':') {
        Some((host, port)) => Some((host, Some(port))),
        None => Some((s, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute() {
        let raw = split("HTTPS://user:pw@Example.com:8443/a/b?x=1#top").unwrap();
        assert_eq!(raw.scheme, Some("HTTPS"));
        assert_eq!(raw.user_info, Some("user:pw"));
        assert_eq!(raw.host, Some("Example.com"));
        assert_eq!(raw.port, Some(8443));
        assert_eq!(raw.path, "/a/b");
        assert_eq!(raw.query, Some("x=1"));
        assert_eq!(raw.fragment, Some("top"));
    }

    #[test]
    fn test_ipv6_host() {
        let raw = split("http://[::1]:8080/").unwrap();
        assert_eq!(raw.host, Some("[::1]"));
        assert_eq!(raw.port, Some(8080));
    }

    #[test]
    fn test_relative_forms() {
        let raw = split("/sample/uri?a=1").unwrap();
        assert_eq!(raw.scheme, None);
        assert_eq!(raw.path, "/sample/uri");

        let raw = split("docs/page:2").unwrap();
        assert_eq!(raw.scheme, None);
        assert_eq!(raw.path, "docs/page:2");

        let raw = split("?only=query").unwrap();
        assert_eq!(raw.path, "");
        assert_eq!(raw.query, Some("only=query"));
    }

    #[test]
    fn test_format_errors() {
        assert!(split("mailto:someone@example.com").is_err());
        assert!(split("//example.com/path").is_err());
        assert!(split("http:///path").is_err());
        assert!(split("http://example.com:http/").is_err());
        assert!(split("http://[::1/").is_err());
    }
}
