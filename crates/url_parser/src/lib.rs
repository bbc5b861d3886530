//! # URL Parser
//!
//! Splits an absolute `scheme://host[:port][/path][?query][#fragment]` URL
//! into the parts an HTTP request needs. The path defaults to `/`, dot
//! segments are resolved, and the fragment is dropped since it is never sent.

#![forbid(unsafe_code)]

use core::fmt;
use std::net::Ipv6Addr;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL input")]
    EmptyInput,
    #[error("missing scheme")]
    MissingScheme,
    #[error("invalid scheme")]
    InvalidScheme,
    #[error("invalid host")]
    InvalidHost,
    #[error("invalid port")]
    InvalidPort,
}

// ─────────────────────────────────────────────────────────────────────────────
// Url
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Lower-cased scheme.
    pub scheme: String,
    /// Lower-cased host name, IPv4 literal, or IPv6 literal without brackets.
    pub host: String,
    /// Explicit port; `None` when absent or equal to the scheme default.
    pub port: Option<u16>,
    /// Normalized absolute path, at least `/`.
    pub path: String,
    pub query: Option<String>,
}

impl Url {
    /// Parse a URL string into a `Url` struct.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(UrlError::EmptyInput);
        }

        let (scheme, rest) = parse_scheme(input)?;
        let rest = rest.strip_prefix("//").ok_or(UrlError::InvalidScheme)?;

        let (authority, rest) = split_authority(rest);
        let (host, port) = parse_host_port(authority, &scheme)?;

        let (rest, _fragment) = split_at_char(rest, '#');
        let (path, query) = split_at_char(rest, '?');

        Ok(Url {
            scheme,
            host,
            port,
            path: normalize_path(path),
            query: query.map(str::to_string),
        })
    }

    /// Return the effective port (explicit or default for scheme).
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| default_port(&self.scheme))
    }

    /// `host[:port]`, the port shown only when it is not the default.
    /// IPv6 literals are bracketed.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(p) => format!("{host}:{p}"),
            None => host,
        }
    }

    /// Path plus query, as sent in a request line or `:path`.
    pub fn path_and_query(&self) -> String {
        match self.query {
            Some(ref q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}",
            self.scheme,
            self.authority(),
            self.path_and_query()
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`, lower-cased.
fn parse_scheme(input: &str) -> Result<(String, &str), UrlError> {
    let (scheme, rest) = input.split_once(':').ok_or(UrlError::MissingScheme)?;
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Err(UrlError::MissingScheme),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err(UrlError::InvalidScheme);
    }
    Ok((scheme.to_ascii_lowercase(), rest))
}

fn split_authority(input: &str) -> (&str, &str) {
    // Authority ends at '/', '?', '#', or end of string
    match input.find(['/', '?', '#']) {
        Some(i) => (&input[..i], &input[i..]),
        None => (input, ""),
    }
}

fn parse_host_port(input: &str, scheme: &str) -> Result<(String, Option<u16>), UrlError> {
    let (host, port_str) = if let Some(bracketed) = input.strip_prefix('[') {
        // "[v6]" or "[v6]:port"
        let (literal, after) = bracketed.split_once(']').ok_or(UrlError::InvalidHost)?;
        let port_str = match after {
            "" => None,
            _ => Some(after.strip_prefix(':').ok_or(UrlError::InvalidHost)?),
        };
        let host = literal.to_ascii_lowercase();
        host.parse::<Ipv6Addr>().map_err(|_| UrlError::InvalidHost)?;
        (host, port_str)
    } else {
        let (host_str, port_str) = match input.rfind(':') {
            Some(colon) => (&input[..colon], Some(&input[colon + 1..])),
            None => (input, None),
        };
        let host = host_str.to_ascii_lowercase();
        validate_host(&host)?;
        (host, port_str)
    };

    let port = match port_str {
        Some(ps) if !ps.is_empty() && ps.bytes().all(|b| b.is_ascii_digit()) => {
            let p: u16 = ps.parse().map_err(|_| UrlError::InvalidPort)?;
            // Omit if it's the default port
            (Some(p) != default_port(scheme)).then_some(p)
        }
        Some(_) => return Err(UrlError::InvalidPort),
        None => None,
    };

    Ok((host, port))
}

/// Host names are dot-separated labels of at most 63 characters; a trailing
/// dot is accepted. IPv4 literals pass the same check.
fn validate_host(host: &str) -> Result<(), UrlError> {
    let label_ok = |label: &str| {
        label.len() <= 63
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    };
    if host.is_empty() || !host.split('.').all(label_ok) {
        return Err(UrlError::InvalidHost);
    }
    Ok(())
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

fn split_at_char(s: &str, ch: char) -> (&str, Option<&str>) {
    match s.split_once(ch) {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    }
}

/// Normalize a URL path by resolving `.` and `..` segments.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = format!("/{}", segments.join("/"));
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if trailing && out.len() > 1 {
        out.push('/');
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_http() {
        let url = Url::parse("http://example.com").unwrap();
        assert_eq!(url.scheme, "http");
        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, None);
        assert_eq!(url.path, "/");
        assert_eq!(url.query, None);
        assert_eq!(url.effective_port(), Some(80));
    }

    #[test]
    fn test_parse_https_with_path() {
        let url = Url::parse("https://www.example.com/index.html").unwrap();
        assert_eq!(url.scheme, "https");
        assert_eq!(url.path, "/index.html");
        assert_eq!(url.effective_port(), Some(443));
    }

    #[test]
    fn test_parse_with_port() {
        let url = Url::parse("http://localhost:8080/api").unwrap();
        assert_eq!(url.host, "localhost");
        assert_eq!(url.port, Some(8080));
        assert_eq!(url.effective_port(), Some(8080));
        assert_eq!(url.authority(), "localhost:8080");
    }

    #[test]
    fn test_parse_default_port_omitted() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(url.port, None);
        assert_eq!(url.authority(), "example.com");
    }

    #[test]
    fn test_parse_query_and_fragment() {
        let url = Url::parse("https://example.com/search?q=rust#results").unwrap();
        assert_eq!(url.path, "/search");
        assert_eq!(url.query.as_deref(), Some("q=rust"));
        assert_eq!(url.path_and_query(), "/search?q=rust");
    }

    #[test]
    fn test_parse_query_without_path() {
        let url = Url::parse("http://example.com?x=1").unwrap();
        assert_eq!(url.path_and_query(), "/?x=1");
    }

    #[test]
    fn test_parse_ipv4_host() {
        let url = Url::parse("http://192.168.1.1:3000/").unwrap();
        assert_eq!(url.host, "192.168.1.1");
        assert_eq!(url.port, Some(3000));
    }

    #[test]
    fn test_parse_ipv6_host() {
        let url = Url::parse("https://[::1]:8443/status").unwrap();
        assert_eq!(url.host, "::1");
        assert_eq!(url.port, Some(8443));
        assert_eq!(url.path, "/status");
        assert_eq!(url.authority(), "[::1]:8443");
        assert_eq!(url.to_string(), "https://[::1]:8443/status");

        let url = Url::parse("http://[2001:DB8::1]").unwrap();
        assert_eq!(url.host, "2001:db8::1");
        assert_eq!(url.port, None);
        assert_eq!(url.authority(), "[2001:db8::1]");
    }

    #[test]
    fn test_ipv6_errors() {
        assert_eq!(Url::parse("http://[::1/"), Err(UrlError::InvalidHost));
        assert_eq!(Url::parse("http://[nothex]/"), Err(UrlError::InvalidHost));
        assert_eq!(Url::parse("http://[::1]x/"), Err(UrlError::InvalidHost));
        assert_eq!(Url::parse("http://[::1]:/"), Err(UrlError::InvalidPort));
        assert_eq!(Url::parse("http://::1/"), Err(UrlError::InvalidHost));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_path("/a/./b/"), "/a/b/");
        assert_eq!(normalize_path("/../.."), "/");
        assert_eq!(normalize_path("/a//b"), "/a/b");
    }

    #[test]
    fn test_case_insensitive_scheme_and_host() {
        let url = Url::parse("HTTPS://Example.COM/Path").unwrap();
        assert_eq!(url.scheme, "https");
        assert_eq!(url.host, "example.com");
        assert_eq!(url.path, "/Path");
    }

    #[test]
    fn test_display() {
        let url = Url::parse("http://example.com:8080/a?b=c#d").unwrap();
        assert_eq!(url.to_string(), "http://example.com:8080/a?b=c");
    }

    #[test]
    fn test_errors() {
        assert_eq!(Url::parse(""), Err(UrlError::EmptyInput));
        assert_eq!(Url::parse("example.com/path"), Err(UrlError::MissingScheme));
        assert_eq!(Url::parse("http:example.com"), Err(UrlError::InvalidScheme));
        assert_eq!(Url::parse("http:///path"), Err(UrlError::InvalidHost));
        assert_eq!(Url::parse("http://user@host/"), Err(UrlError::InvalidHost));
        assert_eq!(Url::parse("http://host:99999/"), Err(UrlError::InvalidPort));
        assert_eq!(Url::parse("http://host:abc/"), Err(UrlError::InvalidPort));
        assert_eq!(Url::parse("http://host:/"), Err(UrlError::InvalidPort));
    }
}
