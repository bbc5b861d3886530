//! # Network Service
//!
//! Connects to the URL's host over plain TCP or TLS and runs a single GET
//! exchange, either as HTTP/1.1 or as HTTP/2 negotiated with ALPN `h2`.

pub mod tls;
pub mod transport;

use std::io::{self, Write};
use std::time::Duration;

use http1::HttpError;
use http2::hpack::Header;
use http2::{H2Error, SessionConfig};
use tracing::{debug, enabled, Level};
use url_parser::{Url, UrlError};

pub use tls::TlsOptions;
pub use transport::Transport;

/// Default connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Use HTTP/2. Requires `https` and ALPN `h2`.
    pub http2: bool,
    pub verify_certificates: bool,
    pub keylog: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub h2: SessionConfig,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            http2: false,
            verify_certificates: true,
            keylog: false,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            h2: SessionConfig::default(),
        }
    }
}

/// A fetch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn from_http1(resp: http1::HttpResponse) -> Self {
        Self {
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
        }
    }

    /// `:status` is dropped and names are shown in display case.
    fn from_http2(resp: http2::Response) -> Self {
        let headers = resp
            .headers
            .iter()
            .filter(|h| h.name != b":status")
            .map(|h| {
                (
                    convert_header_name(&h.name_str()),
                    h.value_str().into_owned(),
                )
            })
            .collect();
        Self {
            status: resp.status,
            headers,
            body: resp.body,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid server name: {0}")]
    InvalidServerName(String),
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("server did not negotiate h2 via ALPN")]
    AlpnNotNegotiated,
    #[error("HTTP/1.1 error: {0}")]
    Http1(#[from] HttpError),
    #[error("HTTP/2 error: {0}")]
    Http2(#[from] H2Error),
    #[error("HTTP/2 is only supported over https")]
    Http2RequiresTls,
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch
// ─────────────────────────────────────────────────────────────────────────────

/// Perform one GET request for `url` and return the complete response.
pub fn fetch(
    url: &Url,
    headers: &[(String, String)],
    options: &FetchOptions,
) -> Result<FetchResponse, NetError> {
    let is_tls = match url.scheme.as_str() {
        "https" => true,
        "http" => false,
        other => return Err(NetError::UnsupportedScheme(other.to_string())),
    };
    if options.http2 && !is_tls {
        return Err(NetError::Http2RequiresTls);
    }
    let port = url
        .effective_port()
        .ok_or_else(|| NetError::UnsupportedScheme(url.scheme.clone()))?;

    let tls_options = is_tls.then_some(TlsOptions {
        verify_certificates: options.verify_certificates,
        keylog: options.keylog,
        alpn_h2: options.http2,
    });

    let mut transport = Transport::connect(
        &url.host,
        port,
        tls_options.as_ref(),
        options.connect_timeout,
        options.read_timeout,
    )?;

    let response = if options.http2 {
        if transport.alpn_protocol() != Some(tls::ALPN_H2) {
            return Err(NetError::AlpnNotNegotiated);
        }
        fetch_http2(transport, url, headers, &options.h2)?
    } else {
        fetch_http1(&mut transport, url, headers)?
    };

    if enabled!(Level::DEBUG) {
        debug!("Response: {}", response.status);
        for (name, value) in &response.headers {
            debug!("  {name}: {value}");
        }
    }
    Ok(response)
}

fn fetch_http1(
    transport: &mut Transport,
    url: &Url,
    headers: &[(String, String)],
) -> Result<FetchResponse, NetError> {
    let request = http1::build_get_request(&url.path_and_query(), &url.authority(), headers);
    debug!("HTTP/1.1 request:\n{}", String::from_utf8_lossy(&request));

    transport.write_all(&request)?;
    transport.flush()?;

    let resp = http1::read_response(transport)?;
    Ok(FetchResponse::from_http1(resp))
}

fn fetch_http2(
    transport: Transport,
    url: &Url,
    headers: &[(String, String)],
    config: &SessionConfig,
) -> Result<FetchResponse, NetError> {
    let mut request = http2::Request::get(
        url.scheme.as_str(),
        url.authority(),
        url.path_and_query(),
    );
    request.headers = headers
        .iter()
        .map(|(name, value)| Header::new(name.as_str(), value.as_str()))
        .collect();

    let resp = http2::get(transport, config, &request)?;
    Ok(FetchResponse::from_http2(resp))
}

/// Convert an HTTP/2 header name to display case: `content-type` becomes
/// `Content-Type`, and a leading `:` is dropped.
pub fn convert_header_name(name: &str) -> String {
    let name = name.strip_prefix(':').unwrap_or(name);
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
