//! # HTTP/1.1 Client Messages (RFC 9112)
//!
//! Builds GET request messages and parses responses incrementally. The body
//! is delimited by Content-Length, chunked transfer coding, or connection
//! close.

#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed before the response was complete")]
    Incomplete,
    #[error("invalid status line")]
    InvalidStatusLine,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("invalid chunked encoding")]
    InvalidChunk,
    #[error("unsupported transfer coding: {0}")]
    UnsupportedTransferEncoding(String),
    #[error("message too large")]
    TooLarge,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Build an HTTP/1.1 GET request as raw bytes.
///
/// Caller headers are written verbatim after `Host`.
pub fn build_get_request(path: &str, host: &str, headers: &[(String, String)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    buf.extend_from_slice(b"GET ");
    buf.extend_from_slice(path.as_bytes());
    buf.extend_from_slice(b" HTTP/1.1\r\n");

    buf.extend_from_slice(b"Host: ");
    buf.extend_from_slice(host.as_bytes());
    buf.extend_from_slice(b"\r\n");

    for (name, value) in headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Get a header value by name (case-insensitive). Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

// ─────────────────────────────────────────────────────────────────────────────
// Body mode
// ─────────────────────────────────────────────────────────────────────────────

/// How to determine the body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Body length specified by Content-Length header.
    ContentLength(usize),
    /// Chunked transfer encoding.
    Chunked,
    /// Read until connection close.
    UntilClose,
    /// No body (1xx, 204, 304).
    None,
}

/// Pick the body framing from the status and headers.
///
/// Any transfer coding other than `chunked` (alone) is rejected.
pub fn determine_body_mode(headers: &[(String, String)], status: u16) -> Result<BodyMode, HttpError> {
    if status < 200 || status == 204 || status == 304 {
        return Ok(BodyMode::None);
    }

    if let Some(te) = header_value(headers, "transfer-encoding") {
        return if te.trim().eq_ignore_ascii_case("chunked") {
            Ok(BodyMode::Chunked)
        } else {
            Err(HttpError::UnsupportedTransferEncoding(te.to_string()))
        };
    }

    if let Some(cl) = header_value(headers, "content-length") {
        let len = cl
            .trim()
            .parse::<usize>()
            .map_err(|_| HttpError::InvalidContentLength)?;
        return Ok(BodyMode::ContentLength(len));
    }

    Ok(BodyMode::UntilClose)
}

// ─────────────────────────────────────────────────────────────────────────────
// Response parser
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental HTTP/1.1 response parser.
///
/// Feed data via `feed()`, then call `try_parse()` to attempt extraction.
/// Read-until-close bodies are completed with `finish_until_close()`.
#[derive(Debug)]
pub struct HttpResponseParser {
    buf: Vec<u8>,
    max_header_size: usize,
    max_body_size: usize,
}

impl HttpResponseParser {
    pub fn new() -> Self {
        Self::with_limits(64 * 1024, 64 * 1024 * 1024)
    }

    pub fn with_limits(max_header_size: usize, max_body_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_header_size,
            max_body_size,
        }
    }

    /// Append data to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.buf.extend_from_slice(data);
        if self.buf.len() > self.max_header_size.saturating_add(self.max_body_size) {
            return Err(HttpError::TooLarge);
        }
        Ok(())
    }

    /// Try to parse a complete HTTP response from the buffered data.
    ///
    /// Returns `Ok(Some(response))` once complete, `Ok(None)` if more data
    /// is needed (always the case for read-until-close bodies).
    pub fn try_parse(&mut self) -> Result<Option<HttpResponse>, HttpError> {
        let Some(header_end) = find_header_end(&self.buf) else {
            if self.buf.len() > self.max_header_size {
                return Err(HttpError::TooLarge);
            }
            return Ok(None);
        };

        let head = parse_head(&self.buf[..header_end])?;
        let body_start = header_end + 4;
        let body_mode = determine_body_mode(&head.headers, head.status)?;

        let body = match body_mode {
            BodyMode::None => Vec::new(),
            BodyMode::ContentLength(len) => {
                if len > self.max_body_size {
                    return Err(HttpError::TooLarge);
                }
                match self.buf.get(body_start..body_start + len) {
                    Some(body) => body.to_vec(),
                    None => return Ok(None),
                }
            }
            BodyMode::Chunked => match decode_chunked(&self.buf[body_start..], self.max_body_size)? {
                Some(body) => body,
                None => return Ok(None),
            },
            BodyMode::UntilClose => return Ok(None),
        };

        if body.len() > self.max_body_size {
            return Err(HttpError::TooLarge);
        }
        self.buf.clear();
        Ok(Some(head.into_response(body)))
    }

    /// The peer closed the connection: complete a read-until-close response
    /// with everything buffered after the headers.
    pub fn finish_until_close(&mut self) -> Result<HttpResponse, HttpError> {
        let header_end = find_header_end(&self.buf).ok_or(HttpError::Incomplete)?;
        let head = parse_head(&self.buf[..header_end])?;
        if determine_body_mode(&head.headers, head.status)? != BodyMode::UntilClose {
            return Err(HttpError::Incomplete);
        }
        let body = self.buf[header_end + 4..].to_vec();
        self.buf.clear();
        Ok(head.into_response(body))
    }
}

impl Default for HttpResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one complete response from a blocking stream.
pub fn read_response<R: Read>(reader: &mut R) -> Result<HttpResponse, HttpError> {
    let mut parser = HttpResponseParser::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // Peers that close TLS without close_notify still end the body.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            debug!("connection closed by peer");
            return parser.finish_until_close();
        }
        trace!(bytes = n, "response data");
        parser.feed(&chunk[..n])?;
        if let Some(response) = parser.try_parse()? {
            return Ok(response);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Head {
    version: String,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl Head {
    fn into_response(self, body: Vec<u8>) -> HttpResponse {
        HttpResponse {
            version: self.version,
            status: self.status,
            reason: self.reason,
            headers: self.headers,
            body,
        }
    }
}

/// Find the position of the first `\r\n\r\n` (returns index of first \r).
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse the status line and headers.
fn parse_head(bytes: &[u8]) -> Result<Head, HttpError> {
    let text = std::str::from_utf8(bytes).map_err(|_| HttpError::InvalidStatusLine)?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or(HttpError::InvalidStatusLine)?;
    let (version, status, reason) = parse_status_line(status_line)?;

    let headers = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = line.split_once(':').ok_or(HttpError::InvalidHeader)?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect::<Result<Vec<_>, HttpError>>()?;

    Ok(Head {
        version,
        status,
        reason,
        headers,
    })
}

fn parse_status_line(line: &str) -> Result<(String, u16, String), HttpError> {
    // "HTTP/1.1 200 OK"
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or(HttpError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/") {
        return Err(HttpError::InvalidStatusLine);
    }
    let status_str = parts.next().ok_or(HttpError::InvalidStatusLine)?;
    if status_str.len() != 3 {
        return Err(HttpError::InvalidStatusLine);
    }
    let status: u16 = status_str
        .parse()
        .map_err(|_| HttpError::InvalidStatusLine)?;
    let reason = parts.next().unwrap_or("").to_string();
    Ok((version.to_string(), status, reason))
}

/// Decode chunked transfer encoding.
///
/// Returns `Ok(Some(body))` once the last chunk and trailer section are
/// buffered, `Ok(None)` if more data is needed. A body growing past
/// `max_body_size` is `TooLarge`.
fn decode_chunked(data: &[u8], max_body_size: usize) -> Result<Option<Vec<u8>>, HttpError> {
    let mut body = Vec::new();
    let mut offset = 0;

    loop {
        let Some(line_end) = find_crlf(data, offset) else {
            return Ok(None);
        };

        let size_str =
            std::str::from_utf8(&data[offset..line_end]).map_err(|_| HttpError::InvalidChunk)?;
        // Chunk extensions after ';' are ignored
        let size_hex = size_str.split(';').next().unwrap_or("").trim();
        let chunk_size =
            usize::from_str_radix(size_hex, 16).map_err(|_| HttpError::InvalidChunk)?;
        let chunk_start = line_end + 2;

        if chunk_size == 0 {
            // Skip trailer fields up to the empty line.
            let mut pos = chunk_start;
            loop {
                let Some(end) = find_crlf(data, pos) else {
                    return Ok(None);
                };
                if end == pos {
                    return Ok(Some(body));
                }
                pos = end + 2;
            }
        }

        if chunk_size > max_body_size.saturating_sub(body.len()) {
            return Err(HttpError::TooLarge);
        }
        let chunk_end = chunk_start
            .checked_add(chunk_size)
            .ok_or(HttpError::InvalidChunk)?;
        let next = chunk_end.checked_add(2).ok_or(HttpError::InvalidChunk)?;
        if next > data.len() {
            return Ok(None);
        }
        if &data[chunk_end..next] != b"\r\n" {
            return Err(HttpError::InvalidChunk);
        }
        body.extend_from_slice(&data[chunk_start..chunk_end]);
        offset = next;
    }
}

fn find_crlf(data: &[u8], start: usize) -> Option<usize> {
    data.get(start..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| start + p)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
