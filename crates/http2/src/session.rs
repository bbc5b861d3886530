//! Single-stream HTTP/2 client session.
//!
//! One request/response exchange per connection:
//! preface and SETTINGS handshake, a GET on stream 1, response header block
//! reassembly, DATA collection with per-frame flow-control credit, GOAWAY.

use std::io::{Read, Write};

use common::BufferView;
use tracing::{Level, debug, trace};

use crate::dump;
use crate::error::H2Error;
use crate::frame::{
    CONNECTION_PREFACE, DEFAULT_MAX_FRAME_SIZE, ErrorCode, FRAME_HEADER_SIZE, Frame, FrameHeader,
    FrameType, build_continuation, build_goaway, build_headers, build_settings,
    build_settings_ack, build_window_update, flags, frame_from_parts, parse_goaway,
    parse_rst_stream, parse_settings, settings_name,
};
use crate::hpack::{DecodingContext, Header, HpackEncoder};

/// The stream carrying the request.
pub const STREAM_ID: u32 = 1;

/// Client-side session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Parameters sent in the client's SETTINGS frame.
    pub settings: Vec<(u16, u32)>,
    /// Largest header block fragment carried by one HEADERS or CONTINUATION frame.
    pub max_frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settings: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub scheme: String,
    pub authority: String,
    pub path: String,
    /// Caller headers, sent after the pseudo-headers.
    pub headers: Vec<Header>,
}

impl Request {
    pub fn get(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Pseudo-headers followed by the caller headers with lower-cased names.
    pub fn header_list(&self) -> Vec<Header> {
        let mut list = Vec::with_capacity(4 + self.headers.len());
        list.push(Header::new(":method", "GET"));
        list.push(Header::new(":scheme", self.scheme.as_str()));
        list.push(Header::new(":path", self.path.as_str()));
        list.push(Header::new(":authority", self.authority.as_str()));
        list.extend(
            self.headers
                .iter()
                .map(|h| Header::new(h.name.to_ascii_lowercase(), h.value.clone())),
        );
        list
    }
}

/// A complete response. `headers` is the decoded list, `:status` included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

/// Extract the `:status` pseudo-header.
pub fn parse_status(headers: &[Header]) -> Result<u16, H2Error> {
    let header = headers
        .iter()
        .find(|h| h.name == b":status")
        .ok_or(H2Error::MissingStatus)?;
    let value = &header.value;
    if value.len() != 3 || !value.iter().all(u8::is_ascii_digit) {
        return Err(H2Error::InvalidStatus(header.value_str().into_owned()));
    }
    Ok(value
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0')))
}

/// Run one GET exchange over an established byte stream.
pub fn get<S: Read + Write>(
    stream: S,
    config: &SessionConfig,
    request: &Request,
) -> Result<Response, H2Error> {
    Session::new(stream, config.clone()).exchange(request)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Client session over a blocking byte stream.
#[derive(Debug)]
pub struct Session<S> {
    stream: S,
    config: SessionConfig,
    context: DecodingContext,
    encoder: HpackEncoder,
}

impl<S: Read + Write> Session<S> {
    pub fn new(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            config,
            context: DecodingContext::default(),
            encoder: HpackEncoder::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// The response decoding context.
    pub fn context(&self) -> &DecodingContext {
        &self.context
    }

    /// Perform the whole exchange: handshake, request, response, teardown.
    pub fn exchange(&mut self, request: &Request) -> Result<Response, H2Error> {
        self.handshake()?;
        self.send_request(request)?;
        let (headers, end_stream) = self.read_response_headers()?;
        let status = parse_status(&headers)?;
        let body = if end_stream {
            Vec::new()
        } else {
            self.read_body()?
        };
        self.goaway()?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// Send the preface and our SETTINGS, then read until the peer's SETTINGS
    /// has been acknowledged and ours has been acknowledged by the peer.
    ///
    /// Other frames arriving before the handshake completes are skipped.
    pub fn handshake(&mut self) -> Result<(), H2Error> {
        self.stream.write_all(CONNECTION_PREFACE)?;
        debug!("SEND connection preface");
        let settings = build_settings(&self.config.settings);
        self.write_frame(&settings)?;

        let mut received_settings = false;
        let mut received_ack = false;
        while !(received_settings && received_ack) {
            let frame = self.read_frame()?;
            match frame.frame_type {
                FrameType::Settings if frame.has_flag(flags::ACK) => received_ack = true,
                FrameType::Settings => {
                    for (id, value) in parse_settings(&frame.payload)? {
                        debug!(
                            setting = settings_name(id).unwrap_or("unknown"),
                            id, value, "peer setting"
                        );
                    }
                    self.write_frame(&build_settings_ack())?;
                    received_settings = true;
                }
                other => debug!(frame_type = %other, "skipping frame during settings handshake"),
            }
        }
        Ok(())
    }

    /// Encode the request header list and send it on stream 1, splitting the
    /// block into CONTINUATION frames when it exceeds the max frame size.
    pub fn send_request(&mut self, request: &Request) -> Result<(), H2Error> {
        let block = self.encoder.encode(&request.header_list());
        let max = self.config.max_frame_size.max(1);

        if block.len() <= max {
            let frame = build_headers(STREAM_ID, block, true, true)?;
            return self.write_frame(&frame);
        }

        let mut fragments = block.chunks(max).peekable();
        if let Some(first) = fragments.next() {
            let frame = build_headers(STREAM_ID, first.to_vec(), true, false)?;
            self.write_frame(&frame)?;
        }
        while let Some(fragment) = fragments.next() {
            let last = fragments.peek().is_none();
            let frame = build_continuation(STREAM_ID, fragment.to_vec(), last)?;
            self.write_frame(&frame)?;
        }
        Ok(())
    }

    /// Read the response HEADERS and any CONTINUATION frames, then decode the
    /// assembled block once.
    ///
    /// Returns the header list and whether the HEADERS frame ended the stream.
    pub fn read_response_headers(&mut self) -> Result<(Vec<Header>, bool), H2Error> {
        let headers = self.expect(FrameType::Headers)?;
        let end_stream = headers.has_flag(flags::END_STREAM);
        let mut block = header_fragment(&headers)?.to_vec();

        let mut end_headers = headers.has_flag(flags::END_HEADERS);
        while !end_headers {
            let continuation = self.expect(FrameType::Continuation)?;
            block.extend_from_slice(&continuation.payload);
            end_headers = continuation.has_flag(flags::END_HEADERS);
        }

        let list = self.context.decode(&block)?;
        if tracing::enabled!(Level::DEBUG) {
            debug!("HPACK dynamic table\n{}", self.context.dynamic_table);
            for header in &list {
                debug!(%header, "decoded header");
            }
        }
        Ok((list, end_stream))
    }

    /// Collect DATA payloads until END_STREAM, returning flow-control credit
    /// for every frame that does not end the stream.
    pub fn read_body(&mut self) -> Result<Vec<u8>, H2Error> {
        let mut body = Vec::new();
        loop {
            let data = self.expect(FrameType::Data)?;
            if data.has_flag(flags::PADDED) {
                return Err(H2Error::PaddedData);
            }
            body.extend_from_slice(&data.payload);
            if data.has_flag(flags::END_STREAM) {
                return Ok(body);
            }

            // A zero increment is a protocol error on the peer's side.
            let consumed = data.length() as u32;
            if consumed > 0 {
                self.write_frame(&build_window_update(STREAM_ID, consumed)?)?;
                self.write_frame(&build_window_update(0, consumed)?)?;
            }
        }
    }

    /// Close the connection with GOAWAY(NO_ERROR).
    pub fn goaway(&mut self) -> Result<(), H2Error> {
        let frame = build_goaway(STREAM_ID, ErrorCode::NO_ERROR)?;
        self.write_frame(&frame)
    }

    /// Read the next frame, turning RST_STREAM and GOAWAY into their errors
    /// and any other type than `expected` into `UnexpectedFrame`.
    fn expect(&mut self, expected: FrameType) -> Result<Frame, H2Error> {
        let frame = self.read_frame()?;
        match frame.frame_type {
            t if t == expected => Ok(frame),
            FrameType::RstStream => Err(H2Error::StreamReset(parse_rst_stream(&frame.payload)?)),
            FrameType::GoAway => {
                let (last_stream_id, error_code) = parse_goaway(&frame.payload)?;
                Err(H2Error::GoAway {
                    last_stream_id,
                    error_code,
                })
            }
            received => Err(H2Error::UnexpectedFrame { expected, received }),
        }
    }

    fn read_frame(&mut self) -> Result<Frame, H2Error> {
        let mut head = [0u8; FRAME_HEADER_SIZE];
        self.stream.read_exact(&mut head)?;
        let header = FrameHeader::parse(&head)?;
        let mut payload = vec![0u8; header.payload_len()];
        self.stream.read_exact(&mut payload)?;
        let frame = frame_from_parts(header, payload);

        if tracing::enabled!(Level::DEBUG) {
            debug!("RECV\n{}", dump::frame(&frame));
        }
        Ok(frame)
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), H2Error> {
        if tracing::enabled!(Level::DEBUG) {
            debug!("SEND\n{}", dump::frame(frame));
        }
        self.stream.write_all(&frame.encode())?;
        self.stream.flush()?;
        trace!(frame_type = %frame.frame_type, len = frame.length(), "frame written");
        Ok(())
    }
}

/// The header block fragment of a HEADERS frame, without the pad length,
/// priority fields and trailing padding.
fn header_fragment(frame: &Frame) -> Result<&[u8], H2Error> {
    let view = BufferView::new(&frame.payload);
    let mut start = 0;
    let mut pad = 0;
    if frame.has_flag(flags::PADDED) {
        pad = view.byte_at(0).map_err(|_| H2Error::InvalidPadding)? as usize;
        start = 1;
    }
    if frame.has_flag(flags::PRIORITY) {
        start += 5;
    }
    let end = frame
        .payload
        .len()
        .checked_sub(pad)
        .filter(|&end| end >= start)
        .ok_or(H2Error::InvalidPadding)?;
    Ok(&frame.payload[start..end])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
