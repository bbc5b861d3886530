//! HTTP/2 Framing Layer (RFC 7540 §4)
//!
//! Parses and builds HTTP/2 binary frames. Each frame has a 9-byte header:
//! ```text
//! Length (24)  Type (8)  Flags (8)  Reserved (1)  Stream Identifier (31)
//! ```

#![forbid(unsafe_code)]

use core::fmt;

use common::{BufWriter, BufferView, ParseError, U24};

// ─────────────────────────────────────────────────────────────────────────────
// Frame types
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP/2 frame types. Extension types are carried as `Unknown` so the
/// session can skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl FrameType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Data,
            1 => Self::Headers,
            2 => Self::Priority,
            3 => Self::RstStream,
            4 => Self::Settings,
            5 => Self::PushPromise,
            6 => Self::Ping,
            7 => Self::GoAway,
            8 => Self::WindowUpdate,
            9 => Self::Continuation,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Data => 0,
            Self::Headers => 1,
            Self::Priority => 2,
            Self::RstStream => 3,
            Self::Settings => 4,
            Self::PushPromise => 5,
            Self::Ping => 6,
            Self::GoAway => 7,
            Self::WindowUpdate => 8,
            Self::Continuation => 9,
            Self::Unknown(v) => v,
        }
    }

    /// Wire name, as used in RFC 7540.
    pub fn name(self) -> &'static str {
        match self {
            Self::Data => "DATA",
            Self::Headers => "HEADERS",
            Self::Priority => "PRIORITY",
            Self::RstStream => "RST_STREAM",
            Self::Settings => "SETTINGS",
            Self::PushPromise => "PUSH_PROMISE",
            Self::Ping => "PING",
            Self::GoAway => "GOAWAY",
            Self::WindowUpdate => "WINDOW_UPDATE",
            Self::Continuation => "CONTINUATION",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "UNKNOWN(0x{v:02x})"),
            known => f.write_str(known.name()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame flags
// ─────────────────────────────────────────────────────────────────────────────

/// Well-known frame flag bits.
pub mod flags {
    /// DATA / HEADERS: end of stream.
    pub const END_STREAM: u8 = 0x01;
    /// HEADERS / CONTINUATION: end of header block.
    pub const END_HEADERS: u8 = 0x04;
    /// DATA / HEADERS: payload is padded.
    pub const PADDED: u8 = 0x08;
    /// HEADERS: priority information present.
    pub const PRIORITY: u8 = 0x20;
    /// SETTINGS / PING: acknowledgement.
    pub const ACK: u8 = 0x01;
}

// ─────────────────────────────────────────────────────────────────────────────
// Error codes (RFC 7540 §7)
// ─────────────────────────────────────────────────────────────────────────────

/// An HTTP/2 error code as carried by RST_STREAM and GOAWAY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const NO_ERROR: Self = Self(0x0);
    pub const PROTOCOL_ERROR: Self = Self(0x1);
    pub const INTERNAL_ERROR: Self = Self(0x2);
    pub const FLOW_CONTROL_ERROR: Self = Self(0x3);
    pub const SETTINGS_TIMEOUT: Self = Self(0x4);
    pub const STREAM_CLOSED: Self = Self(0x5);
    pub const FRAME_SIZE_ERROR: Self = Self(0x6);
    pub const REFUSED_STREAM: Self = Self(0x7);
    pub const CANCEL: Self = Self(0x8);
    pub const COMPRESSION_ERROR: Self = Self(0x9);
    pub const CONNECT_ERROR: Self = Self(0xa);
    pub const ENHANCE_YOUR_CALM: Self = Self(0xb);
    pub const INADEQUATE_SECURITY: Self = Self(0xc);
    pub const HTTP_1_1_REQUIRED: Self = Self(0xd);

    pub fn name(self) -> &'static str {
        match self.0 {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings identifiers (RFC 7540 §6.5.2)
// ─────────────────────────────────────────────────────────────────────────────

pub const SETTINGS_HEADER_TABLE_SIZE: u16 = 0x1;
pub const SETTINGS_ENABLE_PUSH: u16 = 0x2;
pub const SETTINGS_MAX_CONCURRENT_STREAMS: u16 = 0x3;
pub const SETTINGS_INITIAL_WINDOW_SIZE: u16 = 0x4;
pub const SETTINGS_MAX_FRAME_SIZE: u16 = 0x5;
pub const SETTINGS_MAX_HEADER_LIST_SIZE: u16 = 0x6;

/// Name of a settings identifier, if it is one RFC 7540 defines.
pub fn settings_name(id: u16) -> Option<&'static str> {
    match id {
        SETTINGS_HEADER_TABLE_SIZE => Some("SETTINGS_HEADER_TABLE_SIZE"),
        SETTINGS_ENABLE_PUSH => Some("SETTINGS_ENABLE_PUSH"),
        SETTINGS_MAX_CONCURRENT_STREAMS => Some("SETTINGS_MAX_CONCURRENT_STREAMS"),
        SETTINGS_INITIAL_WINDOW_SIZE => Some("SETTINGS_INITIAL_WINDOW_SIZE"),
        SETTINGS_MAX_FRAME_SIZE => Some("SETTINGS_MAX_FRAME_SIZE"),
        SETTINGS_MAX_HEADER_LIST_SIZE => Some("SETTINGS_MAX_HEADER_LIST_SIZE"),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP/2 frame header size.
pub const FRAME_HEADER_SIZE: usize = 9;

/// Maximum frame payload size (default, before SETTINGS negotiation).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16384;

/// Largest stream identifier (31 bits).
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// Largest WINDOW_UPDATE increment (31 bits).
pub const MAX_WINDOW_INCREMENT: u32 = 0x7FFF_FFFF;

/// The HTTP/2 connection preface string.
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Frame errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload of {0} bytes exceeds 24-bit length")]
    LengthTooLarge(usize),
    #[error("stream id {0} exceeds 31 bits")]
    StreamIdTooLarge(u32),
    #[error("window increment {0} exceeds 31 bits")]
    IncrementTooLarge(u32),
    #[error("incomplete frame")]
    Incomplete,
    #[error("SETTINGS payload length {0} is not a multiple of 6")]
    InvalidSettings(usize),
    #[error("malformed frame payload: {0}")]
    Buffer(#[from] ParseError),
}

/// Decoded 9-byte frame header. `frame_type` is the raw octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: U24,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    /// Parse the first 9 bytes of `data`. The reserved bit is masked off.
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let view = BufferView::new(data);
        if !view.test_range(0, FRAME_HEADER_SIZE) {
            return Err(FrameError::Incomplete);
        }
        Ok(Self {
            length: view.u24_at(0)?,
            frame_type: view.byte_at(3)?,
            flags: view.byte_at(4)?,
            stream_id: view.u32_at(5)? & MAX_STREAM_ID,
        })
    }

    pub fn payload_len(&self) -> usize {
        self.length.to_u32() as usize
    }
}

/// An HTTP/2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type.
    pub frame_type: FrameType,
    /// Flags byte.
    pub flags: u8,
    /// Stream identifier (31 bits).
    pub stream_id: u32,
    /// Frame payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame, checking the length and stream id fit their fields.
    pub fn new(
        frame_type: FrameType,
        flags: u8,
        stream_id: u32,
        payload: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if payload.len() > U24::MAX.to_u32() as usize {
            return Err(FrameError::LengthTooLarge(payload.len()));
        }
        if stream_id > MAX_STREAM_ID {
            return Err(FrameError::StreamIdTooLarge(stream_id));
        }
        Ok(Self {
            frame_type,
            flags,
            stream_id,
            payload,
        })
    }

    /// Connection-level frame with a small fixed payload.
    fn control(frame_type: FrameType, flags: u8, payload: Vec<u8>) -> Self {
        Self {
            frame_type,
            flags,
            stream_id: 0,
            payload,
        }
    }

    /// Payload length as carried in the header.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Check if a flag bit is set.
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// The 9 header octets.
    pub fn header_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let len = self.payload.len() as u32;
        let sid = (self.stream_id & MAX_STREAM_ID).to_be_bytes();
        [
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
            self.frame_type.to_u8(),
            self.flags,
            sid[0],
            sid[1],
            sid[2],
            sid[3],
        ]
    }

    /// Build the wire bytes for this frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = BufWriter::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        w.bytes(&self.header_bytes());
        w.bytes(&self.payload);
        w.finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parse
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a single HTTP/2 frame from the given data.
///
/// Returns `Ok((frame, consumed_bytes))` or `Err`.
pub fn parse_frame(data: &[u8]) -> Result<(Frame, usize), FrameError> {
    let header = FrameHeader::parse(data)?;
    let total = FRAME_HEADER_SIZE + header.payload_len();
    if data.len() < total {
        return Err(FrameError::Incomplete);
    }
    let frame = frame_from_parts(header, data[FRAME_HEADER_SIZE..total].to_vec());
    Ok((frame, total))
}

/// Combine a parsed header with its payload.
pub fn frame_from_parts(header: FrameHeader, payload: Vec<u8>) -> Frame {
    Frame {
        frame_type: FrameType::from_u8(header.frame_type),
        flags: header.flags,
        stream_id: header.stream_id,
        payload,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Convenience frame builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build a SETTINGS frame.
pub fn build_settings(settings: &[(u16, u32)]) -> Frame {
    let mut w = BufWriter::with_capacity(settings.len() * 6);
    for &(id, val) in settings {
        w.u16(id);
        w.u32(val);
    }
    Frame::control(FrameType::Settings, 0, w.finish())
}

/// Build a SETTINGS ACK frame.
pub fn build_settings_ack() -> Frame {
    Frame::control(FrameType::Settings, flags::ACK, Vec::new())
}

/// Build a WINDOW_UPDATE frame.
pub fn build_window_update(stream_id: u32, increment: u32) -> Result<Frame, FrameError> {
    if increment > MAX_WINDOW_INCREMENT {
        return Err(FrameError::IncrementTooLarge(increment));
    }
    Frame::new(
        FrameType::WindowUpdate,
        0,
        stream_id,
        increment.to_be_bytes().to_vec(),
    )
}

/// Build a GOAWAY frame.
pub fn build_goaway(last_stream_id: u32, error_code: ErrorCode) -> Result<Frame, FrameError> {
    if last_stream_id > MAX_STREAM_ID {
        return Err(FrameError::StreamIdTooLarge(last_stream_id));
    }
    let mut w = BufWriter::with_capacity(8);
    w.u32(last_stream_id);
    w.u32(error_code.0);
    Ok(Frame::control(FrameType::GoAway, 0, w.finish()))
}

/// Build a HEADERS frame (payload should be HPACK-encoded header block).
pub fn build_headers(
    stream_id: u32,
    header_block: Vec<u8>,
    end_stream: bool,
    end_headers: bool,
) -> Result<Frame, FrameError> {
    let mut f = 0u8;
    if end_stream {
        f |= flags::END_STREAM;
    }
    if end_headers {
        f |= flags::END_HEADERS;
    }
    Frame::new(FrameType::Headers, f, stream_id, header_block)
}

/// Build a CONTINUATION frame.
pub fn build_continuation(
    stream_id: u32,
    fragment: Vec<u8>,
    end_headers: bool,
) -> Result<Frame, FrameError> {
    let f = if end_headers { flags::END_HEADERS } else { 0 };
    Frame::new(FrameType::Continuation, f, stream_id, fragment)
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload parsers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a SETTINGS frame payload into (identifier, value) pairs.
pub fn parse_settings(payload: &[u8]) -> Result<Vec<(u16, u32)>, FrameError> {
    if payload.len() % 6 != 0 {
        return Err(FrameError::InvalidSettings(payload.len()));
    }
    let view = BufferView::new(payload);
    (0..payload.len())
        .step_by(6)
        .map(|off| -> Result<(u16, u32), FrameError> {
            Ok((view.u16_at(off)?, view.u32_at(off + 2)?))
        })
        .collect()
}

/// Parse the error code of a RST_STREAM payload.
pub fn parse_rst_stream(payload: &[u8]) -> Result<ErrorCode, FrameError> {
    Ok(ErrorCode(BufferView::new(payload).u32_at(0)?))
}

/// Parse a GOAWAY payload into (last stream id, error code).
pub fn parse_goaway(payload: &[u8]) -> Result<(u32, ErrorCode), FrameError> {
    let view = BufferView::new(payload);
    Ok((view.u32_at(0)? & MAX_STREAM_ID, ErrorCode(view.u32_at(4)?)))
}

/// Parse a WINDOW_UPDATE payload into its increment.
pub fn parse_window_update(payload: &[u8]) -> Result<u32, FrameError> {
    Ok(BufferView::new(payload).u32_at(0)? & MAX_WINDOW_INCREMENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
