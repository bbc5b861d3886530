use crate::frame::{ErrorCode, FrameError, FrameType};
use crate::hpack::HpackError;

/// Errors that abort an HTTP/2 exchange.
#[derive(Debug, thiserror::Error)]
pub enum H2Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Hpack(#[from] HpackError),
    #[error("expected a {expected} frame, received {received}")]
    UnexpectedFrame {
        expected: FrameType,
        received: FrameType,
    },
    #[error("padded DATA frames are not supported")]
    PaddedData,
    #[error("HEADERS frame padding exceeds its payload")]
    InvalidPadding,
    #[error("stream reset by peer: {0}")]
    StreamReset(ErrorCode),
    #[error("connection closed by peer (last stream {last_stream_id}): {error_code}")]
    GoAway {
        last_stream_id: u32,
        error_code: ErrorCode,
    },
    #[error("response has no :status pseudo-header")]
    MissingStatus,
    #[error("invalid :status value {0:?}")]
    InvalidStatus(String),
}
