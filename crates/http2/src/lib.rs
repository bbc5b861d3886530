//! # HTTP/2 Protocol (RFC 7540, RFC 7541)
//!
//! HTTP/2 binary framing, HPACK header compression and a single-stream client
//! session driver that runs one GET exchange over any blocking byte stream.

pub mod dump;
pub mod error;
pub mod frame;
pub mod hpack;
pub mod session;

pub use error::H2Error;
pub use session::{Request, Response, Session, SessionConfig, get};
