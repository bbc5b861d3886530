//! HPACK Header Compression (RFC 7541)
//!
//! Implements the HPACK codec used by the HTTP/2 session:
//! - Prefix integer and string literal representations (§5.1, §5.2)
//! - Huffman coding over the canonical Appendix B code
//! - Static table (61 entries) and a size-bounded dynamic table
//! - Header block decoding and literal-only encoding

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod table;

use core::fmt;
use std::borrow::Cow;

use common::{BufferView, ParseError};

pub use decoder::{DecodingContext, HpackDecoder};
pub use encoder::HpackEncoder;
pub use huffman::HuffmanError;
pub use table::{DynamicTable, STATIC_TABLE, static_table_at, table_at};

/// Overhead per dynamic table entry (RFC 7541 §4.1): 32 bytes.
pub const ENTRY_OVERHEAD: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Header
// ─────────────────────────────────────────────────────────────────────────────

/// A single header field. Names and values are kept as raw octets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl Header {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Entry cost in the dynamic table: name + value + 32.
    pub fn size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }

    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name_str(), self.value_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while decoding a header block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    #[error("hpack: {0}")]
    Buffer(#[from] ParseError),
    #[error("hpack: {0}")]
    Huffman(#[from] HuffmanError),
    #[error("hpack: unknown representation (leading octet {0:#04x})")]
    UnknownRepresentation(u8),
    #[error("hpack: index {0} not found in header table")]
    IndexNotFound(usize),
    #[error("hpack: integer overflow")]
    IntegerOverflow,
}

// ─────────────────────────────────────────────────────────────────────────────
// Integer coding (RFC 7541 §5.1)
// ─────────────────────────────────────────────────────────────────────────────

/// Decode an integer with an `prefix_bits`-bit prefix starting at `offset`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_integer(
    view: &BufferView<'_>,
    offset: usize,
    prefix_bits: u8,
) -> Result<(usize, usize), HpackError> {
    debug_assert!((1..=8).contains(&prefix_bits));
    let mask = ((1u16 << prefix_bits) - 1) as usize;
    let mut value = (view.byte_at(offset)? as usize) & mask;
    if value < mask {
        return Ok((value, 1));
    }

    let mut shift: u32 = 0;
    let mut len = 1;
    loop {
        let pos = offset.checked_add(len).ok_or(ParseError::Overflow)?;
        let b = view.byte_at(pos)?;
        len += 1;

        let chunk = ((b & 0x7F) as usize)
            .checked_shl(shift)
            .filter(|c| c >> shift == (b & 0x7F) as usize)
            .ok_or(HpackError::IntegerOverflow)?;
        value = value.checked_add(chunk).ok_or(HpackError::IntegerOverflow)?;
        shift += 7;

        if b & 0x80 == 0 {
            return Ok((value, len));
        }
    }
}

/// Encode an integer with an `prefix_bits`-bit prefix.
///
/// `prefix_byte` carries the representation bits above the prefix.
pub fn encode_integer(value: usize, prefix_bits: u8, prefix_byte: u8, out: &mut Vec<u8>) {
    debug_assert!((1..=8).contains(&prefix_bits));
    let mask = ((1u16 << prefix_bits) - 1) as usize;

    if value < mask {
        out.push(prefix_byte | value as u8);
        return;
    }

    out.push(prefix_byte | mask as u8);
    let mut remaining = value - mask;
    while remaining >= 0x80 {
        out.push((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }
    out.push(remaining as u8);
}

// ─────────────────────────────────────────────────────────────────────────────
// String literal coding (RFC 7541 §5.2)
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a string literal starting at `offset`.
///
/// Returns `(octets, bytes_consumed)`.
pub fn decode_string(view: &BufferView<'_>, offset: usize) -> Result<(Vec<u8>, usize), HpackError> {
    let huffman = view.byte_at(offset)? & 0x80 != 0;
    let (length, consumed) = decode_integer(view, offset, 7)?;
    let start = offset.checked_add(consumed).ok_or(ParseError::Overflow)?;
    let raw = view.bytes(start, length)?;

    let value = if huffman {
        huffman::decode(raw)?
    } else {
        raw.to_vec()
    };
    Ok((value, consumed + length))
}

/// Encode a string literal, Huffman-coding it when `huffman` is set.
pub fn encode_string(s: &[u8], huffman: bool, out: &mut Vec<u8>) {
    if huffman {
        let encoded = huffman::encode(s);
        encode_integer(encoded.len(), 7, 0x80, out);
        out.extend_from_slice(&encoded);
    } else {
        encode_integer(s.len(), 7, 0x00, out);
        out.extend_from_slice(s);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_int(data: &[u8], prefix: u8) -> Result<(usize, usize), HpackError> {
        decode_integer(&BufferView::new(data), 0, prefix)
    }

    fn encode_int(value: usize, prefix: u8) -> Vec<u8> {
        let mut out = Vec::new();
        encode_integer(value, prefix, 0x00, &mut out);
        out
    }

    #[test]
    fn test_decode_integer_small() {
        // 5-bit prefix, value = 10 (fits in prefix)
        assert_eq!(decode_int(&[10], 5).unwrap(), (10, 1));
    }

    #[test]
    fn test_decode_integer_ignores_high_bits() {
        // Representation bits above the prefix are not part of the value.
        assert_eq!(decode_int(&[0xEA], 5).unwrap(), (10, 1));
    }

    #[test]
    fn test_decode_integer_multi_byte() {
        // RFC 7541 C.1.2: 1337 with a 5-bit prefix.
        assert_eq!(decode_int(&[0x1F, 0x9A, 0x0A], 5).unwrap(), (1337, 3));
    }

    #[test]
    fn test_decode_integer_at_offset() {
        let data = [0xFF, 0xFF, 0x1F, 0x9A, 0x0A];
        let view = BufferView::new(&data);
        assert_eq!(decode_integer(&view, 2, 5).unwrap(), (1337, 3));
    }

    #[test]
    fn test_decode_integer_truncated() {
        assert!(matches!(
            decode_int(&[0x1F, 0x9A], 5),
            Err(HpackError::Buffer(_))
        ));
        assert!(matches!(decode_int(&[], 5), Err(HpackError::Buffer(_))));
    }

    #[test]
    fn test_decode_integer_overflow() {
        let mut data = vec![0x7F];
        data.extend(std::iter::repeat_n(0xFF, 12));
        data.push(0x01);
        assert_eq!(decode_int(&data, 7), Err(HpackError::IntegerOverflow));
    }

    #[test]
    fn test_encode_integer_small() {
        assert_eq!(encode_int(10, 5), vec![10]);
    }

    #[test]
    fn test_encode_integer_large() {
        assert_eq!(encode_int(1337, 5), vec![0x1F, 0x9A, 0x0A]);
    }

    #[test]
    fn test_encode_integer_prefix_boundary() {
        // A value equal to the mask needs a trailing zero octet.
        assert_eq!(encode_int(31, 5), vec![0x1F, 0x00]);
        assert_eq!(encode_int(30, 5), vec![0x1E]);
    }

    #[test]
    fn test_encode_integer_keeps_prefix_byte() {
        let mut out = Vec::new();
        encode_integer(2, 7, 0x80, &mut out);
        assert_eq!(out, vec![0x82]);
    }

    proptest! {
        #[test]
        fn test_integer_roundtrip(value in 0usize..(1 << 24), prefix in 1u8..=8) {
            let encoded = encode_int(value, prefix);
            let (decoded, consumed) = decode_int(&encoded, prefix).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn test_decode_string_plain() {
        let mut data = vec![0x03];
        data.extend_from_slice(b"fooXX");
        let (s, consumed) = decode_string(&BufferView::new(&data), 0).unwrap();
        assert_eq!(s, b"foo");
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_decode_string_huffman() {
        // RFC 7541 C.4.1: "www.example.com"
        let data = [
            0x8C, 0xF1, 0xE3, 0xC2, 0xE5, 0xF2, 0x3A, 0x6B, 0xA0, 0xAB, 0x90, 0xF4, 0xFF,
        ];
        let (s, consumed) = decode_string(&BufferView::new(&data), 0).unwrap();
        assert_eq!(s, b"www.example.com");
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_decode_string_truncated() {
        let data = [0x05, b'a', b'b'];
        assert!(matches!(
            decode_string(&BufferView::new(&data), 0),
            Err(HpackError::Buffer(_))
        ));
    }

    #[test]
    fn test_encode_string_forms() {
        let mut plain = Vec::new();
        encode_string(b"custom-key", false, &mut plain);
        assert_eq!(plain[0], 10);
        assert_eq!(&plain[1..], b"custom-key");

        let mut huff = Vec::new();
        encode_string(b"custom-key", true, &mut huff);
        assert_eq!(huff[0] & 0x80, 0x80);
        let (s, consumed) = decode_string(&BufferView::new(&huff), 0).unwrap();
        assert_eq!(s, b"custom-key");
        assert_eq!(consumed, huff.len());
    }

    #[test]
    fn test_header_size_and_display() {
        let h = Header::new("content-type", "text/html");
        assert_eq!(h.size(), 12 + 9 + 32);
        assert_eq!(h.to_string(), "content-type: text/html");
    }
}
