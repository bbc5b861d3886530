//! # Common Foundation Crate
//!
//! Shared byte utilities for the HTTP client: a bounds-checked read view over
//! borrowed bytes, a big-endian writer, the 24-bit integer used by HTTP/2
//! frame lengths, and the hex dump printer used by the debug log.

#![forbid(unsafe_code)]

use core::fmt;
use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// U24: 24-bit unsigned integer
// ─────────────────────────────────────────────────────────────────────────────

/// A 24-bit unsigned integer stored as 3 bytes in big-endian order.
///
/// Used for HTTP/2 frame payload lengths.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct U24(pub [u8; 3]);

impl U24 {
    pub const ZERO: Self = Self([0, 0, 0]);
    pub const MAX: Self = Self([0xFF, 0xFF, 0xFF]);

    /// Create a `U24` from a `u32`, failing if the value needs more than 24 bits.
    #[inline]
    pub const fn new(x: u32) -> Option<Self> {
        if x > 0x00FF_FFFF {
            return None;
        }
        Some(U24([(x >> 16) as u8, (x >> 8) as u8, x as u8]))
    }

    /// Convert to a `u32`.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        ((self.0[0] as u32) << 16) | ((self.0[1] as u32) << 8) | (self.0[2] as u32)
    }
}

impl fmt::Debug for U24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U24({})", self.to_u32())
    }
}

impl fmt::Display for U24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u32())
    }
}

impl TryFrom<u32> for U24 {
    type Error = ParseError;

    #[inline]
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::new(v).ok_or(ParseError::Overflow)
    }
}

impl From<U24> for u32 {
    #[inline]
    fn from(v: U24) -> Self {
        v.to_u32()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParseError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while reading binary data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The requested range does not lie inside the buffer.
    #[error("range error: offset {offset} length {len} exceeds buffer of {size} bytes")]
    OutOfRange { offset: usize, len: usize, size: usize },
    /// Offset arithmetic or a value conversion overflowed.
    #[error("range error: arithmetic overflow")]
    Overflow,
}

// ─────────────────────────────────────────────────────────────────────────────
// BufferView: bounds-checked, non-owning read window
// ─────────────────────────────────────────────────────────────────────────────

/// A non-owning, bounds-checked view over a byte range.
///
/// Every accessor takes an absolute offset into the view and fails with
/// [`ParseError`] instead of panicking. All multi-byte reads are big-endian.
/// The view borrows its bytes, so the owner always outlives it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BufferView<'a> {
    buf: &'a [u8],
}

impl<'a> BufferView<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The viewed bytes.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    /// Returns `true` if `len` bytes starting at `offset` are inside the view.
    #[inline]
    pub fn test_range(&self, offset: usize, len: usize) -> bool {
        matches!(offset.checked_add(len), Some(end) if end <= self.buf.len())
    }

    /// Borrow `len` bytes starting at `offset`.
    #[inline]
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ParseError> {
        let end = offset.checked_add(len).ok_or(ParseError::Overflow)?;
        if end > self.buf.len() {
            return Err(ParseError::OutOfRange {
                offset,
                len,
                size: self.buf.len(),
            });
        }
        Ok(&self.buf[offset..end])
    }

    /// Read the octet at `offset`.
    #[inline]
    pub fn byte_at(&self, offset: usize) -> Result<u8, ParseError> {
        Ok(self.bytes(offset, 1)?[0])
    }

    /// Read a big-endian `u16` at `offset`.
    #[inline]
    pub fn u16_at(&self, offset: usize) -> Result<u16, ParseError> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian 24-bit integer at `offset`.
    #[inline]
    pub fn u24_at(&self, offset: usize) -> Result<U24, ParseError> {
        let b = self.bytes(offset, 3)?;
        Ok(U24([b[0], b[1], b[2]]))
    }

    /// Read a big-endian `u32` at `offset`.
    #[inline]
    pub fn u32_at(&self, offset: usize) -> Result<u32, ParseError> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// A narrower view of `len` bytes starting at `offset`.
    #[inline]
    pub fn subview(&self, offset: usize, len: usize) -> Result<BufferView<'a>, ParseError> {
        self.bytes(offset, len).map(BufferView::new)
    }
}

impl<'a> From<&'a [u8]> for BufferView<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self::new(buf)
    }
}

impl fmt::Debug for BufferView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView").field("len", &self.buf.len()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BufWriter: big-endian byte buffer writer
// ─────────────────────────────────────────────────────────────────────────────

/// A growable byte buffer writer using network byte order.
#[derive(Clone, Default)]
pub struct BufWriter {
    pub out: Vec<u8>,
}

impl BufWriter {
    #[inline]
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            out: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    #[inline]
    pub fn u8(&mut self, v: u8) {
        self.out.push(v);
    }

    #[inline]
    pub fn u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    #[inline]
    pub fn u24(&mut self, v: U24) {
        self.out.extend_from_slice(&v.0);
    }

    #[inline]
    pub fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    #[inline]
    pub fn bytes(&mut self, b: &[u8]) {
        self.out.extend_from_slice(b);
    }

    /// Consume the writer and return the underlying buffer.
    #[inline]
    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

impl fmt::Debug for BufWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufWriter").field("len", &self.out.len()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hex dump
// ─────────────────────────────────────────────────────────────────────────────

const DUMP_LINE_OCTETS: usize = 16;
const DUMP_HEX_COLUMN: usize = DUMP_LINE_OCTETS * 3 + 2;

/// Render `data` as a hex dump, 16 octets per line with an ASCII column.
///
/// When `max` is non-zero and the data is longer, output stops after `max`
/// bytes and the last line is marked `snipped...`.
pub fn hex_dump(data: &[u8], max: usize) -> String {
    let (shown, snipped) = if max != 0 && data.len() > max {
        (&data[..max], true)
    } else {
        (data, false)
    };

    let mut out = String::new();
    let mut lines = shown.chunks(DUMP_LINE_OCTETS).peekable();
    while let Some(line) = lines.next() {
        let mut octets = String::with_capacity(DUMP_HEX_COLUMN);
        let mut chars = String::with_capacity(DUMP_LINE_OCTETS);
        for &b in line {
            let _ = write!(octets, "{b:02x} ");
            chars.push(if (0x20..=0x7e).contains(&b) { b as char } else { '.' });
        }
        if snipped && lines.peek().is_none() {
            octets.push_str("snipped...");
        }
        let _ = writeln!(out, "{octets:<DUMP_HEX_COLUMN$}{chars}");
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── U24 ──

    #[test]
    fn test_u24_roundtrip() {
        assert_eq!(U24::new(0).unwrap().to_u32(), 0);
        assert_eq!(U24::new(300).unwrap().to_u32(), 300);
        assert_eq!(U24::new(0xFF_FFFF).unwrap(), U24::MAX);
    }

    #[test]
    fn test_u24_rejects_wide_values() {
        assert_eq!(U24::new(0x0100_0000), None);
        assert_eq!(U24::try_from(0x0100_0000u32), Err(ParseError::Overflow));
    }

    #[test]
    fn test_u24_debug_display() {
        let v = U24::new(42).unwrap();
        assert_eq!(format!("{v:?}"), "U24(42)");
        assert_eq!(format!("{v}"), "42");
    }

    // ── BufferView ──

    #[test]
    fn test_view_byte_at() {
        let data = [0xAB, 0xCD];
        let v = BufferView::new(&data);
        assert_eq!(v.byte_at(0).unwrap(), 0xAB);
        assert_eq!(v.byte_at(1).unwrap(), 0xCD);
        assert_eq!(
            v.byte_at(2),
            Err(ParseError::OutOfRange {
                offset: 2,
                len: 1,
                size: 2
            })
        );
    }

    #[test]
    fn test_view_big_endian_integers() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let v = BufferView::new(&data);
        assert_eq!(v.u16_at(0).unwrap(), 0x1234);
        assert_eq!(v.u16_at(3).unwrap(), 0x789A);
        assert_eq!(v.u24_at(1).unwrap().to_u32(), 0x34_5678);
        assert_eq!(v.u32_at(0).unwrap(), 0x1234_5678);
        assert_eq!(v.u32_at(1).unwrap(), 0x3456_789A);
    }

    #[test]
    fn test_view_integer_reads_past_end_fail() {
        let data = [0u8; 4];
        let v = BufferView::new(&data);
        assert!(v.u16_at(3).is_err());
        assert!(v.u32_at(1).is_err());
        assert!(v.u32_at(0).is_ok());
    }

    #[test]
    fn test_view_offset_overflow() {
        let data = [0u8; 4];
        let v = BufferView::new(&data);
        assert_eq!(v.u32_at(usize::MAX), Err(ParseError::Overflow));
        assert_eq!(v.subview(1, usize::MAX).unwrap_err(), ParseError::Overflow);
    }

    #[test]
    fn test_view_subview() {
        let data = [1, 2, 3, 4, 5];
        let v = BufferView::new(&data);
        let sub = v.subview(1, 3).unwrap();
        assert_eq!(sub.as_slice(), &[2, 3, 4]);
        assert_eq!(sub.byte_at(0).unwrap(), 2);
        assert!(sub.byte_at(3).is_err());
        // An empty subview at the very end is allowed.
        assert!(v.subview(5, 0).unwrap().is_empty());
        assert!(v.subview(4, 2).is_err());
    }

    #[test]
    fn test_view_test_range() {
        let data = [0u8; 3];
        let v = BufferView::new(&data);
        assert!(v.test_range(0, 3));
        assert!(v.test_range(2, 1));
        assert!(!v.test_range(3, 1));
        assert!(!v.test_range(usize::MAX, 2));
    }

    // ── BufWriter ──

    #[test]
    fn test_writer_network_order() {
        let mut w = BufWriter::new();
        w.u8(0x01);
        w.u16(0x0203);
        w.u24(U24::new(0x04_0506).unwrap());
        w.u32(0x0708_090A);
        w.bytes(b"ok");
        assert_eq!(w.len(), 12);
        assert_eq!(
            w.finish(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, b'o', b'k']
        );
    }

    // ── hex_dump ──

    #[test]
    fn test_hex_dump_single_line() {
        let out = hex_dump(b"PRI *", 0);
        assert!(out.starts_with("50 52 49 20 2a "));
        assert!(out.trim_end().ends_with("PRI *"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_hex_dump_non_printable() {
        let out = hex_dump(&[0x00, 0x41, 0xff], 0);
        assert!(out.trim_end().ends_with(".A."));
    }

    #[test]
    fn test_hex_dump_wraps_and_snips() {
        let data: Vec<u8> = (0..40).collect();
        assert_eq!(hex_dump(&data, 0).lines().count(), 3);

        let out = hex_dump(&data, 20);
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().nth(1).unwrap().contains("snipped..."));
        assert!(!out.lines().next().unwrap().contains("snipped..."));
    }

    #[test]
    fn test_hex_dump_empty() {
        assert_eq!(hex_dump(&[], 0), "");
    }
}
