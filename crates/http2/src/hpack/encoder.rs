//! Header block encoding.
//!
//! Every field is written as a Literal Header Field without Indexing with a
//! literal name (RFC 7541 §6.2.2), plain octets, no Huffman coding. The
//! encoder keeps no dynamic table.

use super::{Header, encode_integer, encode_string};

#[derive(Debug, Clone, Copy, Default)]
pub struct HpackEncoder;

impl HpackEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a header list into an HPACK block.
    pub fn encode(&self, headers: &[Header]) -> Vec<u8> {
        let capacity = headers
            .iter()
            .map(|h| h.name.len() + h.value.len() + 11)
            .sum();
        let mut block = Vec::with_capacity(capacity);
        for header in headers {
            encode_integer(0, 4, 0x00, &mut block);
            encode_string(&header.name, false, &mut block);
            encode_string(&header.value, false, &mut block);
        }
        block
    }
}
