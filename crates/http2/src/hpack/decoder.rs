//! Header block decoding (RFC 7541 §6).

use common::BufferView;
use tracing::trace;

use super::table::{DynamicTable, table_at};
use super::{Header, HpackError, decode_integer, decode_string};

/// Decoder state that outlives a single header block: the dynamic table.
///
/// One context serves one connection's exchange.
#[derive(Debug, Clone, Default)]
pub struct DecodingContext {
    pub dynamic_table: DynamicTable,
}

impl DecodingContext {
    pub fn new(max_table_size: usize) -> Self {
        Self {
            dynamic_table: DynamicTable::new(max_table_size),
        }
    }

    /// Decode a complete header block into an ordered header list.
    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<Header>, HpackError> {
        HpackDecoder::new(block).decode(self)
    }
}

/// Cursor over one header block.
#[derive(Debug)]
pub struct HpackDecoder<'a> {
    view: BufferView<'a>,
    offset: usize,
}

impl<'a> HpackDecoder<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            view: BufferView::new(block),
            offset: 0,
        }
    }

    /// Consume representations until the block is exhausted.
    ///
    /// Any malformed representation aborts the whole block.
    pub fn decode(mut self, ctx: &mut DecodingContext) -> Result<Vec<Header>, HpackError> {
        let mut headers = Vec::new();
        while self.offset < self.view.len() {
            if let Some(header) = self.next_representation(ctx)? {
                headers.push(header);
            }
        }
        Ok(headers)
    }

    fn next_representation(
        &mut self,
        ctx: &mut DecodingContext,
    ) -> Result<Option<Header>, HpackError> {
        let octet = self.view.byte_at(self.offset)?;

        if octet & 0x80 == 0x80 {
            // §6.1: Indexed Header Field
            let index = self.integer(7)?;
            let header =
                table_at(&ctx.dynamic_table, index).ok_or(HpackError::IndexNotFound(index))?;
            trace!(index, %header, "indexed");
            Ok(Some(header))
        } else if octet & 0xC0 == 0x40 {
            // §6.2.1: Literal Header Field with Incremental Indexing
            let header = self.literal(ctx, 6)?;
            trace!(%header, "literal, incremental indexing");
            ctx.dynamic_table.add(header.clone());
            Ok(Some(header))
        } else if octet & 0xF0 == 0x00 {
            // §6.2.2: Literal Header Field without Indexing
            let header = self.literal(ctx, 4)?;
            trace!(%header, "literal, without indexing");
            Ok(Some(header))
        } else if octet & 0xF0 == 0x10 {
            // §6.2.3: Literal Header Field Never Indexed
            let header = self.literal(ctx, 4)?;
            trace!(%header, "literal, never indexed");
            Ok(Some(header))
        } else if octet & 0xE0 == 0x20 {
            // §6.3: Dynamic Table Size Update
            let size = self.integer(5)?;
            trace!(size, "dynamic table size update");
            ctx.dynamic_table.set_maximum_table_size(size);
            Ok(None)
        } else {
            Err(HpackError::UnknownRepresentation(octet))
        }
    }

    /// Literal representation: name by index (or literal when the index is 0),
    /// then a literal value.
    fn literal(&mut self, ctx: &DecodingContext, prefix_bits: u8) -> Result<Header, HpackError> {
        let index = self.integer(prefix_bits)?;
        let name = if index == 0 {
            self.string()?
        } else {
            table_at(&ctx.dynamic_table, index)
                .ok_or(HpackError::IndexNotFound(index))?
                .name
        };
        let value = self.string()?;
        Ok(Header { name, value })
    }

    fn integer(&mut self, prefix_bits: u8) -> Result<usize, HpackError> {
        let (value, len) = decode_integer(&self.view, self.offset, prefix_bits)?;
        self.offset += len;
        Ok(value)
    }

    fn string(&mut self) -> Result<Vec<u8>, HpackError> {
        let (value, len) = decode_string(&self.view, self.offset)?;
        self.offset += len;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpack::HuffmanError;

    fn headers(pairs: &[(&str, &str)]) -> Vec<Header> {
        pairs.iter().map(|&(n, v)| Header::new(n, v)).collect()
    }

    #[test]
    fn test_decode_indexed_static() {
        let mut ctx = DecodingContext::default();
        let decoded = ctx.decode(&[0x82, 0x86]).unwrap();
        assert_eq!(decoded, headers(&[(":method", "GET"), (":scheme", "http")]));
        assert!(ctx.dynamic_table.is_empty());
    }

    #[test]
    fn test_decode_empty_block() {
        let mut ctx = DecodingContext::default();
        assert!(ctx.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_index_zero_is_error() {
        let mut ctx = DecodingContext::default();
        assert_eq!(ctx.decode(&[0x80]), Err(HpackError::IndexNotFound(0)));
    }

    #[test]
    fn test_decode_index_past_dynamic_table() {
        let mut ctx = DecodingContext::default();
        // 0xBE = indexed 62 on an empty dynamic table
        assert_eq!(ctx.decode(&[0xBE]), Err(HpackError::IndexNotFound(62)));
    }

    #[test]
    fn test_decode_literal_incremental_new_name() {
        // RFC 7541 C.2.1
        let mut block = vec![0x40, 0x0A];
        block.extend_from_slice(b"custom-key");
        block.push(0x0D);
        block.extend_from_slice(b"custom-header");

        let mut ctx = DecodingContext::default();
        let decoded = ctx.decode(&block).unwrap();
        assert_eq!(decoded, headers(&[("custom-key", "custom-header")]));
        assert_eq!(ctx.dynamic_table.size(), 1);
        assert_eq!(ctx.dynamic_table.table_size(), 55);
    }

    #[test]
    fn test_decode_literal_without_indexing_indexed_name() {
        // RFC 7541 C.2.2: :path /sample/path
        let mut block = vec![0x04, 0x0C];
        block.extend_from_slice(b"/sample/path");

        let mut ctx = DecodingContext::default();
        let decoded = ctx.decode(&block).unwrap();
        assert_eq!(decoded, headers(&[(":path", "/sample/path")]));
        assert!(ctx.dynamic_table.is_empty());
    }

    #[test]
    fn test_decode_literal_never_indexed() {
        // RFC 7541 C.2.3
        let mut block = vec![0x10, 0x08];
        block.extend_from_slice(b"password");
        block.push(0x06);
        block.extend_from_slice(b"secret");

        let mut ctx = DecodingContext::default();
        let decoded = ctx.decode(&block).unwrap();
        assert_eq!(decoded, headers(&[("password", "secret")]));
        assert!(ctx.dynamic_table.is_empty());
    }

    #[test]
    fn test_decode_table_size_update() {
        let mut ctx = DecodingContext::default();
        ctx.dynamic_table.add(Header::new("a", "b"));
        // 0x20 = size update to 0, then :method GET
        let decoded = ctx.decode(&[0x20, 0x82]).unwrap();
        assert_eq!(decoded, headers(&[(":method", "GET")]));
        assert_eq!(ctx.dynamic_table.maximum_table_size(), 0);
        assert!(ctx.dynamic_table.is_empty());
    }

    #[test]
    fn test_decode_requests_share_dynamic_table() {
        // RFC 7541 C.4.1 then C.4.2 (Huffman-coded requests)
        let first = [
            0x82, 0x86, 0x84, 0x41, 0x8C, 0xF1, 0xE3, 0xC2, 0xE5, 0xF2, 0x3A, 0x6B, 0xA0, 0xAB,
            0x90, 0xF4, 0xFF,
        ];
        let second = [0x82, 0x86, 0x84, 0xBE, 0x58, 0x86, 0xA8, 0xEB, 0x10, 0x64, 0x9C, 0xBF];

        let mut ctx = DecodingContext::default();
        let decoded = ctx.decode(&first).unwrap();
        assert_eq!(
            decoded,
            headers(&[
                (":method", "GET"),
                (":scheme", "http"),
                (":path", "/"),
                (":authority", "www.example.com"),
            ])
        );
        assert_eq!(ctx.dynamic_table.table_size(), 57);

        let decoded = ctx.decode(&second).unwrap();
        assert_eq!(decoded[3], Header::new(":authority", "www.example.com"));
        assert_eq!(decoded[4], Header::new("cache-control", "no-cache"));
        assert_eq!(ctx.dynamic_table.size(), 2);
        assert_eq!(ctx.dynamic_table.table_size(), 110);
        assert_eq!(
            ctx.dynamic_table.at(0),
            Some(&Header::new("cache-control", "no-cache"))
        );
    }

    #[test]
    fn test_decode_truncated_literal() {
        let mut ctx = DecodingContext::default();
        let block = [0x40, 0x0A, b'c', b'u'];
        assert!(matches!(ctx.decode(&block), Err(HpackError::Buffer(_))));
    }

    #[test]
    fn test_decode_bad_huffman() {
        let mut ctx = DecodingContext::default();
        // :path with a one-octet Huffman value of 0x00 (bad padding)
        let block = [0x04, 0x81, 0x00];
        assert_eq!(
            ctx.decode(&block),
            Err(HpackError::Huffman(HuffmanError::InvalidPadding))
        );
    }
}
