//! HPACK static and dynamic tables (RFC 7541 §2.3, §4).
//!
//! Both tables share one index space: 0 is invalid, 1–61 address the static
//! table and 62 onward address the dynamic table, newest entry first.

use core::fmt;
use std::collections::VecDeque;

use super::Header;

/// Default maximum dynamic table size in octets.
pub const DEFAULT_MAX_TABLE_SIZE: usize = 4096;

// ─────────────────────────────────────────────────────────────────────────────
// Static table (RFC 7541 Appendix A)
// ─────────────────────────────────────────────────────────────────────────────

/// HPACK static table entries (index 1–61).
pub const STATIC_TABLE: &[(&[u8], &[u8])] = &[
    (b":authority", b""),                    // 1
    (b":method", b"GET"),                    // 2
    (b":method", b"POST"),                   // 3
    (b":path", b"/"),                        // 4
    (b":path", b"/index.html"),              // 5
    (b":scheme", b"http"),                   // 6
    (b":scheme", b"https"),                  // 7
    (b":status", b"200"),                    // 8
    (b":status", b"204"),                    // 9
    (b":status", b"206"),                    // 10
    (b":status", b"304"),                    // 11
    (b":status", b"400"),                    // 12
    (b":status", b"404"),                    // 13
    (b":status", b"500"),                    // 14
    (b"accept-charset", b""),                // 15
    (b"accept-encoding", b"gzip, deflate"), // 16
    (b"accept-language", b""),               // 17
    (b"accept-ranges", b""),                 // 18
    (b"accept", b""),                        // 19
    (b"access-control-allow-origin", b""),   // 20
    (b"age", b""),                           // 21
    (b"allow", b""),                         // 22
    (b"authorization", b""),                 // 23
    (b"cache-control", b""),                 // 24
    (b"content-disposition", b""),            // 25
    (b"content-encoding", b""),              // 26
    (b"content-language", b""),              // 27
    (b"content-length", b""),                // 28
    (b"content-location", b""),              // 29
    (b"content-range", b""),                 // 30
    (b"content-type", b""),                  // 31
    (b"cookie", b""),                        // 32
    (b"date", b""),                          // 33
    (b"etag", b""),                          // 34
    (b"expect", b""),                        // 35
    (b"expires", b""),                       // 36
    (b"from", b""),                          // 37
    (b"host", b""),                          // 38
    (b"if-match", b""),                      // 39
    (b"if-modified-since", b""),             // 40
    (b"if-none-match", b""),                 // 41
    (b"if-range", b""),                      // 42
    (b"if-unmodified-since", b""),           // 43
    (b"last-modified", b""),                 // 44
    (b"link", b""),                          // 45
    (b"location", b""),                      // 46
    (b"max-forwards", b""),                  // 47
    (b"proxy-authenticate", b""),            // 48
    (b"proxy-authorization", b""),           // 49
    (b"range", b""),                         // 50
    (b"referer", b""),                       // 51
    (b"refresh", b""),                       // 52
    (b"retry-after", b""),                   // 53
    (b"server", b""),                        // 54
    (b"set-cookie", b""),                    // 55
    (b"strict-transport-security", b""),     // 56
    (b"transfer-encoding", b""),             // 57
    (b"user-agent", b""),                    // 58
    (b"vary", b""),                          // 59
    (b"via", b""),                           // 60
    (b"www-authenticate", b""),              // 61
];

/// Look up a static table entry by its 1-based index.
pub fn static_table_at(index: usize) -> Option<Header> {
    let i = index.checked_sub(1)?;
    STATIC_TABLE
        .get(i)
        .map(|&(name, value)| Header::new(name, value))
}

/// Resolve an index in the combined static + dynamic index space.
pub fn table_at(dynamic: &DynamicTable, index: usize) -> Option<Header> {
    if index <= STATIC_TABLE.len() {
        return static_table_at(index);
    }
    dynamic.at(index - STATIC_TABLE.len() - 1).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic table
// ─────────────────────────────────────────────────────────────────────────────

/// HPACK dynamic table.
///
/// Entries are kept newest first. `table_size` is the running sum of entry
/// costs and is maintained incrementally on every add and eviction.
#[derive(Debug, Clone)]
pub struct DynamicTable {
    entries: VecDeque<Header>,
    table_size: usize,
    maximum_table_size: usize,
}

impl Default for DynamicTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABLE_SIZE)
    }
}

impl DynamicTable {
    pub fn new(maximum_table_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            table_size: 0,
            maximum_table_size,
        }
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current size in octets.
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn maximum_table_size(&self) -> usize {
        self.maximum_table_size
    }

    /// Update the maximum table size, evicting as needed.
    pub fn set_maximum_table_size(&mut self, size: usize) {
        self.maximum_table_size = size;
        self.evict();
    }

    /// Get an entry (0 is the newest entry).
    pub fn at(&self, index: usize) -> Option<&Header> {
        self.entries.get(index)
    }

    /// Add a new entry, then evict from the oldest end while over the maximum.
    ///
    /// An entry larger than the maximum empties the table.
    pub fn add(&mut self, header: Header) {
        self.table_size += header.size();
        self.entries.push_front(header);
        self.evict();
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    /// Recompute the table size from scratch.
    pub fn calculated_size(&self) -> usize {
        self.entries.iter().map(Header::size).sum()
    }

    fn evict(&mut self) {
        while self.table_size > self.maximum_table_size {
            match self.entries.pop_back() {
                Some(old) => self.table_size -= old.size(),
                None => break,
            }
        }
    }
}

impl fmt::Display for DynamicTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Table Size: {} (Maximum:{})",
            self.table_size, self.maximum_table_size
        )?;
        let calculated = self.calculated_size();
        if calculated != self.table_size {
            writeln!(f, "ERROR: Calculated Table Size mismatched ({calculated})")?;
        }
        for (i, h) in self.entries.iter().enumerate() {
            writeln!(f, "[{}] {} {}", i + 1, h.name_str(), h.value_str())?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_static_table_size() {
        assert_eq!(STATIC_TABLE.len(), 61);
    }

    #[test]
    fn test_static_table_lookup() {
        assert_eq!(static_table_at(0), None);
        assert_eq!(static_table_at(1), Some(Header::new(":authority", "")));
        assert_eq!(static_table_at(2), Some(Header::new(":method", "GET")));
        assert_eq!(static_table_at(61), Some(Header::new("www-authenticate", "")));
        assert_eq!(static_table_at(62), None);
    }

    #[test]
    fn test_table_at_combined_space() {
        let mut dt = DynamicTable::default();
        assert_eq!(table_at(&dt, 0), None);
        assert_eq!(table_at(&dt, 2), Some(Header::new(":method", "GET")));
        assert_eq!(table_at(&dt, 62), None);

        dt.add(Header::new("a", "1"));
        dt.add(Header::new("b", "2"));
        assert_eq!(table_at(&dt, 62), Some(Header::new("b", "2")));
        assert_eq!(table_at(&dt, 63), Some(Header::new("a", "1")));
        assert_eq!(table_at(&dt, 64), None);
    }

    #[test]
    fn test_dynamic_table_add_and_at() {
        let mut dt = DynamicTable::new(4096);
        dt.add(Header::new("foo", "bar"));
        assert_eq!(dt.size(), 1);
        assert_eq!(dt.table_size(), 38);
        assert_eq!(dt.at(0), Some(&Header::new("foo", "bar")));
        assert_eq!(dt.at(1), None);
    }

    #[test]
    fn test_dynamic_table_eviction() {
        // "a" + "b" + 32 = 34; room for 2 entries
        let mut dt = DynamicTable::new(70);
        dt.add(Header::new("a", "b"));
        dt.add(Header::new("c", "d"));
        assert_eq!(dt.size(), 2);

        dt.add(Header::new("e", "f"));
        assert_eq!(dt.size(), 2);
        assert_eq!(dt.at(0).unwrap().name, b"e");
        assert_eq!(dt.at(1).unwrap().name, b"c");
        assert_eq!(dt.table_size(), 68);
    }

    #[test]
    fn test_dynamic_table_oversized_entry_empties() {
        let mut dt = DynamicTable::new(40);
        dt.add(Header::new("a", "b"));
        dt.add(Header::new("long-name", "long-value"));
        assert!(dt.is_empty());
        assert_eq!(dt.table_size(), 0);
    }

    #[test]
    fn test_dynamic_table_set_maximum() {
        let mut dt = DynamicTable::new(4096);
        dt.add(Header::new("name", "value"));
        dt.add(Header::new("x", "y"));

        dt.set_maximum_table_size(34);
        assert_eq!(dt.size(), 1);
        assert_eq!(dt.at(0).unwrap().name, b"x");

        dt.set_maximum_table_size(0);
        assert_eq!(dt.size(), 0);
        assert_eq!(dt.table_size(), 0);
        assert_eq!(dt.maximum_table_size(), 0);
    }

    #[test]
    fn test_dynamic_table_dump() {
        let mut dt = DynamicTable::new(4096);
        dt.add(Header::new("a", "1"));
        dt.add(Header::new("b", "2"));
        let dump = dt.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines, vec!["Table Size: 68 (Maximum:4096)", "[1] b 2", "[2] a 1"]);
    }

    proptest! {
        #[test]
        fn test_size_tracks_entries(
            ops in prop::collection::vec((0usize..40, any::<bool>()), 1..64),
            max in 0usize..512,
        ) {
            let mut dt = DynamicTable::new(max);
            let mut added = 0usize;
            for (name_len, resize) in ops {
                if resize {
                    dt.set_maximum_table_size(name_len * 8);
                } else {
                    added += 1;
                    let header = Header::new(vec![b'n'; name_len], added.to_string());
                    let size = header.size();
                    dt.add(header);
                    // The newest entry survives unless it alone exceeds the maximum.
                    if size <= dt.maximum_table_size() {
                        prop_assert_eq!(dt.at(0).unwrap().value_str(), added.to_string());
                    }
                }
                prop_assert_eq!(dt.table_size(), dt.calculated_size());
                prop_assert!(dt.table_size() <= dt.maximum_table_size());
            }
        }

        #[test]
        fn test_eviction_is_oldest_first(count in 1usize..40, max in 40usize..400) {
            let mut dt = DynamicTable::new(max);
            for i in 0..count {
                dt.add(Header::new("k", format!("{i:04}")));
            }
            // Survivors are a contiguous run of the most recent additions.
            for (pos, h) in dt.iter().enumerate() {
                prop_assert_eq!(h.value_str(), format!("{:04}", count - 1 - pos));
            }
        }
    }
}
