//! Structured output decoding.
//!
//! The vendor CLIs print tables and detail blocks meant for humans. These
//! decoders turn captured text into [`Record`]s:
//!
//! - [`decode_table`]: a legend, a `-`/`|` separator, then one row per
//!   record with a 1-based `#` column.
//! - [`decode_detail`]: `key : value` lines.
//! - [`decode_tables`]: several `~ Title ~` sections, each a table.
//!
//! Lines that carry no data but look informational (they contain `:`) are
//! logged at `info` level instead of failing the decode.

mod table;

pub use table::{decode_table, decode_tables};

use indexmap::IndexMap;
use log::info;

/// One decoded row or detail block, in column order.
pub type Record = IndexMap<String, String>;

/// Decode `key : value` lines into a single record.
///
/// Lines without a ` : ` separator are logged and skipped. A repeated key
/// keeps its last value.
pub fn decode_detail(text: &str) -> Record {
    let mut record = Record::new();
    for line in text.lines() {
        match line.split_once(" : ") {
            Some((key, value)) => {
                record.insert(key.trim().to_string(), value.trim().to_string());
            }
            None if line.trim().is_empty() => {}
            None => info!("{}", line.trim_end()),
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_detail() {
        let text = "\
Name          : leaf1
Switch DPID   : 00:00:00:00:00:00:00:01
Fabric Role   : leaf

Stats unavailable
";
        let record = decode_detail(text);
        assert_eq!(record.len(), 3);
        assert_eq!(record["Name"], "leaf1");
        assert_eq!(record["Switch DPID"], "00:00:00:00:00:00:00:01");
        assert_eq!(record.get_index(2).map(|(k, _)| k.as_str()), Some("Fabric Role"));
    }

    #[test]
    fn test_decode_detail_empty() {
        assert!(decode_detail("").is_empty());
    }
}
