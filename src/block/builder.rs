//! In-memory block packing
//!
//! Turns row-oriented records into a [`BlockResult`], choosing a physical
//! layout per column from the values it holds:
//!
//! 1. **Const** when every row has the same value
//! 2. **Encoded** when every value is the canonical text of a uint, float64,
//!    IPv4 address or ISO8601 timestamp
//! 3. **Dict** when the column has at most [`MAX_DICT_LEN`] distinct values
//! 4. **Strings** otherwise
//!
//! An encoding is only chosen when rendering the decoded value gives back the
//! original text, so a packed block reads back exactly the rows it was built
//! from.
//!
//! # Example
//!
//! ```rust
//! use kuba_logstats::block::{BlockBuilder, ValueType, EncodedType};
//!
//! let mut builder = BlockBuilder::new();
//! builder.push_row(Some(1_000), &[("status", "200"), ("host", "web-1")]);
//! builder.push_row(Some(2_000), &[("status", "404"), ("host", "web-1")]);
//! let block = builder.build().unwrap();
//!
//! assert_eq!(block.row_count(), 2);
//! let status = block.column_by_name("status").unwrap();
//! assert_eq!(status.value_type(), Some(ValueType::Encoded(EncodedType::Uint16)));
//! assert!(block.column_by_name("host").unwrap().is_const());
//! ```

use std::collections::HashMap;
use std::net::Ipv4Addr;

use chrono::DateTime;

use crate::error::BlockError;
use crate::render::render_encoded;

use super::column::{BlockColumn, EncodedColumn, EncodedType, MAX_DICT_LEN, TIME_FIELD};
use super::BlockResult;

/// Row-oriented builder for [`BlockResult`]
#[derive(Debug, Default)]
pub struct BlockBuilder {
    /// Per-row timestamps; the block gets `_time` only if all rows have one
    timestamps: Vec<Option<i64>>,

    /// Column values in first-seen order
    columns: Vec<(String, Vec<String>)>,

    /// Column name -> position in `columns`
    index: HashMap<String, usize>,
}

impl BlockBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows pushed so far
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when no rows were pushed
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append one row
    ///
    /// Fields missing from the row read as empty strings. A `_time` field
    /// is ignored; pass the timestamp separately instead.
    pub fn push_row<K, V>(&mut self, timestamp: Option<i64>, fields: &[(K, V)])
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let row = self.timestamps.len();
        self.timestamps.push(timestamp);

        for (name, value) in fields {
            let name = name.as_ref();
            if name == TIME_FIELD {
                continue;
            }
            let idx = match self.index.get(name) {
                Some(&idx) => idx,
                None => {
                    let idx = self.columns.len();
                    self.columns.push((name.to_string(), vec![String::new(); row]));
                    self.index.insert(name.to_string(), idx);
                    idx
                },
            };
            let values = &mut self.columns[idx].1;
            if values.len() > row {
                // Repeated field within one row, last one wins
                values[row] = value.as_ref().to_string();
            } else {
                values.push(value.as_ref().to_string());
            }
        }

        for (_, values) in &mut self.columns {
            if values.len() == row {
                values.push(String::new());
            }
        }
    }

    /// Pack the rows into a block
    pub fn build(self) -> Result<BlockResult, BlockError> {
        let row_count = self.timestamps.len();
        let timestamps: Option<Vec<i64>> = self.timestamps.into_iter().collect();

        let mut block = match timestamps {
            Some(ts) if row_count > 0 => BlockResult::with_timestamps(ts),
            _ => BlockResult::new(row_count),
        };

        for (name, values) in self.columns {
            block.push_column(encode_column(name, values)?)?;
        }
        Ok(block)
    }
}

/// Pick the layout for one column
fn encode_column(name: String, values: Vec<String>) -> Result<BlockColumn, BlockError> {
    if let Some(first) = values.first() {
        if values.iter().all(|v| v == first) {
            return Ok(BlockColumn::constant(name, first.clone()));
        }
    }

    if let Some(column) = try_encode(&values) {
        return Ok(BlockColumn::encoded(name, column));
    }

    let mut dict: Vec<String> = Vec::new();
    let mut indexes = Vec::with_capacity(values.len());
    for value in &values {
        let idx = match dict.iter().position(|d| d == value) {
            Some(idx) => idx,
            None if dict.len() < MAX_DICT_LEN => {
                dict.push(value.clone());
                dict.len() - 1
            },
            None => return Ok(BlockColumn::strings(name, values)),
        };
        indexes.push(idx as u8);
    }
    BlockColumn::dict(name, dict, indexes)
}

fn try_encode(values: &[String]) -> Option<EncodedColumn> {
    if values.is_empty() {
        return None;
    }

    if let Some(raw) = encode_all(values, EncodedType::Uint64, |s| s.parse::<u64>().ok()) {
        let max = raw.iter().copied().max().unwrap_or(0);
        return Some(EncodedColumn::new(EncodedType::uint_for(max), raw));
    }

    let parsers: [(EncodedType, fn(&str) -> Option<u64>); 3] = [
        (EncodedType::Float64, parse_float64),
        (EncodedType::Ipv4, parse_ipv4),
        (EncodedType::TimestampIso8601, parse_iso8601),
    ];
    parsers.into_iter().find_map(|(value_type, parse)| {
        encode_all(values, value_type, parse).map(|raw| EncodedColumn::new(value_type, raw))
    })
}

/// Parse every value, keeping the result only if it renders back unchanged
fn encode_all(
    values: &[String],
    value_type: EncodedType,
    parse: impl Fn(&str) -> Option<u64>,
) -> Option<Vec<u64>> {
    let mut buf = String::new();
    let mut raw = Vec::with_capacity(values.len());
    for value in values {
        let n = parse(value)?;
        buf.clear();
        render_encoded(&mut buf, value_type, n);
        if buf != *value {
            return None;
        }
        raw.push(n);
    }
    Some(raw)
}

fn parse_float64(s: &str) -> Option<u64> {
    s.parse::<f64>().ok().map(f64::to_bits)
}

fn parse_ipv4(s: &str) -> Option<u64> {
    s.parse::<Ipv4Addr>().ok().map(|ip| u32::from(ip) as u64)
}

fn parse_iso8601(s: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .and_then(|dt| dt.timestamp_nanos_opt())
        .map(|nanos| nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{ColumnValues, ValueType};

    fn build(rows: &[&[(&str, &str)]]) -> BlockResult {
        let mut builder = BlockBuilder::new();
        for fields in rows {
            builder.push_row(None, fields);
        }
        builder.build().unwrap()
    }

    fn value_type(block: &BlockResult, name: &str) -> Option<ValueType> {
        block.column_by_name(name).unwrap().value_type()
    }

    #[test]
    fn test_const_column() {
        let block = build(&[&[("host", "web-1")], &[("host", "web-1")]]);
        assert!(block.column_by_name("host").unwrap().is_const());
    }

    #[test]
    fn test_encoded_columns() {
        let block = build(&[
            &[("n", "7"), ("f", "-1.5"), ("ip", "10.0.0.1"), ("ts", "2024-01-02T03:04:05.678Z")],
            &[("n", "70000"), ("f", "2"), ("ip", "10.0.0.2"), ("ts", "2024-01-02T03:04:06.000Z")],
        ]);
        assert_eq!(value_type(&block, "n"), Some(ValueType::Encoded(EncodedType::Uint32)));
        assert_eq!(value_type(&block, "f"), Some(ValueType::Encoded(EncodedType::Float64)));
        assert_eq!(value_type(&block, "ip"), Some(ValueType::Encoded(EncodedType::Ipv4)));
        assert_eq!(
            value_type(&block, "ts"),
            Some(ValueType::Encoded(EncodedType::TimestampIso8601))
        );
    }

    #[test]
    fn test_non_canonical_numbers_stay_text() {
        // "007" would render back as "7"
        let block = build(&[&[("n", "007")], &[("n", "8")]]);
        assert_eq!(value_type(&block, "n"), Some(ValueType::Dict));
    }

    #[test]
    fn test_dict_and_strings() {
        let block = build(&[&[("level", "info")], &[("level", "warn")], &[("level", "info")]]);
        match block.column_by_name("level").unwrap().values() {
            ColumnValues::Dict { values, indexes } => {
                assert_eq!(values, &["info".to_string(), "warn".to_string()]);
                assert_eq!(indexes, &[0, 1, 0]);
            },
            other => panic!("expected dict column, got {:?}", other),
        }

        let rows: Vec<Vec<(String, String)>> = (0..20)
            .map(|i| vec![("msg".to_string(), format!("request {}", i))])
            .collect();
        let mut builder = BlockBuilder::new();
        for row in &rows {
            builder.push_row(None, row);
        }
        let block = builder.build().unwrap();
        assert_eq!(value_type(&block, "msg"), Some(ValueType::String));
    }

    #[test]
    fn test_sparse_fields_backfilled() {
        let block = build(&[&[("a", "x")], &[("b", "y")]]);
        assert_eq!(block.row_count(), 2);
        let a = block.column_by_name("a").unwrap();
        let b = block.column_by_name("b").unwrap();
        assert_eq!(a.value_at_row(&block, 1), crate::render::RawValue::Text(""));
        assert_eq!(b.value_at_row(&block, 0), crate::render::RawValue::Text(""));
    }

    #[test]
    fn test_time_column_requires_all_timestamps() {
        let mut builder = BlockBuilder::new();
        builder.push_row(Some(10), &[("a", "x")]);
        builder.push_row(Some(20), &[("a", "y")]);
        let block = builder.build().unwrap();
        assert_eq!(block.timestamps(), &[10, 20]);
        assert!(block.column_by_name(TIME_FIELD).is_some());

        let mut builder = BlockBuilder::new();
        builder.push_row(Some(10), &[("a", "x")]);
        builder.push_row(None, &[("a", "y")]);
        let block = builder.build().unwrap();
        assert!(block.timestamps().is_empty());
        assert!(block.column_by_name(TIME_FIELD).is_none());
    }
}
