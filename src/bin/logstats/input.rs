//! Newline-delimited JSON input
//!
//! Each non-empty line is one log record: a flat JSON object. Values become
//! field text (numbers and booleans as written, `null` as empty, nested
//! values as compact JSON). A string `_time` field in RFC3339 form becomes
//! the record timestamp.

use std::io::BufRead;

use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::debug;

use kuba_logstats::block::{BlockBuilder, BlockResult, TIME_FIELD};
use kuba_logstats::{Error, Result};

/// Read records from `reader` and pack them into blocks of `block_size` rows
pub fn read_blocks(reader: impl BufRead, block_size: usize) -> Result<Vec<BlockResult>> {
    let block_size = block_size.max(1);
    let mut blocks = Vec::new();
    let mut builder = BlockBuilder::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Map<String, Value> = serde_json::from_str(line).map_err(|e| {
            Error::Serialization(format!("line {}: invalid JSON record: {}", line_no + 1, e))
        })?;

        let timestamp = record
            .get(TIME_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .and_then(|dt| dt.timestamp_nanos_opt());

        let fields: Vec<(&str, String)> = record
            .iter()
            .filter(|(name, _)| name.as_str() != TIME_FIELD)
            .map(|(name, value)| (name.as_str(), field_text(value)))
            .collect();
        builder.push_row(timestamp, &fields);

        if builder.len() >= block_size {
            let full = std::mem::take(&mut builder);
            blocks.push(full.build()?);
        }
    }

    if !builder.is_empty() {
        blocks.push(builder.build()?);
    }

    debug!(blocks = blocks.len(), block_size, "input packed into blocks");
    Ok(blocks)
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_split() {
        let input = "{\"a\":\"x\"}\n\n{\"a\":\"y\"}\n{\"a\":\"z\"}\n";
        let blocks = read_blocks(input.as_bytes(), 2).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].row_count(), 2);
        assert_eq!(blocks[1].row_count(), 1);
    }

    #[test]
    fn test_time_field_becomes_timestamp() {
        let input = r#"{"_time":"1970-01-01T00:00:01Z","msg":"up"}"#;
        let blocks = read_blocks(input.as_bytes(), 10).unwrap();
        assert_eq!(blocks[0].timestamps(), &[1_000_000_000]);
    }

    #[test]
    fn test_invalid_line_reports_position() {
        let input = "{\"a\":1}\nnot json\n";
        let err = read_blocks(input.as_bytes(), 10).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(&Value::Null), "");
        assert_eq!(field_text(&serde_json::json!(12)), "12");
        assert_eq!(field_text(&serde_json::json!(true)), "true");
        assert_eq!(field_text(&serde_json::json!([1, 2])), "[1,2]");
    }
}
