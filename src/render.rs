//! Canonical text rendering for column values
//!
//! Every stats comparison in the engine runs over the textual form of a
//! value, regardless of how the column is physically encoded. This module
//! owns that textual form:
//!
//! | Encoding              | Canonical text                         |
//! |-----------------------|----------------------------------------|
//! | string / dictionary   | the value itself                       |
//! | `_time` column        | `2006-01-02T15:04:05.000000000Z`       |
//! | uint8..uint64         | base-10 integer                        |
//! | float64               | shortest round-trip decimal, no exponent |
//! | ipv4                  | dotted quad                            |
//! | iso8601 timestamp     | `2006-01-02T15:04:05.000Z`             |
//!
//! Both timestamp layouts are fixed width, so lexical order of the rendered
//! text matches chronological order for years 0000..=9999.
//!
//! Ordering is plain byte-lexical (`"10" < "2"`), including for numeric
//! encodings. Callers must not assume numeric ordering.

use std::fmt::Write;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::block::EncodedType;

/// Layout of the implicit `_time` column
const RFC3339_NANO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Layout used for ISO8601 timestamp columns at ingestion
const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A single column value before rendering
///
/// Borrowed text is handed through untouched; everything else is rendered
/// on demand into a caller-supplied buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// String or dictionary value
    Text(&'a str),
    /// Row timestamp from the `_time` column, in nanoseconds
    Time(i64),
    /// Fixed-width encoded value as stored in the block
    Encoded(EncodedType, u64),
}

/// Append the canonical text of `value` to `dst`
pub fn render_value(dst: &mut String, value: RawValue<'_>) {
    match value {
        RawValue::Text(s) => dst.push_str(s),
        RawValue::Time(nanos) => marshal_timestamp_rfc3339_nano(dst, nanos),
        RawValue::Encoded(value_type, raw) => render_encoded(dst, value_type, raw),
    }
}

/// Append the canonical text of a fixed-width encoded value to `dst`
pub fn render_encoded(dst: &mut String, value_type: EncodedType, raw: u64) {
    match value_type {
        EncodedType::Uint8 | EncodedType::Uint16 | EncodedType::Uint32 | EncodedType::Uint64 => {
            marshal_uint64(dst, raw)
        },
        EncodedType::Float64 => marshal_float64(dst, f64::from_bits(raw)),
        EncodedType::Ipv4 => marshal_ipv4(dst, raw as u32),
        EncodedType::TimestampIso8601 => marshal_timestamp_iso8601(dst, raw as i64),
    }
}

/// Append `n` as a base-10 integer
pub fn marshal_uint64(dst: &mut String, n: u64) {
    let _ = write!(dst, "{}", n);
}

/// Append `f` as the shortest decimal that round-trips
///
/// Infinities render as `+Inf` / `-Inf` to match the query language's
/// numeric literals.
pub fn marshal_float64(dst: &mut String, f: f64) {
    if f.is_infinite() {
        dst.push_str(if f > 0.0 { "+Inf" } else { "-Inf" });
        return;
    }
    let _ = write!(dst, "{}", f);
}

/// Append a packed IPv4 address as a dotted quad
pub fn marshal_ipv4(dst: &mut String, ip: u32) {
    let _ = write!(dst, "{}", Ipv4Addr::from(ip));
}

/// Append a nanosecond timestamp with millisecond precision
pub fn marshal_timestamp_iso8601(dst: &mut String, nanos: i64) {
    let dt: DateTime<Utc> = DateTime::from_timestamp_nanos(nanos);
    let _ = write!(dst, "{}", dt.format(ISO8601_FORMAT));
}

/// Append a nanosecond timestamp with a fixed 9-digit fraction
pub fn marshal_timestamp_rfc3339_nano(dst: &mut String, nanos: i64) {
    let dt: DateTime<Utc> = DateTime::from_timestamp_nanos(nanos);
    let _ = write!(dst, "{}", dt.format(RFC3339_NANO_FORMAT));
}

/// Engine-wide ordering for stats values
#[inline]
pub fn less_string(a: &str, b: &str) -> bool {
    a < b
}

/// Mirror of [`less_string`]
#[inline]
pub fn greater_string(a: &str, b: &str) -> bool {
    a > b
}
