//! Typed column views
//!
//! A [`BlockColumn`] exposes one field of a block without decoding it into
//! per-row strings. The physical layout is a sum type, so every consumer
//! matches over the same closed set of encodings.

use std::fmt;

use tracing::error;

use crate::error::BlockError;
use crate::render::{greater_string, less_string, render_encoded, RawValue};

use super::BlockResult;

/// Name of the implicit timestamp column
pub const TIME_FIELD: &str = "_time";

/// Maximum number of distinct values in a dictionary column
pub const MAX_DICT_LEN: usize = 8;

// ============================================================================
// Value Types
// ============================================================================

/// Fixed-width encodings that store one `u64` per row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodedType {
    /// Unsigned integer that fits in 8 bits
    Uint8,
    /// Unsigned integer that fits in 16 bits
    Uint16,
    /// Unsigned integer that fits in 32 bits
    Uint32,
    /// Unsigned 64-bit integer
    Uint64,
    /// IEEE 754 bit pattern
    Float64,
    /// Packed IPv4 address in the low 32 bits
    Ipv4,
    /// Nanosecond timestamp ingested from ISO8601 text
    TimestampIso8601,
}

impl EncodedType {
    /// Narrowest unsigned integer encoding able to hold `max`
    pub fn uint_for(max: u64) -> Self {
        if max <= u8::MAX as u64 {
            EncodedType::Uint8
        } else if max <= u16::MAX as u64 {
            EncodedType::Uint16
        } else if max <= u32::MAX as u64 {
            EncodedType::Uint32
        } else {
            EncodedType::Uint64
        }
    }
}

/// Physical value type of a column, as tagged by the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Plain strings, one per row
    String,
    /// Dictionary of distinct strings plus per-row indexes
    Dict,
    /// Fixed-width encoded values
    Encoded(EncodedType),
}

impl TryFrom<u8> for ValueType {
    /// The unrecognised tag
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        Ok(match tag {
            1 => ValueType::String,
            2 => ValueType::Dict,
            3 => ValueType::Encoded(EncodedType::Uint8),
            4 => ValueType::Encoded(EncodedType::Uint16),
            5 => ValueType::Encoded(EncodedType::Uint32),
            6 => ValueType::Encoded(EncodedType::Uint64),
            7 => ValueType::Encoded(EncodedType::Float64),
            8 => ValueType::Encoded(EncodedType::Ipv4),
            9 => ValueType::Encoded(EncodedType::TimestampIso8601),
            other => return Err(other),
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Dict => "dict",
            ValueType::Encoded(EncodedType::Uint8) => "uint8",
            ValueType::Encoded(EncodedType::Uint16) => "uint16",
            ValueType::Encoded(EncodedType::Uint32) => "uint32",
            ValueType::Encoded(EncodedType::Uint64) => "uint64",
            ValueType::Encoded(EncodedType::Float64) => "float64",
            ValueType::Encoded(EncodedType::Ipv4) => "ipv4",
            ValueType::Encoded(EncodedType::TimestampIso8601) => "iso8601",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Encoded Column
// ============================================================================

/// Cached extremes of an encoded column within one block
///
/// Extremes are raw stored values, ordered by their canonical text. This is
/// the order every stats function compares in, so folding `min` alone is
/// equivalent to folding every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnStats {
    /// Raw value with the smallest canonical text
    pub min: u64,
    /// Raw value with the largest canonical text
    pub max: u64,
}

/// Column of fixed-width encoded values with cached block stats
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    value_type: EncodedType,
    values: Vec<u64>,
    stats: ColumnStats,
}

impl EncodedColumn {
    /// Create a column and compute its block stats
    pub fn new(value_type: EncodedType, values: Vec<u64>) -> Self {
        let stats = compute_stats(value_type, &values);
        Self {
            value_type,
            values,
            stats,
        }
    }

    /// Create a column with stats supplied by storage
    ///
    /// The caller guarantees `stats` matches `values`; whole-block stats
    /// rely on it without checking.
    pub fn with_stats(value_type: EncodedType, values: Vec<u64>, stats: ColumnStats) -> Self {
        Self {
            value_type,
            values,
            stats,
        }
    }

    /// Create a column from a storage type tag
    ///
    /// # Panics
    ///
    /// Panics when `tag` is not a fixed-width encoding. That means the
    /// block header is corrupt or written by an incompatible version, and
    /// any stats computed from it would be wrong.
    pub fn from_raw_parts(tag: u8, values: Vec<u64>, stats: ColumnStats) -> Self {
        match ValueType::try_from(tag) {
            Ok(ValueType::Encoded(value_type)) => Self::with_stats(value_type, values, stats),
            Ok(other) => {
                error!(tag, value_type = %other, "encoded column carries a non-encoded value type");
                panic!("BUG: value type {} cannot back an encoded column", other);
            },
            Err(tag) => {
                error!(tag, "unknown value type in block header");
                panic!("BUG: unknown valueType={}", tag);
            },
        }
    }

    /// Encoding of the stored values
    pub fn value_type(&self) -> EncodedType {
        self.value_type
    }

    /// Raw stored values, one per row
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Cached block stats
    pub fn stats(&self) -> ColumnStats {
        self.stats
    }
}

fn compute_stats(value_type: EncodedType, values: &[u64]) -> ColumnStats {
    let Some((&first, rest)) = values.split_first() else {
        return ColumnStats::default();
    };

    let mut stats = ColumnStats {
        min: first,
        max: first,
    };
    let mut min_text = String::new();
    render_encoded(&mut min_text, value_type, first);
    let mut max_text = min_text.clone();
    let mut current = String::new();

    for &raw in rest {
        current.clear();
        render_encoded(&mut current, value_type, raw);
        if less_string(&current, &min_text) {
            stats.min = raw;
            min_text.clone_from(&current);
        }
        if greater_string(&current, &max_text) {
            stats.max = raw;
            max_text.clone_from(&current);
        }
    }
    stats
}

// ============================================================================
// Block Column
// ============================================================================

/// Physical layout of a column within a block
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Implicit timestamp column; values live in [`BlockResult::timestamps`]
    Time,
    /// Every row shares one value
    Const(String),
    /// One string per row
    Strings(Vec<String>),
    /// Distinct values plus one index per row
    Dict {
        /// Distinct values, at most [`MAX_DICT_LEN`]
        values: Vec<String>,
        /// Per-row index into `values`
        indexes: Vec<u8>,
    },
    /// Fixed-width encoded values with cached stats
    Encoded(EncodedColumn),
}

/// One named column of a block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockColumn {
    name: String,
    values: ColumnValues,
}

impl BlockColumn {
    /// Column whose every row holds `value`
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Const(value.into()),
        }
    }

    /// Plain string column
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Strings(values),
        }
    }

    /// Dictionary-encoded column
    pub fn dict(
        name: impl Into<String>,
        values: Vec<String>,
        indexes: Vec<u8>,
    ) -> Result<Self, BlockError> {
        let name = name.into();
        if values.len() > MAX_DICT_LEN {
            return Err(BlockError::DictTooLarge {
                column: name,
                len: values.len(),
                limit: MAX_DICT_LEN,
            });
        }
        if let Some(&index) = indexes.iter().find(|&&i| i as usize >= values.len()) {
            return Err(BlockError::DictIndexOutOfRange {
                column: name,
                index,
                len: values.len(),
            });
        }
        Ok(Self {
            name,
            values: ColumnValues::Dict { values, indexes },
        })
    }

    /// Fixed-width encoded column
    pub fn encoded(name: impl Into<String>, column: EncodedColumn) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Encoded(column),
        }
    }

    pub(crate) fn time() -> Self {
        Self {
            name: TIME_FIELD.to_string(),
            values: ColumnValues::Time,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical layout
    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// True when every row shares one value
    pub fn is_const(&self) -> bool {
        matches!(self.values, ColumnValues::Const(_))
    }

    /// True for the implicit timestamp column
    pub fn is_time(&self) -> bool {
        matches!(self.values, ColumnValues::Time)
    }

    /// Storage value type; `None` for the timestamp column
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.values {
            ColumnValues::Time => None,
            ColumnValues::Const(_) | ColumnValues::Strings(_) => Some(ValueType::String),
            ColumnValues::Dict { .. } => Some(ValueType::Dict),
            ColumnValues::Encoded(c) => Some(ValueType::Encoded(c.value_type())),
        }
    }

    /// Number of rows the column stores, `None` when not stored per row
    pub(crate) fn stored_rows(&self) -> Option<usize> {
        match &self.values {
            ColumnValues::Time | ColumnValues::Const(_) => None,
            ColumnValues::Strings(values) => Some(values.len()),
            ColumnValues::Dict { indexes, .. } => Some(indexes.len()),
            ColumnValues::Encoded(c) => Some(c.values().len()),
        }
    }

    /// Value at `row`, without rendering
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below the block row count.
    #[inline]
    pub fn value_at_row<'a>(&'a self, block: &BlockResult, row: usize) -> RawValue<'a> {
        match &self.values {
            ColumnValues::Time => RawValue::Time(block.timestamps()[row]),
            ColumnValues::Const(v) => RawValue::Text(v),
            ColumnValues::Strings(values) => RawValue::Text(&values[row]),
            ColumnValues::Dict { values, indexes } => {
                RawValue::Text(&values[indexes[row] as usize])
            },
            ColumnValues::Encoded(c) => RawValue::Encoded(c.value_type, c.values[row]),
        }
    }
}
