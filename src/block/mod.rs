//! Query blocks - columnar batches handed to the stats processors
//!
//! A [`BlockResult`] is produced by the scan layer once per scan iteration
//! and discarded after the processors have consumed it. Processors never
//! keep references into a block past the current update call.
//!
//! # Layout
//!
//! ```text
//! BlockResult (row_count = 4)
//! ├── _time    Time          [t0, t1, t2, t3]        (optional)
//! ├── host     Const         "web-1"
//! ├── level    Dict          {info, warn} + [0,0,1,0]
//! ├── status   Encoded u16   [200, 200, 404, 500]    stats {min, max}
//! └── msg      Strings       ["..", "..", "..", ".."]
//! ```

pub mod builder;
pub mod column;

pub use builder::BlockBuilder;
pub use column::{
    BlockColumn, ColumnStats, ColumnValues, EncodedColumn, EncodedType, ValueType, MAX_DICT_LEN,
    TIME_FIELD,
};

use crate::error::BlockError;
use crate::render::RawValue;

/// A columnar batch of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockResult {
    row_count: usize,
    timestamps: Vec<i64>,
    columns: Vec<BlockColumn>,
}

impl BlockResult {
    /// Create an empty block with `row_count` rows and no columns
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            timestamps: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Create a block whose row count is given by its timestamps
    ///
    /// The implicit `_time` column is added as the first column.
    pub fn with_timestamps(timestamps: Vec<i64>) -> Self {
        let row_count = timestamps.len();
        let columns = if row_count == 0 {
            Vec::new()
        } else {
            vec![BlockColumn::time()]
        };
        Self {
            row_count,
            timestamps,
            columns,
        }
    }

    /// Append a column, checking it covers every row
    pub fn push_column(&mut self, column: BlockColumn) -> Result<(), BlockError> {
        if let Some(rows) = column.stored_rows() {
            if rows != self.row_count {
                return Err(BlockError::LengthMismatch {
                    column: column.name().to_string(),
                    expected: self.row_count,
                    actual: rows,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style variant of [`push_column`](Self::push_column)
    pub fn with_column(mut self, column: BlockColumn) -> Result<Self, BlockError> {
        self.push_column(column)?;
        Ok(self)
    }

    /// Number of rows
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// True when the block has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Row timestamps in nanoseconds; empty when the block has no `_time`
    #[inline]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// All columns, including `_time` when present
    pub fn columns(&self) -> &[BlockColumn] {
        &self.columns
    }

    /// Column by name
    pub fn column_by_name(&self, name: &str) -> Option<&BlockColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Value of field `name` at `row`
    ///
    /// Fields absent from the block read as the empty string.
    pub fn value_at_row(&self, name: &str, row: usize) -> RawValue<'_> {
        match self.column_by_name(name) {
            Some(column) => column.value_at_row(self, row),
            None => RawValue::Text(""),
        }
    }

    /// Approximate heap footprint in bytes
    pub fn memory_size(&self) -> usize {
        let columns: usize = self
            .columns
            .iter()
            .map(|c| match c.values() {
                ColumnValues::Time => 0,
                ColumnValues::Const(v) => v.len(),
                ColumnValues::Strings(values) => values.iter().map(String::len).sum(),
                ColumnValues::Dict { values, indexes } => {
                    values.iter().map(String::len).sum::<usize>() + indexes.len()
                },
                ColumnValues::Encoded(e) => e.values().len() * 8,
            })
            .sum();
        self.timestamps.len() * 8 + columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_column_first() {
        let block = BlockResult::with_timestamps(vec![1, 2, 3]);
        assert_eq!(block.row_count(), 3);
        assert_eq!(block.columns().len(), 1);
        assert!(block.columns()[0].is_time());
        assert_eq!(block.columns()[0].name(), TIME_FIELD);
    }

    #[test]
    fn test_empty_timestamps_have_no_time_column() {
        let block = BlockResult::with_timestamps(Vec::new());
        assert!(block.is_empty());
        assert!(block.columns().is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut block = BlockResult::new(2);
        let err = block
            .push_column(BlockColumn::strings("msg", vec!["a".into()]))
            .unwrap_err();
        assert!(matches!(err, BlockError::LengthMismatch { expected: 2, actual: 1, .. }));

        // Const columns do not store rows
        assert!(block.push_column(BlockColumn::constant("host", "web-1")).is_ok());
    }

    #[test]
    fn test_value_at_row() {
        let block = BlockResult::new(2)
            .with_column(BlockColumn::strings("msg", vec!["a".into(), "b".into()]))
            .unwrap()
            .with_column(
                BlockColumn::dict("level", vec!["info".into(), "warn".into()], vec![1, 0])
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(block.value_at_row("msg", 1), RawValue::Text("b"));
        assert_eq!(block.value_at_row("level", 0), RawValue::Text("warn"));
        assert_eq!(block.value_at_row("missing", 0), RawValue::Text(""));
    }
}
