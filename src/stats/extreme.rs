//! Shared state machine for `min` and `max`
//!
//! Both functions keep a single value: the extreme canonical text seen so
//! far. The state starts empty, accepts the first value unconditionally and
//! afterwards only accepts strictly better values, so folding the same value
//! twice is a no-op. That idempotence is what lets the whole-block path fold
//! a dictionary's distinct entries, or an encoded column's cached extreme,
//! instead of every row.

use std::any::Any;
use std::sync::Arc;

use crate::block::{BlockColumn, BlockResult, ColumnStats, ColumnValues};
use crate::render::{greater_string, less_string, render_value, RawValue};
use crate::scratch;

use super::fields::FieldSelector;
use super::{StatsProcessor, NO_VALUE};

/// Direction of an extreme-value aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extreme {
    /// Smallest canonical text
    Min,
    /// Largest canonical text
    Max,
}

impl Extreme {
    /// Function name in query syntax
    pub fn name(self) -> &'static str {
        match self {
            Extreme::Min => "min",
            Extreme::Max => "max",
        }
    }

    /// True when `candidate` should replace `current`
    #[inline]
    pub fn prefers(self, candidate: &str, current: &str) -> bool {
        match self {
            Extreme::Min => less_string(candidate, current),
            Extreme::Max => greater_string(candidate, current),
        }
    }

    /// Cached block extreme for this direction
    #[inline]
    fn pick_stat(self, stats: ColumnStats) -> u64 {
        match self {
            Extreme::Min => stats.min,
            Extreme::Max => stats.max,
        }
    }

    /// Fixed-width timestamp text sorts chronologically
    fn pick_timestamp(self, timestamps: &[i64]) -> Option<i64> {
        match self {
            Extreme::Min => timestamps.iter().copied().min(),
            Extreme::Max => timestamps.iter().copied().max(),
        }
    }

    /// Best of `values` under this direction, first one wins ties
    fn pick_str<'a, I>(self, values: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        values
            .into_iter()
            .map(String::as_str)
            .reduce(|best, v| if self.prefers(v, best) { v } else { best })
    }
}

// ============================================================================
// Extreme State
// ============================================================================

/// The held value and whether one has been seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtremeState {
    extreme: Extreme,
    value: String,
    has_value: bool,
}

impl ExtremeState {
    fn new(extreme: Extreme) -> Self {
        Self {
            extreme,
            value: String::new(),
            has_value: false,
        }
    }

    /// Fold one canonical value
    ///
    /// Accepted values are copied into the state's own buffer; the source
    /// block may be dropped right after the update.
    #[inline]
    fn update_str(&mut self, v: &str) {
        if self.has_value && !self.extreme.prefers(v, &self.value) {
            return;
        }
        self.value.clear();
        self.value.push_str(v);
        self.has_value = true;
    }

    /// Fold one value, rendering it through a pooled buffer if needed
    fn update_raw(&mut self, v: RawValue<'_>) {
        match v {
            RawValue::Text(s) => self.update_str(s),
            other => {
                let mut buf = scratch::global().get();
                render_value(&mut buf, other);
                self.update_str(&buf);
            },
        }
    }

    /// Fold every value of `column` in `block` without visiting rows where
    /// the layout allows it
    fn update_for_column(&mut self, block: &BlockResult, column: &BlockColumn) {
        if block.is_empty() {
            return;
        }

        match column.values() {
            ColumnValues::Time => {
                if let Some(ts) = self.extreme.pick_timestamp(block.timestamps()) {
                    self.update_raw(RawValue::Time(ts));
                }
            },
            ColumnValues::Const(v) => self.update_str(v),
            ColumnValues::Strings(values) => {
                if let Some(v) = self.extreme.pick_str(values) {
                    self.update_str(v);
                }
            },
            ColumnValues::Dict { values, .. } => {
                if let Some(v) = self.extreme.pick_str(values) {
                    self.update_str(v);
                }
            },
            ColumnValues::Encoded(c) => {
                let raw = self.extreme.pick_stat(c.stats());
                self.update_raw(RawValue::Encoded(c.value_type(), raw));
            },
        }
    }

    fn finalize(&self) -> String {
        if !self.has_value {
            return NO_VALUE.to_string();
        }
        self.value.clone()
    }
}

// ============================================================================
// Extreme Processor
// ============================================================================

/// Processor for `min` and `max`
#[derive(Debug, Clone)]
pub struct ExtremeProcessor {
    fields: Arc<FieldSelector>,
    state: ExtremeState,
}

impl ExtremeProcessor {
    /// Empty processor reading `fields`
    pub fn new(extreme: Extreme, fields: Arc<FieldSelector>) -> Self {
        Self {
            fields,
            state: ExtremeState::new(extreme),
        }
    }

    /// Direction of this processor
    pub fn extreme(&self) -> Extreme {
        self.state.extreme
    }

    /// Held value, `None` while empty
    pub fn value(&self) -> Option<&str> {
        self.state.has_value.then_some(self.state.value.as_str())
    }

    /// Fold a single canonical value as if it had been read from a block
    pub fn update_state_str(&mut self, v: &str) -> isize {
        let before = self.state.value.len() as isize;
        self.state.update_str(v);
        self.state.value.len() as isize - before
    }
}

impl StatsProcessor for ExtremeProcessor {
    fn update_for_all_rows(&mut self, block: &BlockResult) -> isize {
        let before = self.state.value.len() as isize;

        if self.fields.is_wildcard() {
            for column in block.columns() {
                self.state.update_for_column(block, column);
            }
        } else {
            for name in self.fields.fields() {
                match block.column_by_name(name) {
                    Some(column) => self.state.update_for_column(block, column),
                    // Absent fields read as empty strings
                    None if !block.is_empty() => self.state.update_str(""),
                    None => {},
                }
            }
        }

        self.state.value.len() as isize - before
    }

    fn update_for_row(&mut self, block: &BlockResult, row: usize) -> isize {
        let before = self.state.value.len() as isize;

        if self.fields.is_wildcard() {
            for column in block.columns() {
                self.state.update_raw(column.value_at_row(block, row));
            }
        } else {
            for name in self.fields.fields() {
                self.state.update_raw(block.value_at_row(name, row));
            }
        }

        self.state.value.len() as isize - before
    }

    fn merge(&mut self, other: &dyn StatsProcessor) {
        let Some(src) = other.as_any().downcast_ref::<ExtremeProcessor>() else {
            panic!(
                "BUG: cannot merge {} state with {:?}",
                self.state.extreme.name(),
                other
            );
        };
        assert_eq!(
            self.state.extreme, src.state.extreme,
            "BUG: cannot merge {} state with {} state",
            self.state.extreme.name(),
            src.state.extreme.name()
        );
        if src.state.has_value {
            self.state.update_str(&src.state.value);
        }
    }

    fn finalize(&self) -> String {
        self.state.finalize()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{EncodedColumn, EncodedType};

    fn processor(extreme: Extreme, fields: &[&str]) -> ExtremeProcessor {
        ExtremeProcessor::new(extreme, Arc::new(FieldSelector::from_fields(fields.iter().copied())))
    }

    fn uint_block(values: Vec<u64>) -> BlockResult {
        let rows = values.len();
        BlockResult::new(rows)
            .with_column(BlockColumn::encoded(
                "n",
                EncodedColumn::new(EncodedType::Uint16, values),
            ))
            .unwrap()
    }

    #[test]
    fn test_first_value_accepted() {
        let mut p = processor(Extreme::Min, &["x"]);
        assert_eq!(p.value(), None);
        assert_eq!(p.update_state_str("zeta"), 4);
        assert_eq!(p.value(), Some("zeta"));
    }

    #[test]
    fn test_not_smaller_is_noop() {
        let mut p = processor(Extreme::Min, &["x"]);
        p.update_state_str("b");
        assert_eq!(p.update_state_str("b"), 0);
        assert_eq!(p.update_state_str("c"), 0);
        assert_eq!(p.value(), Some("b"));
        assert_eq!(p.update_state_str("a"), 0);
        assert_eq!(p.value(), Some("a"));
    }

    #[test]
    fn test_empty_string_is_a_value() {
        let mut p = processor(Extreme::Min, &["x"]);
        p.update_state_str("");
        assert_eq!(p.value(), Some(""));
        assert_eq!(p.finalize(), "");
    }

    #[test]
    fn test_uint_compares_as_text() {
        let block = uint_block(vec![2, 10, 9]);

        let mut min = processor(Extreme::Min, &["n"]);
        min.update_for_all_rows(&block);
        assert_eq!(min.finalize(), "10");

        let mut max = processor(Extreme::Max, &["n"]);
        max.update_for_all_rows(&block);
        assert_eq!(max.finalize(), "9");
    }

    #[test]
    fn test_row_and_block_paths_agree_on_encoded() {
        let block = uint_block(vec![300, 41, 1000, 7]);
        let mut by_block = processor(Extreme::Min, &["n"]);
        by_block.update_for_all_rows(&block);

        let mut by_row = processor(Extreme::Min, &["n"]);
        for row in 0..block.row_count() {
            by_row.update_for_row(&block, row);
        }
        assert_eq!(by_block.finalize(), by_row.finalize());
        assert_eq!(by_block.finalize(), "1000");
    }

    #[test]
    fn test_time_column() {
        let block = BlockResult::with_timestamps(vec![3_000_000_000, 1_000_000_000, 2_000_000_000]);
        let mut min = processor(Extreme::Min, &["_time"]);
        min.update_for_all_rows(&block);
        assert_eq!(min.finalize(), "1970-01-01T00:00:01.000000000Z");

        let mut max = processor(Extreme::Max, &["_time"]);
        for row in 0..block.row_count() {
            max.update_for_row(&block, row);
        }
        assert_eq!(max.finalize(), "1970-01-01T00:00:03.000000000Z");
    }

    #[test]
    fn test_missing_field_reads_empty() {
        let block = uint_block(vec![5]);
        let mut p = processor(Extreme::Min, &["n", "absent"]);
        p.update_for_all_rows(&block);
        assert_eq!(p.finalize(), "");
    }

    #[test]
    fn test_empty_block_is_noop() {
        let block = BlockResult::new(0);
        let mut p = processor(Extreme::Min, &["absent"]);
        assert_eq!(p.update_for_all_rows(&block), 0);
        assert_eq!(p.finalize(), NO_VALUE);
    }

    #[test]
    fn test_byte_delta_tracks_value_length() {
        let mut p = processor(Extreme::Max, &["x"]);
        assert_eq!(p.update_state_str("ab"), 2);
        assert_eq!(p.update_state_str("b"), -1);
        assert_eq!(p.update_state_str("zzzz"), 3);
    }

    #[test]
    #[should_panic(expected = "BUG: cannot merge min state with max state")]
    fn test_merge_kind_mismatch_panics() {
        let mut min = processor(Extreme::Min, &["x"]);
        let max = processor(Extreme::Max, &["x"]);
        min.merge(&max);
    }
}
