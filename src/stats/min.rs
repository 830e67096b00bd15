//! `min(field, ...)` - smallest value across the selected fields
//!
//! Values are compared by their canonical text, so `min` over a numeric
//! column returns the lexically smallest rendering (`"10"` before `"2"`).
//! A computation that sees no rows finalizes to `"NaN"`.

use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;

use super::extreme::{Extreme, ExtremeProcessor};
use super::fields::{parse_field_names_for_stats_func, FieldSelector};
use super::{StatsFunc, StatsProcessor};

/// Parsed `min(...)` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsMin {
    fields: Arc<FieldSelector>,
}

impl StatsMin {
    /// `min` over the given selector
    pub fn new(fields: FieldSelector) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }

    /// Parse the argument list following `min`
    pub fn parse(args: &str) -> Result<Self, ParseError> {
        parse_field_names_for_stats_func(args, Extreme::Min.name()).map(Self::new)
    }
}

impl fmt::Display for StatsMin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min({})", self.fields)
    }
}

impl StatsFunc for StatsMin {
    fn name(&self) -> &'static str {
        Extreme::Min.name()
    }

    fn fields(&self) -> &FieldSelector {
        &self.fields
    }

    fn new_processor(&self) -> (Box<dyn StatsProcessor>, usize) {
        let processor = ExtremeProcessor::new(Extreme::Min, Arc::clone(&self.fields));
        (
            Box::new(processor),
            std::mem::size_of::<ExtremeProcessor>(),
        )
    }
}
