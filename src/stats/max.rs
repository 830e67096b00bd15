//! `max(field, ...)` - largest value across the selected fields
//!
//! Mirror image of [`StatsMin`](super::StatsMin), using the same canonical
//! text ordering.

use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;

use super::extreme::{Extreme, ExtremeProcessor};
use super::fields::{parse_field_names_for_stats_func, FieldSelector};
use super::{StatsFunc, StatsProcessor};

/// Parsed `max(...)` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsMax {
    fields: Arc<FieldSelector>,
}

impl StatsMax {
    /// `max` over the given selector
    pub fn new(fields: FieldSelector) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }

    /// Parse the argument list following `max`
    pub fn parse(args: &str) -> Result<Self, ParseError> {
        parse_field_names_for_stats_func(args, Extreme::Max.name()).map(Self::new)
    }
}

impl fmt::Display for StatsMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max({})", self.fields)
    }
}

impl StatsFunc for StatsMax {
    fn name(&self) -> &'static str {
        Extreme::Max.name()
    }

    fn fields(&self) -> &FieldSelector {
        &self.fields
    }

    fn new_processor(&self) -> (Box<dyn StatsProcessor>, usize) {
        let processor = ExtremeProcessor::new(Extreme::Max, Arc::clone(&self.fields));
        (
            Box::new(processor),
            std::mem::size_of::<ExtremeProcessor>(),
        )
    }
}
