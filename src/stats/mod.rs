//! Stats functions - per-block aggregate state machines
//!
//! A [`StatsFunc`] is the parsed form of a call such as `min(a, b)`. It is
//! immutable and shared by every [`StatsProcessor`] created from it. Each
//! computation context (worker thread, shard, storage node) owns one
//! processor and drives it with block or row updates; sibling processors
//! are combined with [`StatsProcessor::merge`] and the survivor is
//! finalized into the result text.
//!
//! ```text
//!   block ──► update_for_all_rows ─┐
//!   block ──► update_for_row × n  ─┼──► processor ──► merge ◄── sibling
//!                                  │                    │
//!                                  └────────────────────┴──► finalize ──► "text"
//! ```
//!
//! Processors hold no locks and never block. Parallelism comes from giving
//! each context its own processor and merging afterwards, which is sound
//! because merge is commutative and associative.

pub mod extreme;
pub mod fields;
pub mod max;
pub mod min;
pub mod parallel;

pub use extreme::{Extreme, ExtremeProcessor};
pub use fields::{parse_field_names_for_stats_func, FieldSelector, WILDCARD};
pub use max::StatsMax;
pub use min::StatsMin;
pub use parallel::{ParallelStats, StatsOutcome};

use std::any::Any;
use std::fmt;

use nom::{
    bytes::complete::take_while1, character::complete::multispace0, sequence::preceded, IResult,
    Parser,
};

use crate::block::BlockResult;
use crate::error::ParseError;

/// Result text of a stats function that saw no values
pub const NO_VALUE: &str = "NaN";

/// A parsed stats function call
///
/// `Display` renders the call back in query syntax, e.g. `min(a, b)`.
pub trait StatsFunc: fmt::Display + fmt::Debug + Send + Sync {
    /// Function name as written in queries
    fn name(&self) -> &'static str;

    /// Fields the function reads
    fn fields(&self) -> &FieldSelector;

    /// Field names the scan layer must provide
    fn needed_fields(&self) -> Vec<String> {
        self.fields().needed_fields()
    }

    /// Fresh processor in its empty state, plus its initial footprint in bytes
    fn new_processor(&self) -> (Box<dyn StatsProcessor>, usize);
}

/// Running state of one stats function in one computation context
pub trait StatsProcessor: fmt::Debug + Send {
    /// Fold every row of `block`; returns the change in retained bytes
    fn update_for_all_rows(&mut self, block: &BlockResult) -> isize;

    /// Fold row `row` of `block`; returns the change in retained bytes
    fn update_for_row(&mut self, block: &BlockResult, row: usize) -> isize;

    /// Fold the state of a sibling processor of the same function
    fn merge(&mut self, other: &dyn StatsProcessor);

    /// Result text
    fn finalize(&self) -> String;

    /// Downcasting hook for [`merge`](Self::merge)
    fn as_any(&self) -> &dyn Any;
}

/// Parse a stats function call such as `min(a, b)` or `max(*)`
///
/// # Example
///
/// ```rust
/// use kuba_logstats::stats::parse_stats_func;
///
/// let func = parse_stats_func("min(duration, status)").unwrap();
/// assert_eq!(func.to_string(), "min(duration, status)");
/// assert!(parse_stats_func("median(x)").is_err());
/// ```
pub fn parse_stats_func(input: &str) -> Result<Box<dyn StatsFunc>, ParseError> {
    let (args, name) = func_name(input)
        .map_err(|_| ParseError::new("stats", "missing stats function name", input))?;

    match name.to_ascii_lowercase().as_str() {
        "min" => Ok(Box::new(StatsMin::parse(args)?)),
        "max" => Ok(Box::new(StatsMax::parse(args)?)),
        other => Err(ParseError::new(other, "unknown stats function", input)),
    }
}

fn func_name(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
    .parse(input)
}

/// Fold a sequence of sibling processors into the first one
///
/// Returns `None` for an empty sequence.
pub fn merge_processors<I>(processors: I) -> Option<Box<dyn StatsProcessor>>
where
    I: IntoIterator<Item = Box<dyn StatsProcessor>>,
{
    let mut iter = processors.into_iter();
    let mut acc = iter.next()?;
    for p in iter {
        acc.merge(p.as_ref());
    }
    Some(acc)
}
