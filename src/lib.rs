//! Kuba LogStats - statistical aggregation over columnar log blocks
//!
//! This library computes stats functions (`min`, `max`) over query blocks
//! whose columns are stored in type-specific encodings:
//! - Typed column views that avoid decoding whole columns
//! - Whole-block fast paths using dictionary entries and cached block stats
//! - Mergeable per-context state for sharded and parallel execution
//! - Pooled scratch buffers for rendering encoded values to text

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod error;
pub mod render;
pub mod scratch;
pub mod stats;

/// Configuration management with TOML support
pub mod config;

// Re-export main types
pub use block::{BlockBuilder, BlockColumn, BlockResult};
pub use config::Config;
pub use error::{Error, ParseError, Result};
pub use stats::{parse_stats_func, ParallelStats, StatsFunc, StatsProcessor};
