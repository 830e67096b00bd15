//! Sharded stats execution
//!
//! Blocks are split into shards of `shard_size` blocks. Each shard is folded
//! by its own processor on a rayon worker, and the partial states are then
//! merged pairwise in whatever order rayon's reduction tree produces. The
//! result equals a sequential fold because merge is commutative and
//! associative.
//!
//! # Example
//!
//! ```rust
//! use kuba_logstats::block::{BlockColumn, BlockResult};
//! use kuba_logstats::config::StatsConfig;
//! use kuba_logstats::stats::{parse_stats_func, ParallelStats};
//!
//! let blocks: Vec<BlockResult> = ["q", "c", "x"]
//!     .iter()
//!     .map(|v| BlockResult::new(1).with_column(BlockColumn::constant("x", *v)).unwrap())
//!     .collect();
//!
//! let config = StatsConfig { num_workers: 2, shard_size: 1, parallel_threshold: 0 };
//! let engine = ParallelStats::new(config).unwrap();
//! let func = parse_stats_func("min(x)").unwrap();
//!
//! let outcome = engine.compute(func.as_ref(), &blocks);
//! assert_eq!(outcome.value, "c");
//! assert_eq!(outcome.shards, 3);
//! ```

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::block::BlockResult;
use crate::config::StatsConfig;
use crate::error::{Error, Result};

use super::{StatsFunc, StatsProcessor};

/// Outcome of a sharded computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsOutcome {
    /// Finalized result text
    pub value: String,
    /// Number of partial states that were merged
    pub shards: usize,
    /// Blocks consumed
    pub blocks: usize,
    /// Rows consumed
    pub rows: usize,
    /// Bytes held by all partial states right before merging
    pub state_bytes: usize,
}

/// Partial state of one shard
struct Partial {
    processor: Box<dyn StatsProcessor>,
    state_bytes: usize,
    shards: usize,
}

/// Runs a stats function over many blocks, sharding across workers
pub struct ParallelStats {
    config: StatsConfig,
    pool: ThreadPool,
}

impl ParallelStats {
    /// Create an executor with its own worker pool
    pub fn new(config: StatsConfig) -> Result<Self> {
        if config.num_workers == 0 || config.shard_size == 0 {
            return Err(Error::Configuration(
                "Worker count and shard size must be > 0".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .thread_name(|i| format!("logstats-worker-{}", i))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to start worker pool: {}", e)))?;
        Ok(Self { config, pool })
    }

    /// Execution settings
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Fold every block and return the finalized result
    pub fn compute(&self, func: &dyn StatsFunc, blocks: &[BlockResult]) -> StatsOutcome {
        let rows = blocks.iter().map(BlockResult::row_count).sum();

        let sequential = blocks.len() < self.config.parallel_threshold
            || self.config.num_workers == 1
            || blocks.len() <= self.config.shard_size;

        let partial = if sequential {
            debug!(func = %func, blocks = blocks.len(), rows, "folding blocks sequentially");
            fold_shard(func, blocks)
        } else {
            debug!(
                func = %func,
                blocks = blocks.len(),
                rows,
                shard_size = self.config.shard_size,
                workers = self.config.num_workers,
                "folding blocks in parallel shards"
            );
            self.pool.install(|| {
                blocks
                    .par_chunks(self.config.shard_size)
                    .map(|shard| fold_shard(func, shard))
                    .reduce_with(merge_partials)
                    .unwrap_or_else(|| fold_shard(func, &[]))
            })
        };

        let value = partial.processor.finalize();
        debug!(func = %func, shards = partial.shards, result = %value, "stats computed");

        StatsOutcome {
            value,
            shards: partial.shards,
            blocks: blocks.len(),
            rows,
            state_bytes: partial.state_bytes,
        }
    }
}

fn fold_shard(func: &dyn StatsFunc, shard: &[BlockResult]) -> Partial {
    let (mut processor, footprint) = func.new_processor();
    let mut delta = 0isize;
    for block in shard {
        delta += processor.update_for_all_rows(block);
    }
    Partial {
        processor,
        state_bytes: footprint.saturating_add_signed(delta),
        shards: 1,
    }
}

fn merge_partials(mut left: Partial, right: Partial) -> Partial {
    left.processor.merge(right.processor.as_ref());
    left.state_bytes += right.state_bytes;
    left.shards += right.shards;
    left
}
