//! Pooled scratch buffers for value rendering
//!
//! Rendering an encoded value to text needs a temporary buffer. Allocating
//! one per value on the whole-block path would dominate the cost of the
//! update, so buffers are borrowed from a [`ScratchPool`] and handed back
//! when the [`ScratchBuffer`] guard is dropped. Release happens in `Drop`,
//! which runs on every exit path including unwinding.
//!
//! # Example
//!
//! ```rust
//! use kuba_logstats::scratch::ScratchPool;
//!
//! let pool = ScratchPool::new(4, 1024);
//! {
//!     let mut buf = pool.get();
//!     buf.push_str("10.0.0.1");
//!     assert_eq!(buf.as_str(), "10.0.0.1");
//! }
//! assert_eq!(pool.stats().outstanding(), 0);
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::config::ScratchConfig;

lazy_static! {
    /// Process-wide pool used by the stats processors
    static ref GLOBAL_POOL: ScratchPool = ScratchPool::from_config(&ScratchConfig::default());
}

/// Shared scratch pool used by the stats processors
pub fn global() -> &'static ScratchPool {
    &GLOBAL_POOL
}

// ============================================================================
// Scratch Pool
// ============================================================================

/// Bounded pool of reusable `String` buffers
#[derive(Debug)]
pub struct ScratchPool {
    /// Idle buffers ready for reuse
    free: Mutex<Vec<String>>,

    /// Maximum number of idle buffers kept
    max_buffers: usize,

    /// Buffers that grew past this capacity are dropped on release
    max_retained_capacity: usize,

    acquired: AtomicU64,
    released: AtomicU64,
}

impl ScratchPool {
    /// Create a pool keeping at most `max_buffers` idle buffers of at most
    /// `max_retained_capacity` bytes each
    pub fn new(max_buffers: usize, max_retained_capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_buffers)),
            max_buffers,
            max_retained_capacity,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Create a pool from configuration
    pub fn from_config(config: &ScratchConfig) -> Self {
        Self::new(config.max_buffers, config.max_retained_capacity)
    }

    /// Borrow an empty buffer until the guard is dropped
    pub fn get(&self) -> ScratchBuffer<'_> {
        let buf = self.free.lock().pop().unwrap_or_default();
        self.acquired.fetch_add(1, Ordering::Relaxed);
        ScratchBuffer { buf, pool: self }
    }

    fn put(&self, mut buf: String) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if buf.capacity() > self.max_retained_capacity {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_buffers {
            free.push(buf);
        }
    }

    /// Number of idle buffers currently held
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Acquisition counters
    pub fn stats(&self) -> ScratchStats {
        ScratchStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::from_config(&ScratchConfig::default())
    }
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchStats {
    /// Buffers handed out
    pub acquired: u64,
    /// Buffers returned
    pub released: u64,
}

impl ScratchStats {
    /// Buffers currently checked out
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

// ============================================================================
// Scratch Buffer Guard
// ============================================================================

/// A pooled buffer, returned to its pool on drop
///
/// The buffer always starts empty. Contents must be copied out before the
/// guard goes away.
#[derive(Debug)]
pub struct ScratchBuffer<'a> {
    buf: String,
    pool: &'a ScratchPool,
}

impl Deref for ScratchBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}
