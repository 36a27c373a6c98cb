//! Allocation accounting for owned strings and variable-array buffers.
//!
//! The original system tracks this by hand (`alloc`/`free` calls paired at
//! every call site); in safe Rust, `Drop` does that pairing automatically.
//! This module exists to make free safety — after `free(v, T)`, any
//! recorded transitive string pointer and any var-array buffer held by
//! `v` has been released exactly once — something a test can actually
//! observe, rather than something we simply trust the borrow checker for.
//!
//! Grounded in `crates/core/src/memory_stats.rs`'s atomic-counter registry,
//! simplified from a per-thread slot table to a single global pair of
//! counters: the concurrency model here is single-threaded per call, so
//! there is no cross-thread contention to shard away from.

use std::sync::atomic::{AtomicI64, Ordering};

static LIVE_STRINGS: AtomicI64 = AtomicI64::new(0);
static LIVE_BUFFERS: AtomicI64 = AtomicI64::new(0);

pub fn record_string_alloc() {
    LIVE_STRINGS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_string_dealloc() {
    LIVE_STRINGS.fetch_sub(1, Ordering::Relaxed);
}

pub fn record_buffer_alloc() {
    LIVE_BUFFERS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_buffer_dealloc() {
    LIVE_BUFFERS.fetch_sub(1, Ordering::Relaxed);
}

/// Number of owned (non-null) strings currently live across every
/// `CompositeValue` this process has built and not yet dropped.
pub fn live_strings() -> i64 {
    LIVE_STRINGS.load(Ordering::Relaxed)
}

/// Number of variable-array buffers currently live.
pub fn live_buffers() -> i64 {
    LIVE_BUFFERS.load(Ordering::Relaxed)
}
