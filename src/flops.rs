//! Floating-point operation accounting.
//!
//! Geometry and assembly routines report the number of floating-point operations they perform.
//! The counts are purely for performance observability and never influence results.
use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};

static FLOP_COUNT: AtomicU64 = AtomicU64::new(0);

/// Records `count` floating-point operations performed by `operation`.
pub fn log_flops(operation: &'static str, count: usize) {
    FLOP_COUNT.fetch_add(count as u64, Ordering::Relaxed);
    trace!("{}: {} flops", operation, count);
}

/// Total number of floating-point operations recorded since the last reset.
pub fn flop_count() -> u64 {
    FLOP_COUNT.load(Ordering::Relaxed)
}

/// Resets the counter and returns the count accumulated until now.
pub fn reset_flop_count() -> u64 {
    FLOP_COUNT.swap(0, Ordering::Relaxed)
}
