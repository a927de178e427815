//! Common utilities and types module.
// Shared small types used across the collector and materializers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a running
/// operation. Checked at I/O boundaries only; a cancelled disk write leaves
/// partially-written state as-is, a cancelled archive build discards its
/// buffer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Resolve a caller-supplied worker count: `0` means "one per CPU".
pub(crate) fn effective_workers(requested: usize) -> usize {
    let n = if requested == 0 { num_cpus::get() } else { requested };
    n.max(1)
}
