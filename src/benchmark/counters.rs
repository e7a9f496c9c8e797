//! Shared counter with a selectable visibility mode
//!
//! The counter is the ONLY shared mutable state the workers race on.
//! Its mode decides which of two independent guarantees a worker gets:
//! - visibility: a read sees the latest completed write of any worker
//! - atomicity: read, add one and store happen as one indivisible step
//!
//! `None` gives neither, `VisibleOnly` gives visibility only, and
//! `AtomicRmw` gives both. Lost updates remain possible in the first two.

use std::sync::atomic::{fence, AtomicU64, Ordering};

#[cfg(test)]
use std::sync::{Arc, Barrier};

use clap::ValueEnum;
use serde::Serialize;

/// Visibility/atomicity guarantee of a [`SharedCounter`]
#[derive(ValueEnum, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityMode {
    /// Relaxed loads and stores; a read may return an arbitrarily stale value
    #[default]
    None,
    /// Sequentially consistent loads and stores, fenced after every write
    VisibleOnly,
    /// Single fetch-and-add per increment
    AtomicRmw,
}

impl VisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityMode::None => "none",
            VisibilityMode::VisibleOnly => "visible-only",
            VisibilityMode::AtomicRmw => "atomic-rmw",
        }
    }

    /// Whether every run in this mode must produce a gap-free, duplicate-free trace
    pub fn is_linearizable(&self) -> bool {
        matches!(self, VisibilityMode::AtomicRmw)
    }
}

impl std::fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer cell shared by every worker of one run
///
/// Outside `AtomicRmw` the increment is three separately schedulable steps
/// (load, add, store). A preemption between the load and the store is the
/// window in which another worker's increment gets overwritten.
pub struct SharedCounter {
    value: AtomicU64,
    mode: VisibilityMode,
    /// Forces every worker to finish its load before any store proceeds
    #[cfg(test)]
    interleave: Option<Arc<Barrier>>,
}

impl SharedCounter {
    /// Create a counter starting at zero
    pub fn new(mode: VisibilityMode) -> Self {
        Self {
            value: AtomicU64::new(0),
            mode,
            #[cfg(test)]
            interleave: None,
        }
    }

    /// Create a counter whose split increments all wait on `barrier` between
    /// their load and their store
    #[cfg(test)]
    pub(crate) fn with_interleave_barrier(mode: VisibilityMode, barrier: Arc<Barrier>) -> Self {
        Self {
            interleave: Some(barrier),
            ..Self::new(mode)
        }
    }

    pub fn mode(&self) -> VisibilityMode {
        self.mode
    }

    /// Current stored value
    ///
    /// Under `None` there is no freshness guarantee. Under the other modes the
    /// load observes the most recently completed write.
    #[inline]
    pub fn read(&self) -> u64 {
        match self.mode {
            VisibilityMode::None => self.value.load(Ordering::Relaxed),
            VisibilityMode::VisibleOnly | VisibilityMode::AtomicRmw => {
                self.value.load(Ordering::SeqCst)
            }
        }
    }

    /// Add one to the counter
    ///
    /// Not indivisible unless the mode is `AtomicRmw`.
    #[inline]
    pub fn increment(&self) {
        match self.mode {
            VisibilityMode::None => {
                let current = self.value.load(Ordering::Relaxed);
                self.pause_before_store();
                self.value.store(current.wrapping_add(1), Ordering::Relaxed);
            }
            VisibilityMode::VisibleOnly => {
                let current = self.value.load(Ordering::SeqCst);
                self.pause_before_store();
                self.value.store(current.wrapping_add(1), Ordering::SeqCst);
                fence(Ordering::SeqCst);
            }
            VisibilityMode::AtomicRmw => {
                self.value.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// One worker's unit of work: observe the value, hand it to `record`, then
    /// increment
    ///
    /// Under `AtomicRmw` the observation is the value returned by the
    /// fetch-and-add itself, so no other worker can observe the same value.
    /// Under the other modes `record` runs between two unsynchronized steps.
    #[inline]
    pub fn observe_and_increment<F: FnOnce(u64)>(&self, record: F) {
        match self.mode {
            VisibilityMode::AtomicRmw => {
                let seen = self.value.fetch_add(1, Ordering::SeqCst);
                record(seen);
            }
            VisibilityMode::None | VisibilityMode::VisibleOnly => {
                let seen = self.read();
                record(seen);
                self.increment();
            }
        }
    }

    #[cfg(test)]
    #[inline]
    fn pause_before_store(&self) {
        if let Some(ref barrier) = self.interleave {
            barrier.wait();
        }
    }

    #[cfg(not(test))]
    #[inline(always)]
    fn pause_before_store(&self) {}
}

impl std::fmt::Debug for SharedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCounter")
            .field("value", &self.value.load(Ordering::Relaxed))
            .field("mode", &self.mode)
            .finish()
    }
}
