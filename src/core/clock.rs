//! Wall-clock abstraction so default query windows are testable.

use parking_lot::RwLock;

/// Source of "now" in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Current time, truncated to whole seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Real UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock for tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<i64>,
}

impl ManualClock {
    /// Clock frozen at `epoch_secs` until moved.
    pub fn at(epoch_secs: i64) -> Self {
        Self {
            now: RwLock::new(epoch_secs),
        }
    }

    /// Move forward (or back, for negative `secs`).
    pub fn advance(&self, secs: i64) {
        *self.now.write() += secs;
    }

    /// Jump to an absolute time.
    pub fn set(&self, epoch_secs: i64) {
        *self.now.write() = epoch_secs;
    }
}

impl Clock for ManualClock {
    fn now_epoch_secs(&self) -> i64 {
        *self.now.read()
    }
}
