//! The monotonic clock collaborator contract (spec §6).

use std::time::{Duration, Instant};

/// A monotonic, millisecond-resolution-or-better clock. The highway worker
/// loop and scheduler only ever read `now()`; they never construct wall
/// time, so a deterministic fake is trivial to supply in tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The production clock, backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock whose `now()` is advanced manually, for deterministic scheduler
/// and monitor tests.
#[derive(Debug)]
pub struct FakeClock {
    origin: Instant,
    offset: std::sync::atomic::AtomicU64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset
            .fetch_add(by.as_nanos() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let nanos = self.offset.load(std::sync::atomic::Ordering::SeqCst);
        self.origin + Duration::from_nanos(nanos)
    }
}
