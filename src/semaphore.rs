//! The counting-semaphore collaborator contract (spec §6).
//!
//! The core never talks to the OS directly; it talks to this trait, so a
//! test can swap in a semaphore that never blocks. [`CondvarSemaphore`] is
//! the one production implementation the crate ships, built on
//! `std::sync::{Mutex, Condvar}` the way the teacher crate's concurrency
//! primitives (e.g. `data_plane/pipeline/pipeline.rs`'s `HotSwapPipeline`)
//! lean on `std::sync::atomic` rather than a third-party lock crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Outcome of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
    /// The semaphore was destroyed while this call was waiting (or had
    /// already been destroyed before the call began).
    Destroyed,
}

/// A counting semaphore with timed wait and "sticky" wake semantics.
pub trait Semaphore: Send + Sync + 'static {
    fn wait(&self) -> WaitOutcome;
    fn wait_for(&self, timeout: Duration) -> WaitOutcome;
    fn signal(&self);
    /// Signals only if no permit is currently outstanding, so waking a
    /// consumer never lets unconsumed permits pile up (spec §4.2:
    /// "never accumulates more than one spurious unit beyond what's
    /// needed to wake the consumer").
    fn signal_keep_one(&self);
    /// Wakes every thread parked in `wait`/`wait_for` right now.
    fn signal_to_all(&self);
    /// Wakes all waiters and makes every subsequent wait return
    /// immediately with [`WaitOutcome::Destroyed`].
    fn destroy(&self);
}

#[derive(Debug)]
struct State {
    count: u64,
    destroyed: bool,
}

/// Production [`Semaphore`] implementation.
#[derive(Debug)]
pub struct CondvarSemaphore {
    state: Mutex<State>,
    condvar: Condvar,
    waiters: AtomicUsize,
}

impl CondvarSemaphore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                count: 0,
                destroyed: false,
            }),
            condvar: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }
}

impl Default for CondvarSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl Semaphore for CondvarSemaphore {
    fn wait(&self) -> WaitOutcome {
        let mut guard = self.state.lock().unwrap();
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let outcome = loop {
            if guard.destroyed {
                break WaitOutcome::Destroyed;
            }
            if guard.count > 0 {
                guard.count -= 1;
                break WaitOutcome::Signaled;
            }
            guard = self.condvar.wait(guard).unwrap();
        };
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn wait_for(&self, timeout: Duration) -> WaitOutcome {
        let mut guard = self.state.lock().unwrap();
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let mut remaining = timeout;
        let outcome = loop {
            if guard.destroyed {
                break WaitOutcome::Destroyed;
            }
            if guard.count > 0 {
                guard.count -= 1;
                break WaitOutcome::Signaled;
            }
            let started = std::time::Instant::now();
            let (next_guard, timeout_result) =
                self.condvar.wait_timeout(guard, remaining).unwrap();
            guard = next_guard;
            if timeout_result.timed_out() {
                if guard.destroyed {
                    break WaitOutcome::Destroyed;
                }
                if guard.count > 0 {
                    guard.count -= 1;
                    break WaitOutcome::Signaled;
                }
                break WaitOutcome::TimedOut;
            }
            remaining = remaining.saturating_sub(started.elapsed());
        };
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn signal(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.destroyed {
            return;
        }
        guard.count += 1;
        self.condvar.notify_one();
    }

    fn signal_keep_one(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.destroyed {
            return;
        }
        if guard.count == 0 {
            guard.count = 1;
        }
        self.condvar.notify_one();
    }

    fn signal_to_all(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.destroyed {
            return;
        }
        let waiting = self.waiters.load(Ordering::SeqCst) as u64;
        guard.count = guard.count.max(waiting);
        self.condvar.notify_all();
    }

    fn destroy(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.destroyed = true;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn signal_then_wait_does_not_block() {
        let sem = CondvarSemaphore::new();
        sem.signal();
        assert_eq!(sem.wait(), WaitOutcome::Signaled);
    }

    #[test]
    fn wait_for_times_out_without_signal() {
        let sem = CondvarSemaphore::new();
        assert_eq!(sem.wait_for(Duration::from_millis(10)), WaitOutcome::TimedOut);
    }

    #[test]
    fn signal_keep_one_never_piles_up() {
        let sem = CondvarSemaphore::new();
        sem.signal_keep_one();
        sem.signal_keep_one();
        sem.signal_keep_one();
        assert_eq!(sem.wait_for(Duration::from_millis(10)), WaitOutcome::Signaled);
        assert_eq!(sem.wait_for(Duration::from_millis(10)), WaitOutcome::TimedOut);
    }

    #[test]
    fn destroy_wakes_blocked_waiter() {
        let sem = Arc::new(CondvarSemaphore::new());
        let waiter = {
            let sem = sem.clone();
            thread::spawn(move || sem.wait())
        };
        thread::sleep(Duration::from_millis(20));
        sem.destroy();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Destroyed);
        assert_eq!(sem.wait(), WaitOutcome::Destroyed);
    }
}
