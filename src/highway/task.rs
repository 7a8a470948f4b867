//! [`Task`] and [`ScheduledTask`]: the two invocable kinds a highway's
//! mailbox and scheduler carry (spec §3).

use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::{Arc, Weak};
use std::time::Instant;

use crate::error::SourceLocation;

/// A task's liveness marker. A producer that wants its task silently
/// dropped if it (or the thing it closes over) is gone by the time the
/// worker reaches it keeps one of these alive and hands the worker a
/// [`Protector`] (spec §3: "protector (weak reference)").
pub type Liveness = Arc<()>;

/// A weak handle the worker tries to upgrade before invoking a task.
/// `None` means the task has no protector and always runs.
pub type Protector = Weak<()>;

fn is_alive(protector: &Option<Protector>) -> bool {
    match protector {
        Some(p) => p.upgrade().is_some(),
        None => true,
    }
}

/// A one-shot unit of work carried by a mailbox. Runs at most once: the
/// worker either invokes it or drops it unexecuted if its protector
/// cannot be upgraded (spec §3 invariant).
pub struct Task {
    location: SourceLocation,
    protector: Option<Protector>,
    body: Box<dyn FnOnce(&AtomicBool, &AtomicU32) + Send>,
}

impl Task {
    pub fn new(
        location: SourceLocation,
        body: impl FnOnce(&AtomicBool, &AtomicU32) + Send + 'static,
    ) -> Self {
        Self {
            location,
            protector: None,
            body: Box::new(body),
        }
    }

    pub fn with_protector(
        location: SourceLocation,
        protector: Protector,
        body: impl FnOnce(&AtomicBool, &AtomicU32) + Send + 'static,
    ) -> Self {
        Self {
            location,
            protector: Some(protector),
            body: Box::new(body),
        }
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// `false` if this task carries a protector that can no longer be
    /// upgraded; such a task must be discarded, not invoked.
    pub fn is_alive(&self) -> bool {
        is_alive(&self.protector)
    }

    pub fn invoke(self, keep_running: &AtomicBool, run_id: &AtomicU32) {
        (self.body)(keep_running, run_id)
    }
}

/// Mutable context a [`ScheduledTask`]'s closure uses to request another
/// run (spec §3: "a reschedule flag the closure may set").
#[derive(Debug, Default)]
pub struct Schedule {
    reschedule_at: Option<Instant>,
}

impl Schedule {
    pub fn request_reschedule(&mut self, at: Instant) {
        self.reschedule_at = Some(at);
    }

    pub fn requested(&self) -> Option<Instant> {
        self.reschedule_at
    }
}

/// A task that re-enters the scheduler at a deadline and may ask, via
/// [`Schedule::request_reschedule`], to run again later.
pub struct ScheduledTask {
    pub(crate) location: SourceLocation,
    pub(crate) protector: Option<Protector>,
    pub(crate) next_deadline: Instant,
    body: Box<dyn FnMut(&AtomicBool, &AtomicU32, &mut Schedule) + Send>,
}

impl ScheduledTask {
    pub fn new(
        location: SourceLocation,
        next_deadline: Instant,
        body: impl FnMut(&AtomicBool, &AtomicU32, &mut Schedule) + Send + 'static,
    ) -> Self {
        Self {
            location,
            protector: None,
            next_deadline,
            body: Box::new(body),
        }
    }

    pub fn with_protector(
        location: SourceLocation,
        protector: Protector,
        next_deadline: Instant,
        body: impl FnMut(&AtomicBool, &AtomicU32, &mut Schedule) + Send + 'static,
    ) -> Self {
        Self {
            location,
            protector: Some(protector),
            next_deadline,
            body: Box::new(body),
        }
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn is_alive(&self) -> bool {
        is_alive(&self.protector)
    }

    pub(crate) fn invoke(&mut self, keep_running: &AtomicBool, run_id: &AtomicU32, schedule: &mut Schedule) {
        (self.body)(keep_running, run_id, schedule)
    }
}
