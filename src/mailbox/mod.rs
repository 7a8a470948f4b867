//! The bounded mailbox a highway drains (spec §4.2).
//!
//! A [`Mailbox<T>`] is one shared [`Arena`] (spec §4.1: "two stacks share
//! the same arena") plus three [`StackHead`]s over it — `pending`,
//! `work_queue`, `free` — and two semaphores: `message_semaphore`
//! (signaled once per send, never piling up beyond one outstanding
//! permit) and `free_holder_semaphore` (signaled whenever a holder
//! returns to the free list, waking a producer blocked in
//! [`Mailbox::send_may_blocked`]).
//!
//! `pending` absorbs sends; a consumer moves its contents onto
//! `work_queue` in one swap-and-relink pass ([`StackHead::move_to`]),
//! which is what turns the LIFO push order back into the FIFO order
//! producers sent in (spec §4.2's "reversal during drain preserves
//! per-producer causal order"). A holder popped off `work_queue` by
//! [`Mailbox::drain`] stays allocated — out of `free` — until the caller
//! invokes whatever it holds and returns it via [`Mailbox::free`] (spec
//! §4.3 step 2: "free the holder" happens after the task runs, not
//! before).
//!
//! Grounded on `examples/original_source/include/thread_highways/
//! mailboxes/mail_box_aba_safe.h`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::lockfree::{Arena, CellIndex, StackHead};
use crate::semaphore::{CondvarSemaphore, Semaphore, WaitOutcome};

/// A holder drained from the mailbox but not yet freed (spec §3
/// `Holder<T>`). The caller owns `value` for as long as it needs it, then
/// returns the slot with [`Mailbox::free`].
pub struct Holder<T> {
    index: CellIndex,
    pub value: T,
}

impl<T> Holder<T> {
    /// The index to hand back to [`Mailbox::free`] once `value` has been
    /// consumed.
    pub fn index(&self) -> CellIndex {
        self.index
    }
}

/// A thread-safe, bounded FIFO for moving `T` from producers to the
/// highway worker that drains it. Producers never block the consumer and
/// vice versa; the only blocking is a producer waiting for a free holder,
/// or a consumer waiting for the next message.
pub struct Mailbox<T> {
    arena: Arena<T>,
    pending: StackHead,
    work_queue: StackHead,
    free: StackHead,
    message_semaphore: Arc<dyn Semaphore>,
    free_holder_semaphore: Arc<dyn Semaphore>,
    keep_execution: AtomicBool,
}

impl<T> Mailbox<T> {
    pub fn new(capacity: u32) -> Self {
        Self::with_semaphores(
            capacity,
            Arc::new(CondvarSemaphore::new()),
            Arc::new(CondvarSemaphore::new()),
        )
    }

    pub fn with_semaphores(
        capacity: u32,
        message_semaphore: Arc<dyn Semaphore>,
        free_holder_semaphore: Arc<dyn Semaphore>,
    ) -> Self {
        Self {
            arena: Arena::new(capacity),
            pending: StackHead::new(),
            work_queue: StackHead::new(),
            free: StackHead::new(),
            message_semaphore,
            free_holder_semaphore,
            keep_execution: AtomicBool::new(true),
        }
    }

    fn allocate_holder(&self) -> Option<CellIndex> {
        self.free.pop(&self.arena).or_else(|| self.arena.bump_allocate())
    }

    /// Returns a holder's slot to the free list (spec §4.2's `free`
    /// consumer operation), waking any producer parked in
    /// [`Mailbox::send_may_blocked`].
    pub fn free(&self, index: CellIndex) {
        self.free.push(&self.arena, index);
        self.free_holder_semaphore.signal();
    }

    /// Sends `value`, returning `false` instead of blocking if every
    /// holder is in use (spec §4.2: "can ignore if holders run out").
    pub fn send_may_fail(&self, value: T) -> bool {
        let Some(idx) = self.allocate_holder() else {
            return false;
        };
        self.arena.set_value(idx, value);
        self.pending.push(&self.arena, idx);
        self.message_semaphore.signal_keep_one();
        true
    }

    /// Sends `value`, blocking on `free_holder_semaphore` until a holder
    /// is available. Returns `false` without sending if the mailbox is
    /// destroyed while waiting.
    pub fn send_may_blocked(&self, value: T) -> bool {
        let idx = loop {
            if let Some(idx) = self.allocate_holder() {
                break Some(idx);
            }
            self.free_holder_semaphore.wait();
            if !self.keep_execution.load(Ordering::Relaxed) {
                break None;
            }
        };
        let Some(idx) = idx else { return false };
        self.arena.set_value(idx, value);
        self.pending.push(&self.arena, idx);
        self.message_semaphore.signal_keep_one();
        true
    }

    /// Relinks every holder currently on `pending` onto `work_queue` in
    /// one pass ([`StackHead::move_to`]), restoring producer send order.
    fn move_to_work_queue(&self) {
        self.pending.move_to(&self.arena, &self.work_queue);
    }

    /// Pops the next message, waiting on `message_semaphore` and
    /// refilling `work_queue` from `pending` as needed. Frees the holder
    /// before returning. Returns `None` once [`Mailbox::destroy`] has
    /// been called and no messages remain.
    pub fn recv(&self) -> Option<T> {
        loop {
            if let Some(idx) = self.work_queue.pop(&self.arena) {
                let value = self.arena.take_value(idx).expect("work queue holder had no value");
                self.free(idx);
                return Some(value);
            }
            if !self.keep_execution.load(Ordering::Acquire) {
                return None;
            }
            if self.pending.empty() {
                if matches!(self.message_semaphore.wait(), WaitOutcome::Destroyed) {
                    return None;
                }
            }
            self.move_to_work_queue();
        }
    }

    /// Like [`Mailbox::recv`], but never blocks: returns `None`
    /// immediately if no message is ready.
    pub fn try_recv(&self) -> Option<T> {
        if let Some(idx) = self.work_queue.pop(&self.arena) {
            let value = self.arena.take_value(idx).expect("work queue holder had no value");
            self.free(idx);
            return Some(value);
        }
        self.move_to_work_queue();
        let idx = self.work_queue.pop(&self.arena)?;
        let value = self.arena.take_value(idx).expect("work queue holder had no value");
        self.free(idx);
        Some(value)
    }

    /// Waits up to `max_wait` for at least one pending message (skipping
    /// the wait if one is already there), then drains every message
    /// currently available into a `Vec`, oldest first. Each returned
    /// [`Holder`] keeps its slot allocated until the caller returns it
    /// through [`Mailbox::free`] — draining does not by itself free
    /// anything (spec §4.3 step 2: free happens after invocation).
    pub fn drain(&self, max_wait: Duration) -> Vec<Holder<T>> {
        if self.pending.empty() {
            self.message_semaphore.wait_for(max_wait);
        }
        self.move_to_work_queue();
        let mut out = Vec::new();
        while let Some(idx) = self.work_queue.pop(&self.arena) {
            let value = self.arena.take_value(idx).expect("work queue holder had no value");
            out.push(Holder { index: idx, value });
        }
        out
    }

    /// `true` if both `pending` and `work_queue` are empty. Holders
    /// drained but not yet freed (in-flight tasks) are not tracked by
    /// either stack, so this does not by itself mean no task is running.
    pub fn is_idle(&self) -> bool {
        self.pending.empty() && self.work_queue.empty()
    }

    /// Stops accepting new blocked sends and wakes every thread parked in
    /// `recv`/`send_may_blocked`. Already-pending messages remain
    /// retrievable via `recv`/`try_recv` until drained.
    pub fn destroy(&self) {
        self.keep_execution.store(false, Ordering::Release);
        self.message_semaphore.destroy();
        self.free_holder_semaphore.destroy();
    }
}
