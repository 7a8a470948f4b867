//! The deadline-ordered scheduler a highway worker advances once per
//! loop iteration (spec §4.4).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU32};
use std::time::Instant;

use super::task::{Schedule, ScheduledTask};

struct HeapEntry {
    deadline: Instant,
    seq: u64,
    task: ScheduledTask,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // BinaryHeap is a max-heap; reversing deadline (and the tie-break
    // seq) turns it into a min-heap on (deadline, seq ascending).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A min-heap of [`ScheduledTask`]s ordered by next-launch deadline, ties
/// broken by insertion order (spec §4.4).
#[derive(Default)]
pub struct Scheduler {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn add(&mut self, task: ScheduledTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = task.next_deadline;
        self.heap.push(HeapEntry { deadline, seq, task });
    }

    pub fn peek_next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deadline)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Resolves the open question left by the source's deprecated,
    /// incomplete `Scheduler::execute`: pops every task due at or before
    /// `now`, runs each (dropping ones whose protector died first),
    /// reinserts any that requested a reschedule, and returns the next
    /// deadline remaining in the heap.
    pub fn drain_due_and_reschedule(
        &mut self,
        now: Instant,
        keep_running: &AtomicBool,
        run_id: &AtomicU32,
    ) -> Option<Instant> {
        let mut due = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > now {
                break;
            }
            due.push(self.heap.pop().unwrap().task);
        }
        for mut task in due {
            if !task.is_alive() {
                continue;
            }
            let mut schedule = Schedule::default();
            task.invoke(keep_running, run_id, &mut schedule);
            if let Some(at) = schedule.requested() {
                task.next_deadline = at;
                self.add(task);
            }
        }
        self.peek_next_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn never_running() -> (AtomicBool, AtomicU32) {
        (AtomicBool::new(true), AtomicU32::new(0))
    }

    #[test]
    fn due_tasks_run_in_deadline_order_ties_by_insertion() {
        let (keep_running, run_id) = never_running();
        let mut scheduler = Scheduler::new();
        let order = arc_mutex_vec();
        let base = Instant::now();
        for i in 0..3 {
            let order = order.clone();
            scheduler.add(ScheduledTask::new(
                crate::error::SourceLocation::new(file!(), line!()),
                base,
                move |_, _, _| order.lock().unwrap().push(i),
            ));
        }
        scheduler.drain_due_and_reschedule(base + Duration::from_millis(1), &keep_running, &run_id);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn reschedule_request_reinserts_the_task() {
        let (keep_running, run_id) = never_running();
        let mut scheduler = Scheduler::new();
        let base = Instant::now();
        let runs = arc_mutex_vec();
        {
            let runs = runs.clone();
            scheduler.add(ScheduledTask::new(
                crate::error::SourceLocation::new(file!(), line!()),
                base,
                move |_, _, schedule| {
                    runs.lock().unwrap().push(1);
                    schedule.request_reschedule(base + Duration::from_millis(10));
                },
            ));
        }
        scheduler.drain_due_and_reschedule(base, &keep_running, &run_id);
        assert_eq!(runs.lock().unwrap().len(), 1);
        assert!(!scheduler.is_empty());
        scheduler.drain_due_and_reschedule(base + Duration::from_millis(10), &keep_running, &run_id);
        assert_eq!(runs.lock().unwrap().len(), 2);
    }

    #[test]
    fn a_task_whose_protector_died_is_dropped_without_running() {
        let (keep_running, run_id) = never_running();
        let mut scheduler = Scheduler::new();
        let base = Instant::now();
        let liveness = std::sync::Arc::new(());
        let protector = std::sync::Arc::downgrade(&liveness);
        drop(liveness);
        let ran = arc_mutex_vec();
        {
            let ran = ran.clone();
            scheduler.add(ScheduledTask::with_protector(
                crate::error::SourceLocation::new(file!(), line!()),
                protector,
                base,
                move |_, _, _| ran.lock().unwrap().push(1),
            ));
        }
        scheduler.drain_due_and_reschedule(base, &keep_running, &run_id);
        assert!(ran.lock().unwrap().is_empty());
    }

    fn arc_mutex_vec() -> std::sync::Arc<Mutex<Vec<i32>>> {
        std::sync::Arc::new(Mutex::new(Vec::new()))
    }
}
