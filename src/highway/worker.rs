//! [`Highway`]: a bounded-mailbox task executor with one or more worker
//! threads, a deadline-ordered scheduler, and a liveness probe (spec
//! §4.3). Grounded on the teacher crate's `runtime::executor` module for
//! its worker-loop-plus-phase-flag shape, generalized to the concrete
//! mailbox/scheduler this spec names.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::{Exception, SourceLocation};
use crate::mailbox::Mailbox;
use crate::thread_handle::ThreadHandle;

use super::scheduler::Scheduler;
use super::task::{Protector, ScheduledTask, Task};

/// Highway worker lifecycle phase (spec §3 Highway entity, §4.3 worker
/// loop). `current_phase` plus `task_start_time` together form the
/// liveness probe [`Highway::self_check`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sleep,
    MailBoxMessage,
    FreeTimeCustomLogic,
    Stopped,
}

/// Routes a task-invocation panic, converted to an [`Exception`], or a
/// stuck-task report to wherever the application wants to observe it
/// (spec §7).
pub trait ExceptionHandler: Send + Sync + 'static {
    fn handle_exception(&self, exception: Exception);

    fn handle_stuck(&self, location: SourceLocation, elapsed: Duration) {
        tracing::warn!(
            file = location.file,
            line = location.line,
            elapsed_ms = elapsed.as_millis() as u64,
            "highway task exceeded max_task_execution_time"
        );
    }
}

/// The handler installed unless the caller overrides it: logs, then
/// resumes unwinding on the worker thread (spec §7: "the default handler
/// re-throws on the caller thread — causing termination").
pub struct DefaultExceptionHandler;

impl ExceptionHandler for DefaultExceptionHandler {
    fn handle_exception(&self, exception: Exception) {
        tracing::error!(
            file = exception.location().file,
            line = exception.location().line,
            %exception,
            "unhandled highway task exception"
        );
        std::panic::resume_unwind(Box::new(exception));
    }
}

/// Tunables for a [`Highway`] (spec §4.3 public surface plus §5's
/// resource model).
#[derive(Debug, Clone)]
pub struct HighwayConfig {
    /// Upper bound on live holders in the mailbox.
    pub capacity: u32,
    /// Past this, a still-running task is reported as stuck.
    pub max_task_execution_time: Duration,
    /// Ceiling on how long the worker sleeps with no scheduled deadline.
    pub idle_sleep_cap: Duration,
    /// Worker thread count; > 1 makes this a pool sharing one mailbox.
    pub worker_threads: usize,
}

impl Default for HighwayConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_task_execution_time: Duration::from_millis(100),
            idle_sleep_cap: Duration::from_millis(50),
            worker_threads: 1,
        }
    }
}

type FreeTimeLogic = Box<dyn FnMut(&AtomicBool, &AtomicU32) + Send>;

pub(crate) struct HighwayInner {
    mailbox: Mailbox<Task>,
    scheduler: Mutex<Scheduler>,
    run_id: AtomicU32,
    phase: Mutex<Phase>,
    task_start: Mutex<Option<(Instant, SourceLocation)>>,
    keep_running: AtomicBool,
    max_task_execution_time: Duration,
    idle_sleep_cap: Duration,
    exception_handler: Arc<dyn ExceptionHandler>,
    clock: Arc<dyn Clock>,
    worker_thread_ids: Mutex<HashSet<ThreadId>>,
    free_time_logic: Mutex<Option<FreeTimeLogic>>,
}

fn self_check_inner(inner: &HighwayInner) -> bool {
    if *inner.phase.lock().unwrap() == Phase::Sleep {
        return true;
    }
    let Some((started, location)) = *inner.task_start.lock().unwrap() else {
        return true;
    };
    let elapsed = inner.clock.now().saturating_duration_since(started);
    if elapsed > inner.max_task_execution_time {
        inner.exception_handler.handle_stuck(location, elapsed);
    }
    true
}

fn destroy_inner(inner: &HighwayInner) {
    inner.run_id.fetch_add(1, Ordering::AcqRel);
    inner.keep_running.store(false, Ordering::Release);
    inner.mailbox.destroy();
}

fn worker_loop(inner: Arc<HighwayInner>) {
    inner
        .worker_thread_ids
        .lock()
        .unwrap()
        .insert(std::thread::current().id());

    loop {
        *inner.phase.lock().unwrap() = Phase::Sleep;
        let next_deadline = inner.scheduler.lock().unwrap().peek_next_deadline();
        let wait = next_deadline
            .map(|d| d.saturating_duration_since(inner.clock.now()))
            .unwrap_or(inner.idle_sleep_cap)
            .min(inner.idle_sleep_cap);
        let drained = inner.mailbox.drain(wait);

        *inner.phase.lock().unwrap() = Phase::MailBoxMessage;
        for holder in drained {
            let index = holder.index();
            let task = holder.value;
            if !task.is_alive() {
                inner.mailbox.free(index);
                continue;
            }
            let location = task.location();
            *inner.task_start.lock().unwrap() = Some((inner.clock.now(), location));
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                task.invoke(&inner.keep_running, &inner.run_id);
            }));
            *inner.task_start.lock().unwrap() = None;
            inner.mailbox.free(index);
            *inner.phase.lock().unwrap() = Phase::MailBoxMessage;
            if let Err(payload) = result {
                let exception = Exception::from_panic(location, payload);
                inner.exception_handler.handle_exception(exception);
            }
        }

        *inner.phase.lock().unwrap() = Phase::FreeTimeCustomLogic;
        if let Some(hook) = inner.free_time_logic.lock().unwrap().as_mut() {
            hook(&inner.keep_running, &inner.run_id);
        }

        inner.scheduler.lock().unwrap().drain_due_and_reschedule(
            inner.clock.now(),
            &inner.keep_running,
            &inner.run_id,
        );

        if !inner.keep_running.load(Ordering::Acquire) {
            *inner.phase.lock().unwrap() = Phase::Stopped;
            break;
        }
    }
}

/// A bounded-mailbox task executor: one (or, as a pool, several)
/// identical worker thread(s) draining the mailbox, a deadline-ordered
/// scheduler advanced once per loop iteration, and a liveness probe a
/// [`super::monitor::Monitor`] can poll. Cloning a `Highway` shares the
/// same mailbox, scheduler, and worker threads (spec §3 Highway entity).
#[derive(Clone)]
pub struct Highway {
    pub(crate) inner: Arc<HighwayInner>,
    workers: Arc<Mutex<Vec<ThreadHandle>>>,
}

impl Highway {
    pub fn new(config: HighwayConfig) -> Self {
        Self::with_collaborators(config, Arc::new(DefaultExceptionHandler), Arc::new(SystemClock))
    }

    pub fn with_collaborators(
        config: HighwayConfig,
        exception_handler: Arc<dyn ExceptionHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let inner = Arc::new(HighwayInner {
            mailbox: Mailbox::new(config.capacity),
            scheduler: Mutex::new(Scheduler::new()),
            run_id: AtomicU32::new(0),
            phase: Mutex::new(Phase::Sleep),
            task_start: Mutex::new(None),
            keep_running: AtomicBool::new(true),
            max_task_execution_time: config.max_task_execution_time,
            idle_sleep_cap: config.idle_sleep_cap,
            exception_handler,
            clock,
            worker_thread_ids: Mutex::new(HashSet::new()),
            free_time_logic: Mutex::new(None),
        });
        let worker_count = config.worker_threads.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let inner = inner.clone();
            workers.push(ThreadHandle::spawn(format!("highway-worker-{i}"), move || {
                worker_loop(inner);
            }));
        }
        Self {
            inner,
            workers: Arc::new(Mutex::new(workers)),
        }
    }

    /// Enqueues `body`, blocking until a mailbox holder is free. Returns
    /// `false` instead of enqueuing if the highway was destroyed while
    /// waiting.
    pub fn execute(
        &self,
        location: SourceLocation,
        body: impl FnOnce(&AtomicBool, &AtomicU32) + Send + 'static,
    ) -> bool {
        self.inner.mailbox.send_may_blocked(Task::new(location, body))
    }

    /// Enqueues `body`, returning `false` instead of blocking if the
    /// mailbox is full.
    pub fn try_execute(
        &self,
        location: SourceLocation,
        body: impl FnOnce(&AtomicBool, &AtomicU32) + Send + 'static,
    ) -> bool {
        self.inner.mailbox.send_may_fail(Task::new(location, body))
    }

    /// Like [`Highway::execute`], but the task is silently dropped
    /// instead of run if `protector` can't be upgraded by dequeue time.
    pub fn execute_protected(
        &self,
        location: SourceLocation,
        protector: Protector,
        body: impl FnOnce(&AtomicBool, &AtomicU32) + Send + 'static,
    ) -> bool {
        self.inner
            .mailbox
            .send_may_blocked(Task::with_protector(location, protector, body))
    }

    pub fn schedule(&self, task: ScheduledTask) {
        self.inner.scheduler.lock().unwrap().add(task);
    }

    /// Installs the optional cooperative-work hook run once per loop
    /// iteration after draining the mailbox (spec §4.3 step 3).
    pub fn set_free_time_logic(
        &self,
        hook: impl FnMut(&AtomicBool, &AtomicU32) + Send + 'static,
    ) {
        *self.inner.free_time_logic.lock().unwrap() = Some(Box::new(hook));
    }

    /// Blocks until the mailbox holds no pending or queued tasks and no
    /// task is currently executing.
    pub fn flush_tasks(&self) {
        loop {
            let mailbox_idle = self.inner.mailbox.is_idle();
            let not_executing = *self.inner.phase.lock().unwrap() != Phase::MailBoxMessage;
            if mailbox_idle && not_executing {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Bumps the run id, signals shutdown, and joins every worker
    /// thread. Any task still queued is dropped, not invoked.
    pub fn destroy(&self) {
        destroy_inner(&self.inner);
        let mut workers = self.workers.lock().unwrap();
        for worker in workers.drain(..) {
            let _ = worker.join();
        }
    }

    pub fn current_thread_is_worker(&self) -> bool {
        self.inner
            .worker_thread_ids
            .lock()
            .unwrap()
            .contains(&std::thread::current().id())
    }

    /// Advisory only: this crate's arenas are fixed-capacity at
    /// construction (spec §5: "arenas never shrink"); calling this after
    /// `Highway::new` does not resize the mailbox.
    pub fn set_capacity(&self, _capacity: u32) {
        tracing::warn!("set_capacity has no effect after construction; mailbox arenas are fixed-size");
    }

    pub fn current_run_id(&self) -> u32 {
        self.inner.run_id.load(Ordering::Acquire)
    }

    pub fn current_phase(&self) -> Phase {
        *self.inner.phase.lock().unwrap()
    }

    /// Runs the liveness probe: `true` if sleeping or the in-flight task
    /// hasn't exceeded `max_task_execution_time`; if it has, reports a
    /// stuck event through the exception handler but still returns
    /// `true` — the caller observes, it does not kill (spec §4.3).
    pub fn self_check(&self) -> bool {
        self_check_inner(&self.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<HighwayInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn self_check_weak(inner: &Arc<HighwayInner>) -> bool {
        self_check_inner(inner)
    }

    pub(crate) fn destroy_weak(inner: &Arc<HighwayInner>) {
        destroy_inner(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32 as StdAtomicU32;

    #[test]
    fn execute_runs_the_task() {
        let highway = Highway::new(HighwayConfig::default());
        let counter = Arc::new(StdAtomicU32::new(0));
        let c = counter.clone();
        highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        highway.flush_tasks();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        highway.destroy();
    }

    #[test]
    fn a_task_with_a_dead_protector_never_runs() {
        let highway = Highway::new(HighwayConfig::default());
        let liveness = Arc::new(());
        let protector = Arc::downgrade(&liveness);
        drop(liveness);
        let ran = Arc::new(StdAtomicU32::new(0));
        let r = ran.clone();
        highway.execute_protected(SourceLocation::new(file!(), line!()), protector, move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        highway.flush_tasks();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        highway.destroy();
    }

    #[test]
    fn a_panicking_task_does_not_stop_the_worker() {
        struct SwallowingHandler(Arc<StdAtomicU32>);
        impl ExceptionHandler for SwallowingHandler {
            fn handle_exception(&self, _exception: Exception) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let seen = Arc::new(StdAtomicU32::new(0));
        let highway = Highway::with_collaborators(
            HighwayConfig::default(),
            Arc::new(SwallowingHandler(seen.clone())),
            Arc::new(SystemClock),
        );
        highway.execute(SourceLocation::new(file!(), line!()), |_, _| {
            panic!("boom");
        });
        let ran = Arc::new(StdAtomicU32::new(0));
        let r = ran.clone();
        highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        highway.flush_tasks();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        highway.destroy();
    }

    #[test]
    fn destroy_leaves_the_highway_unable_to_run_further_tasks() {
        let highway = Highway::new(HighwayConfig::default());
        highway.destroy();
        assert!(highway.current_run_id() >= 1);
    }
}
