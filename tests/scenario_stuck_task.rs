//! S5: the monitor observes a stuck task without killing it (spec §8).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carriageway::error::{Exception, SourceLocation};
use carriageway::highway::{ExceptionHandler, Highway, HighwayConfig, Monitor};

struct StuckCountingHandler {
    stuck_count: Arc<AtomicU32>,
}

impl ExceptionHandler for StuckCountingHandler {
    fn handle_exception(&self, _exception: Exception) {}

    fn handle_stuck(&self, _location: SourceLocation, _elapsed: Duration) {
        self.stuck_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn a_long_task_is_reported_stuck_but_still_completes() {
    let stuck_count = Arc::new(AtomicU32::new(0));
    let highway = Highway::with_collaborators(
        HighwayConfig {
            max_task_execution_time: Duration::from_millis(10),
            ..HighwayConfig::default()
        },
        Arc::new(StuckCountingHandler {
            stuck_count: stuck_count.clone(),
        }),
        Arc::new(carriageway::clock::SystemClock),
    );

    let monitor = Monitor::new(Duration::from_millis(10));
    monitor.watch(&highway);

    let completed = Arc::new(AtomicU32::new(0));
    let c = completed.clone();
    highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
        std::thread::sleep(Duration::from_millis(100));
        c.fetch_add(1, Ordering::SeqCst);
    });

    while stuck_count.load(Ordering::SeqCst) == 0 {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(completed.load(Ordering::SeqCst), 0, "monitor fired before the task finished");

    highway.flush_tasks();
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(stuck_count.load(Ordering::SeqCst) >= 1);

    let next_ran = Arc::new(AtomicU32::new(0));
    let n = next_ran.clone();
    highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
        n.fetch_add(1, Ordering::SeqCst);
    });
    highway.flush_tasks();
    assert_eq!(next_ran.load(Ordering::SeqCst), 1);

    highway.destroy();
}
