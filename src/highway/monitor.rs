//! A background thread that polls a set of highways' liveness probes
//! (spec §4.5). The monitor owns no highway — it holds only weak
//! references, so a highway dropped elsewhere simply falls out of the
//! watch list on the next pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::thread_handle::ThreadHandle;

use super::worker::{Highway, HighwayInner};

/// Periodically calls `self_check` on every highway it watches; destroys
/// (signals shutdown on) any whose handle is gone or whose `self_check`
/// reports an un-revivable state.
pub struct Monitor {
    watched: Arc<Mutex<Vec<Weak<HighwayInner>>>>,
    keep_running: Arc<AtomicBool>,
    thread: Option<ThreadHandle>,
}

impl Monitor {
    pub fn new(poll_interval: Duration) -> Self {
        let watched: Arc<Mutex<Vec<Weak<HighwayInner>>>> = Arc::new(Mutex::new(Vec::new()));
        let keep_running = Arc::new(AtomicBool::new(true));
        let thread = {
            let watched = watched.clone();
            let keep_running = keep_running.clone();
            ThreadHandle::spawn("highway-monitor", move || {
                while keep_running.load(Ordering::Acquire) {
                    std::thread::sleep(poll_interval);
                    let mut guard = watched.lock().unwrap();
                    guard.retain(|weak| match weak.upgrade() {
                        Some(inner) => {
                            if !Highway::self_check_weak(&inner) {
                                Highway::destroy_weak(&inner);
                            }
                            true
                        }
                        None => false,
                    });
                }
            })
        };
        Self {
            watched,
            keep_running,
            thread: Some(thread),
        }
    }

    pub fn watch(&self, highway: &Highway) {
        self.watched.lock().unwrap().push(highway.downgrade());
    }

    pub fn watched_count(&self) -> usize {
        self.watched.lock().unwrap().len()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highway::worker::HighwayConfig;

    #[test]
    fn a_dropped_highway_falls_out_of_the_watch_list() {
        let monitor = Monitor::new(Duration::from_millis(5));
        {
            let highway = Highway::new(HighwayConfig::default());
            monitor.watch(&highway);
            highway.destroy();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(monitor.watched_count(), 0);
    }
}
