//! [`ResultNode`]: a terminal vertex that just holds the most recent
//! value delivered to it (spec §4.7).

use std::sync::{Arc, Condvar, Mutex};

use crate::channel::Subscription;

use super::node::ErasedNode;

struct State<T> {
    value: Option<T>,
}

/// A sink for a graph's output edges. `get_result` blocks until a value
/// has been delivered since construction or the last `reset_result`,
/// and is safe to call from more than one waiting thread at once.
pub struct ResultNode<T> {
    node_id: i32,
    removed: std::sync::atomic::AtomicBool,
    state: Mutex<State<T>>,
    arrived: Condvar,
}

impl<T: Clone + Send + 'static> ResultNode<T> {
    pub fn new(node_id: i32) -> Arc<Self> {
        Arc::new(Self {
            node_id,
            removed: std::sync::atomic::AtomicBool::new(false),
            state: Mutex::new(State { value: None }),
            arrived: Condvar::new(),
        })
    }

    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    /// Blocks until a value is available, then returns a clone of it.
    pub fn get_result(&self) -> T {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(value) = &guard.value {
                return value.clone();
            }
            guard = self.arrived.wait(guard).unwrap();
        }
    }

    /// Like [`ResultNode::get_result`], but returns `None` instead of
    /// blocking forever past `timeout`.
    pub fn get_result_timeout(&self, timeout: std::time::Duration) -> Option<T> {
        let (guard, _timed_out) = self
            .arrived
            .wait_timeout_while(self.state.lock().unwrap(), timeout, |s| s.value.is_none())
            .unwrap();
        guard.value.clone()
    }

    pub fn reset_result(&self) {
        self.state.lock().unwrap().value = None;
    }

    pub fn has_result(&self) -> bool {
        self.state.lock().unwrap().value.is_some()
    }
}

impl<T: Clone + Send + 'static> Subscription<T> for ResultNode<T> {
    fn send(&self, publication: T) -> bool {
        if self.removed.load(std::sync::atomic::Ordering::Acquire) {
            return false;
        }
        let mut guard = self.state.lock().unwrap();
        guard.value = Some(publication);
        self.arrived.notify_all();
        true
    }
}

impl<T: Clone + Send + 'static> ErasedNode for ResultNode<T> {
    fn node_id(&self) -> i32 {
        self.node_id
    }

    fn mark_removed(&self) {
        self.removed.store(true, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn get_result_blocks_until_a_value_arrives() {
        let result = ResultNode::<u32>::new(1);
        let r = result.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            r.send(42);
        });
        assert_eq!(result.get_result(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn reset_result_makes_get_result_block_again() {
        let result = ResultNode::<u32>::new(1);
        result.send(1);
        assert!(result.has_result());
        result.reset_result();
        assert!(!result.has_result());
        assert_eq!(result.get_result_timeout(Duration::from_millis(10)), None);
    }
}
