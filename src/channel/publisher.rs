//! Publisher variants (spec §4.6).

use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use crate::error::SourceLocation;
use crate::highway::{Highway, HighwayConfig};
use crate::lockfree::{Arena, StackHead};

use super::subscription::Subscription;

/// A fixed single subscription. Thread safety of concurrent publishes is
/// whatever the subscription itself provides.
pub struct ManyForOne<P> {
    subscription: Arc<dyn Subscription<P>>,
}

impl<P> ManyForOne<P> {
    pub fn new(subscription: Arc<dyn Subscription<P>>) -> Self {
        Self { subscription }
    }

    pub fn publish(&self, value: P) -> bool {
        self.subscription.send(value)
    }
}

/// An append-only, lock-free subscription list: `subscribe` never
/// blocks a concurrent `publish`, but there is no way to remove a
/// subscription once installed (spec §4.6: "no pruning"). Built on the
/// same arena-indexed stack every other lock-free structure in this
/// crate uses, pushed-to but never popped — safe per
/// [`StackHead::for_each`]'s append-only requirement.
pub struct ManyForMany<P> {
    arena: Arena<Arc<dyn Subscription<P>>>,
    head: StackHead,
}

impl<P: Clone> ManyForMany<P> {
    pub fn new(capacity: u32) -> Self {
        Self {
            arena: Arena::new(capacity),
            head: StackHead::new(),
        }
    }

    /// Returns `false` if the list's fixed capacity is exhausted.
    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) -> bool {
        let Some(idx) = self.arena.bump_allocate() else {
            return false;
        };
        self.arena.set_value(idx, subscription);
        self.head.push(&self.arena, idx);
        true
    }

    /// Delivers `value` to every installed subscription: a clone to
    /// every subscription but the most-recently-installed one, which
    /// receives the value by move.
    pub fn publish(&self, value: P) {
        let mut subscriptions = Vec::new();
        self.head.for_each(&self.arena, |idx| {
            self.arena.with_value(idx, |s| subscriptions.push(s.clone()));
        });
        let last = subscriptions.len().saturating_sub(1);
        for (i, subscription) in subscriptions.into_iter().enumerate() {
            if i == last {
                subscription.send(value);
                break;
            }
            subscription.send(value.clone());
        }
    }
}

/// Same fan-out as [`ManyForMany`], but subscriptions are held in a
/// mutex-guarded `Vec` so a publish can drop any that return `false`.
pub struct ManyForManyRemovable<P> {
    subscriptions: Mutex<Vec<Arc<dyn Subscription<P>>>>,
}

impl<P: Clone> ManyForManyRemovable<P> {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    pub fn publish(&self, value: P) {
        let mut guard = self.subscriptions.lock().unwrap();
        guard.retain(|s| s.send(value.clone()));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl<P: Clone> Default for ManyForManyRemovable<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Like [`ManyForManyRemovable`], but `publish` is debug-checked to
/// always run from the same thread (spec §4.6; §9's translation guidance
/// for the single-threaded-publish check).
pub struct OneForMany<P> {
    subscriptions: Mutex<Vec<Arc<dyn Subscription<P>>>>,
    publisher_thread: Mutex<Option<ThreadId>>,
}

impl<P: Clone> OneForMany<P> {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            publisher_thread: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    pub fn publish(&self, value: P) {
        let current = std::thread::current().id();
        let mut publisher_thread = self.publisher_thread.lock().unwrap();
        match *publisher_thread {
            Some(expected) => debug_assert_eq!(
                expected, current,
                "OneForMany::publish called from more than one thread"
            ),
            None => *publisher_thread = Some(current),
        }
        drop(publisher_thread);

        let snapshot = self.subscriptions.lock().unwrap().clone();
        let mut survivors = Vec::with_capacity(snapshot.len());
        for subscription in snapshot {
            if subscription.send(value.clone()) {
                survivors.push(subscription);
            }
        }
        *self.subscriptions.lock().unwrap() = survivors;
    }
}

impl<P: Clone> Default for OneForMany<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-posts both `subscribe` and `publish` onto an internal highway, so
/// the subscription-list traversal is single-threaded even when called
/// concurrently: every subscriber of a given `HighwayPublisher` observes
/// a total order of deliveries.
pub struct HighwayPublisher<P> {
    highway: Highway,
    subscriptions: Arc<Mutex<Vec<Arc<dyn Subscription<P>>>>>,
}

impl<P: Clone + Send + 'static> HighwayPublisher<P> {
    pub fn new(highway: Highway) -> Self {
        Self {
            highway,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_default_highway() -> Self {
        Self::new(Highway::new(HighwayConfig::default()))
    }

    pub fn highway(&self) -> &Highway {
        &self.highway
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) {
        let subscriptions = self.subscriptions.clone();
        self.highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            subscriptions.lock().unwrap().push(subscription);
        });
    }

    pub fn publish(&self, value: P) {
        let subscriptions = self.subscriptions.clone();
        self.highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            let mut guard = subscriptions.lock().unwrap();
            guard.retain(|s| s.send(value.clone()));
        });
    }
}

/// [`HighwayPublisher`] plus a last-value cache: subscribing replays the
/// last publication once, on the internal highway, before the
/// subscription is installed. If the replay itself returns `false`, the
/// subscription is never installed.
pub struct StickyPublisher<P> {
    highway: Highway,
    subscriptions: Arc<Mutex<Vec<Arc<dyn Subscription<P>>>>>,
    last: Arc<Mutex<Option<P>>>,
}

impl<P: Clone + Send + 'static> StickyPublisher<P> {
    pub fn new(highway: Highway) -> Self {
        Self {
            highway,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_default_highway() -> Self {
        Self::new(Highway::new(HighwayConfig::default()))
    }

    pub fn highway(&self) -> &Highway {
        &self.highway
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) {
        let subscriptions = self.subscriptions.clone();
        let last = self.last.clone();
        self.highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            let replay = last.lock().unwrap().clone();
            let install = match replay {
                Some(value) => subscription.send(value),
                None => true,
            };
            if install {
                subscriptions.lock().unwrap().push(subscription);
            }
        });
    }

    pub fn publish(&self, value: P) {
        let subscriptions = self.subscriptions.clone();
        let last = self.last.clone();
        self.highway.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            *last.lock().unwrap() = Some(value.clone());
            let mut guard = subscriptions.lock().unwrap();
            guard.retain(|s| s.send(value.clone()));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::subscription::DirectInline;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[test]
    fn many_for_many_delivers_to_every_subscriber() {
        let publisher: ManyForMany<u32> = ManyForMany::new(8);
        let sum = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            let sum = sum.clone();
            publisher.subscribe(Arc::new(DirectInline::new(move |v| {
                sum.fetch_add(v, Ordering::SeqCst);
                true
            })));
        }
        publisher.publish(10);
        assert_eq!(sum.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn many_for_many_removable_drops_failed_subscriptions() {
        let publisher: ManyForManyRemovable<u32> = ManyForManyRemovable::new();
        publisher.subscribe(Arc::new(DirectInline::new(|_| false)));
        publisher.subscribe(Arc::new(DirectInline::new(|_| true)));
        publisher.publish(1);
        assert_eq!(publisher.subscriber_count(), 1);
        publisher.publish(2);
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[test]
    fn sticky_publisher_replays_the_last_value_to_new_subscribers() {
        let publisher: StickyPublisher<u32> = StickyPublisher::with_default_highway();
        publisher.publish(42);
        publisher.highway().flush_tasks();

        let received = Arc::new(Mutex::new(Vec::new()));
        let r = received.clone();
        publisher.subscribe(Arc::new(DirectInline::new(move |v| {
            r.lock().unwrap().push(v);
            true
        })));
        publisher.highway().flush_tasks();
        assert_eq!(*received.lock().unwrap(), vec![42]);

        publisher.publish(43);
        publisher.highway().flush_tasks();
        assert_eq!(*received.lock().unwrap(), vec![42, 43]);
        publisher.highway().destroy();
    }

    #[test]
    fn highway_publisher_serializes_concurrent_publishes() {
        let publisher: HighwayPublisher<u32> = HighwayPublisher::with_default_highway();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = order.clone();
        publisher.subscribe(Arc::new(DirectInline::new(move |v| {
            o.lock().unwrap().push(v);
            true
        })));
        for v in 0..50 {
            publisher.publish(v);
        }
        publisher.highway().flush_tasks();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(order.lock().unwrap().len(), 50);
        publisher.highway().destroy();
    }
}
