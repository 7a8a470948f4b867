//! [`ConnectionsNotifier`]: fires callbacks on the 0→1 and 1→0
//! transitions of a [`HighwayPublisher`]'s subscriber count (spec §4.6).

use std::sync::{Arc, Mutex};

use crate::error::SourceLocation;

use super::publisher::HighwayPublisher;
use super::subscription::Subscription;

type ConnectionCallback = Box<dyn Fn() + Send + Sync>;

/// Wraps a [`HighwayPublisher`], counting installed subscriptions on its
/// internal highway so transitions are observed free of races: both the
/// count update and the publish-time pruning that can also drop it to
/// zero run serialized on that same highway.
pub struct ConnectionsNotifier<P> {
    publisher: HighwayPublisher<P>,
    count: Arc<Mutex<usize>>,
    on_first_connected: Arc<Mutex<Option<ConnectionCallback>>>,
    on_last_disconnected: Arc<Mutex<Option<ConnectionCallback>>>,
}

impl<P: Clone + Send + 'static> ConnectionsNotifier<P> {
    pub fn new(publisher: HighwayPublisher<P>) -> Self {
        Self {
            publisher,
            count: Arc::new(Mutex::new(0)),
            on_first_connected: Arc::new(Mutex::new(None)),
            on_last_disconnected: Arc::new(Mutex::new(None)),
        }
    }

    pub fn on_first_connected(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_first_connected.lock().unwrap() = Some(Box::new(callback));
    }

    pub fn on_last_disconnected(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_last_disconnected.lock().unwrap() = Some(Box::new(callback));
    }

    pub fn subscriber_count(&self) -> usize {
        *self.count.lock().unwrap()
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription<P>>) {
        let count = self.count.clone();
        let on_first_connected = self.on_first_connected.clone();
        let wrapped: Arc<dyn Subscription<P>> =
            Arc::new(CountedSubscription::new(subscription, count.clone(), self.on_last_disconnected.clone()));
        self.publisher.subscribe(wrapped);

        // Re-posted onto the same highway as the subscribe above and
        // `CountedSubscription::send`'s decrement, so the count only ever
        // changes from the one thread the publisher already serializes
        // subscribe/publish traffic through.
        self.publisher.highway().execute(SourceLocation::new(file!(), line!()), move |_, _| {
            let mut guard = count.lock().unwrap();
            *guard += 1;
            if *guard == 1 {
                drop(guard);
                if let Some(cb) = on_first_connected.lock().unwrap().as_ref() {
                    cb();
                }
            }
        });
    }

    pub fn publish(&self, value: P) {
        self.publisher.publish(value);
    }
}

struct CountedSubscription<P> {
    inner: Arc<dyn Subscription<P>>,
    count: Arc<Mutex<usize>>,
    on_last_disconnected: Arc<Mutex<Option<ConnectionCallback>>>,
}

impl<P> CountedSubscription<P> {
    fn new(
        inner: Arc<dyn Subscription<P>>,
        count: Arc<Mutex<usize>>,
        on_last_disconnected: Arc<Mutex<Option<ConnectionCallback>>>,
    ) -> Self {
        Self {
            inner,
            count,
            on_last_disconnected,
        }
    }
}

impl<P> Subscription<P> for CountedSubscription<P> {
    fn send(&self, publication: P) -> bool {
        let accepted = self.inner.send(publication);
        if !accepted {
            let mut guard = self.count.lock().unwrap();
            *guard = guard.saturating_sub(1);
            if *guard == 0 {
                drop(guard);
                if let Some(cb) = self.on_last_disconnected.lock().unwrap().as_ref() {
                    cb();
                }
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::subscription::DirectInline;
    use crate::highway::Highway;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn fires_first_connected_and_last_disconnected() {
        let publisher = HighwayPublisher::new(Highway::new(crate::highway::HighwayConfig::default()));
        let notifier = ConnectionsNotifier::new(publisher);
        let firsts = Arc::new(AtomicU32::new(0));
        let lasts = Arc::new(AtomicU32::new(0));
        let f = firsts.clone();
        notifier.on_first_connected(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let l = lasts.clone();
        notifier.on_last_disconnected(move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        notifier.subscribe(Arc::new(DirectInline::new(|_: u32| false)));
        notifier.publish(1);
        std::thread::sleep(std::time::Duration::from_millis(10));

        assert_eq!(firsts.load(Ordering::SeqCst), 1);
        assert_eq!(lasts.load(Ordering::SeqCst), 1);
    }
}
