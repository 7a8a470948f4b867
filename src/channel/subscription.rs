//! [`Subscription`] and its concrete delivery-endpoint variants (spec
//! §4.6).

use std::sync::{Arc, Mutex};

use crate::error::SourceLocation;
use crate::highway::{Highway, Protector};

/// A delivery endpoint. `send` returns `false` when delivery should stop
/// being attempted — protector broken, target highway shut down —
/// letting the owning publisher prune it.
pub trait Subscription<P>: Send + Sync {
    fn send(&self, publication: P) -> bool;
}

/// Invokes its closure inline on the publisher's thread. No allocation
/// beyond the closure itself.
pub struct DirectInline<P> {
    body: Box<dyn Fn(P) -> bool + Send + Sync>,
}

impl<P> DirectInline<P> {
    pub fn new(body: impl Fn(P) -> bool + Send + Sync + 'static) -> Self {
        Self { body: Box::new(body) }
    }
}

impl<P> Subscription<P> for DirectInline<P> {
    fn send(&self, publication: P) -> bool {
        (self.body)(publication)
    }
}

/// Wraps [`DirectInline`] with an equality check against the last
/// delivered value; a publication equal to the last one delivered is
/// suppressed (but still reported as accepted — it isn't a failure).
pub struct DirectForNewOnly<P> {
    inline: DirectInline<P>,
    last: Mutex<Option<P>>,
}

impl<P: Clone + PartialEq + Send + 'static> DirectForNewOnly<P> {
    pub fn new(body: impl Fn(P) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inline: DirectInline::new(body),
            last: Mutex::new(None),
        }
    }
}

impl<P: Clone + PartialEq + Send> Subscription<P> for DirectForNewOnly<P> {
    fn send(&self, publication: P) -> bool {
        let mut last = self.last.lock().unwrap();
        if last.as_ref() == Some(&publication) {
            return true;
        }
        let accepted = self.inline.send(publication.clone());
        if accepted {
            *last = Some(publication);
        }
        accepted
    }
}

/// Wraps the publication in a [`crate::highway::Task`] and enqueues it
/// onto a target highway. `send`'s return value is the mailbox's
/// acceptance result for that enqueue, not whether the closure has run
/// yet.
pub struct HighwayDispatched<P> {
    highway: Highway,
    location: SourceLocation,
    body: Arc<dyn Fn(P) + Send + Sync>,
    blocking: bool,
}

impl<P: Send + 'static> HighwayDispatched<P> {
    pub fn new(
        highway: Highway,
        location: SourceLocation,
        body: impl Fn(P) + Send + Sync + 'static,
    ) -> Self {
        Self {
            highway,
            location,
            body: Arc::new(body),
            blocking: true,
        }
    }

    /// Uses `try_execute` instead of `execute`: a full mailbox drops the
    /// publication and reports `false` instead of blocking the publisher.
    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }
}

impl<P: Send + 'static> Subscription<P> for HighwayDispatched<P> {
    fn send(&self, publication: P) -> bool {
        let body = self.body.clone();
        if self.blocking {
            self.highway
                .execute(self.location, move |_, _| body(publication))
        } else {
            self.highway
                .try_execute(self.location, move |_, _| body(publication))
        }
    }
}

/// [`HighwayDispatched`] plus a protector check: a publication is
/// dropped (and `false` returned) without ever reaching the highway if
/// the protector can no longer be upgraded.
pub struct ProtectedHighwayDispatched<P> {
    inner: HighwayDispatched<P>,
    protector: Protector,
}

impl<P: Send + 'static> ProtectedHighwayDispatched<P> {
    pub fn new(
        highway: Highway,
        location: SourceLocation,
        protector: Protector,
        body: impl Fn(P) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: HighwayDispatched::new(highway, location, body),
            protector,
        }
    }
}

impl<P: Send + 'static> Subscription<P> for ProtectedHighwayDispatched<P> {
    fn send(&self, publication: P) -> bool {
        if self.protector.upgrade().is_none() {
            return false;
        }
        self.inner.send(publication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn direct_inline_runs_on_the_caller_thread() {
        let seen = Arc::new(AtomicU32::new(0));
        let s = seen.clone();
        let sub = DirectInline::new(move |v: u32| {
            s.fetch_add(v, Ordering::SeqCst);
            true
        });
        assert!(sub.send(7));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn direct_for_new_only_suppresses_repeats() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let sub = DirectForNewOnly::new(move |_: u32| {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(sub.send(1));
        assert!(sub.send(1));
        assert!(sub.send(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
