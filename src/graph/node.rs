//! [`Node`]: a typed execution-graph vertex with labeled input channels
//! and output publishers (spec §4.7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::channel::{HighwayDispatched, HighwayPublisher, ManyForManyRemovable, Subscription};
use crate::error::SourceLocation;
use crate::highway::Highway;

/// Progress report a node may emit on state transitions. `achieved_progress`
/// follows the convention: 0 not started, 1..=9999 running, 10000 success,
/// negative error, > 10000 user-defined terminal (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeProgress {
    pub node_id: i32,
    pub achieved_progress: i32,
}

impl NodeProgress {
    pub const NOT_STARTED: i32 = 0;
    pub const SUCCESS: i32 = 10000;

    pub fn is_running(&self) -> bool {
        (1..Self::SUCCESS).contains(&self.achieved_progress)
    }

    pub fn is_error(&self) -> bool {
        self.achieved_progress < 0
    }

    pub fn is_user_defined_terminal(&self) -> bool {
        self.achieved_progress > Self::SUCCESS
    }
}

/// Per-label output fan-out: each label gets its own
/// [`ManyForManyRemovable`] publisher, created lazily on first
/// `publish`/`subscribe`.
pub struct OutputPublishers<Out> {
    by_label: Mutex<HashMap<i32, Arc<ManyForManyRemovable<Out>>>>,
}

impl<Out: Clone> OutputPublishers<Out> {
    fn new() -> Self {
        Self {
            by_label: Mutex::new(HashMap::new()),
        }
    }

    fn publisher_for(&self, label: i32) -> Arc<ManyForManyRemovable<Out>> {
        self.by_label
            .lock()
            .unwrap()
            .entry(label)
            .or_insert_with(|| Arc::new(ManyForManyRemovable::new()))
            .clone()
    }

    pub fn publish(&self, label: i32, value: Out) {
        self.publisher_for(label).publish(value);
    }

    fn subscribe(&self, label: i32, subscription: Arc<dyn Subscription<Out>>) {
        self.publisher_for(label).subscribe(subscription);
    }
}

type Logic<In, Out> = Box<dyn FnMut(In, i32, &OutputPublishers<Out>) + Send>;

/// Type-erased view of a node, kept by [`super::tree::ExecutionTree`] so
/// it can allocate ids and remove nodes without naming their concrete
/// `In`/`Out` types (spec §9's translation guidance for typed templated
/// nodes: "label maps are integer-keyed, values are boxed subscriptions
/// with erased delivery types matched at connect time").
pub trait ErasedNode: Send + Sync {
    fn node_id(&self) -> i32;
    fn mark_removed(&self);
}

/// A typed vertex: `In` is the type every labeled input channel accepts;
/// `Out` is the type every labeled output publishes.
pub struct Node<In, Out> {
    node_id: i32,
    removed: Arc<AtomicBool>,
    outputs: Arc<OutputPublishers<Out>>,
    host_highway: Option<Highway>,
    progress: Option<HighwayPublisher<NodeProgress>>,
    logic: Mutex<Logic<In, Out>>,
}

impl<In, Out> Node<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + 'static,
{
    pub fn new(node_id: i32, logic: impl FnMut(In, i32, &OutputPublishers<Out>) + Send + 'static) -> Self {
        Self {
            node_id,
            removed: Arc::new(AtomicBool::new(false)),
            outputs: Arc::new(OutputPublishers::new()),
            host_highway: None,
            progress: None,
            logic: Mutex::new(Box::new(logic)),
        }
    }

    pub fn with_host_highway(mut self, highway: Highway) -> Self {
        self.host_highway = Some(highway);
        self
    }

    pub fn with_progress_publisher(mut self, progress: HighwayPublisher<NodeProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    pub fn host_highway(&self) -> Option<&Highway> {
        self.host_highway.as_ref()
    }

    pub fn report_progress(&self, achieved_progress: i32) {
        if let Some(progress) = &self.progress {
            progress.publish(NodeProgress {
                node_id: self.node_id,
                achieved_progress,
            });
        }
    }

    /// The input endpoint for `label_in`: a [`Subscription<In>`] that,
    /// when sent, invokes this node's logic. Hand the result to an
    /// upstream node's `connect_to_*_channel`.
    pub fn input(self: &Arc<Self>, label_in: i32) -> Arc<dyn Subscription<In>> {
        Arc::new(NodeInput {
            node: self.clone(),
            label_in,
        })
    }

    fn deliver(&self, value: In, label_in: i32) -> bool {
        if self.removed.load(Ordering::Acquire) {
            return false;
        }
        let mut logic = self.logic.lock().unwrap();
        logic(value, label_in, &self.outputs);
        true
    }

    /// Installs `target` as a direct-inline subscriber of this node's
    /// `label_out` output: publications on that label invoke `target` on
    /// whatever thread calls `OutputPublishers::publish`.
    pub fn connect_to_direct_channel(&self, label_out: i32, target: Arc<dyn Subscription<Out>>) {
        self.outputs.subscribe(label_out, target);
    }

    /// Installs `target` as a subscriber of `label_out`, but dispatched:
    /// each publication is posted as a task onto `highway` instead of
    /// running on the publisher's thread.
    pub fn connect_to_highway_channel(
        &self,
        label_out: i32,
        target: Arc<dyn Subscription<Out>>,
        highway: Highway,
    ) {
        let dispatched = HighwayDispatched::new(highway, SourceLocation::new(file!(), line!()), move |v| {
            target.send(v);
        });
        self.outputs.subscribe(label_out, Arc::new(dispatched));
    }
}

impl<In, Out> ErasedNode for Node<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + 'static,
{
    fn node_id(&self) -> i32 {
        self.node_id
    }

    fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }
}

struct NodeInput<In, Out> {
    node: Arc<Node<In, Out>>,
    label_in: i32,
}

impl<In, Out> Subscription<In> for NodeInput<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + 'static,
{
    fn send(&self, publication: In) -> bool {
        self.node.deliver(publication, self.label_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn logic_runs_and_can_publish_downstream() {
        let node = Arc::new(Node::<u32, bool>::new(1, |x, _label, outputs| {
            outputs.publish(0, x % 2 == 0);
        }));
        let received: Arc<StdMutex<Vec<bool>>> = Arc::new(StdMutex::new(Vec::new()));
        let r = received.clone();
        node.connect_to_direct_channel(
            0,
            Arc::new(crate::channel::DirectInline::new(move |v| {
                r.lock().unwrap().push(v);
                true
            })),
        );
        let input = node.input(0);
        input.send(2);
        input.send(3);
        assert_eq!(*received.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn removed_node_rejects_further_delivery() {
        let node = Arc::new(Node::<u32, bool>::new(1, |_, _, _| {}));
        node.mark_removed();
        let input = node.input(0);
        assert!(!input.send(1));
    }
}
