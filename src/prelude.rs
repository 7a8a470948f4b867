//! Common imports for consumers wiring up a highway, its channels, and
//! an execution graph.

pub use crate::channel::{
    ConnectionsNotifier, DirectForNewOnly, DirectInline, HighwayDispatched, HighwayPublisher, ManyForMany,
    ManyForManyRemovable, ManyForOne, OneForMany, ProtectedHighwayDispatched, StickyPublisher, Subscription,
};
pub use crate::dson::{DsonEditController, DsonHeader, DsonObject, DsonValue, TypeId};
pub use crate::error::{Exception, ResultCode, SourceLocation};
pub use crate::graph::{ExecutionTree, Node, NodeProgress, OutputPublishers, ResultNode};
pub use crate::highway::{Highway, HighwayConfig, HighwayPool, Monitor};
pub use crate::mailbox::Mailbox;
