//! The channel / subscription layer (spec §4.6): delivery endpoints
//! ([`Subscription`]) and the publisher shapes that fan a publication out
//! to them.

pub mod connections_notifier;
pub mod publisher;
pub mod subscription;

pub use connections_notifier::ConnectionsNotifier;
pub use publisher::{
    HighwayPublisher, ManyForMany, ManyForManyRemovable, ManyForOne, OneForMany, StickyPublisher,
};
pub use subscription::{DirectForNewOnly, DirectInline, HighwayDispatched, ProtectedHighwayDispatched, Subscription};
