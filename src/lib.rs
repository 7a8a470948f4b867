//! `carriageway`: lock-free task highways, pub/sub channels, an execution
//! graph, and the Dson wire format for latency-sensitive in-process
//! workloads.
//!
//! # Layout
//! - [`lockfree`]: the ABA-safe intrusive stack every other module sits on.
//! - [`mailbox`]: the bounded FIFO a highway drains.
//! - [`highway`]: worker thread(s), scheduler, liveness monitor.
//! - [`channel`]: publishers and subscriptions (direct and highway-dispatched).
//! - [`graph`]: a typed execution graph of nodes wired by labeled channels.
//! - [`dson`]: the self-describing binary record format.
//!
//! None of logging, CLI wrappers, or example programs are part of this
//! crate's surface; it exposes the contracts those collaborators consume
//! (see [`clock`], [`semaphore`], [`thread_handle`]).

pub mod channel;
pub mod clock;
pub mod dson;
pub mod error;
pub mod graph;
pub mod highway;
pub mod lockfree;
pub mod mailbox;
pub mod prelude;
pub mod semaphore;
pub mod thread_handle;

pub use error::{Exception, ResultCode};
