//! The highway runtime (spec §4.3–§4.5): worker thread(s) draining a
//! [`crate::mailbox::Mailbox`], a deadline-ordered [`scheduler::Scheduler`],
//! and a [`monitor::Monitor`] that polls liveness from the outside.

pub mod monitor;
pub mod pool;
pub mod scheduler;
pub mod task;
pub mod worker;

pub use monitor::Monitor;
pub use pool::HighwayPool;
pub use scheduler::Scheduler;
pub use task::{Liveness, Protector, Schedule, ScheduledTask, Task};
pub use worker::{DefaultExceptionHandler, ExceptionHandler, Highway, HighwayConfig, Phase};
