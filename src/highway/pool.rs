//! The pool-managed highway variant (spec §1: "pool-managed variants";
//! spec §4.3: "variant: a pool of identical workers sharing one
//! mailbox"). All pool semantics already live in [`Highway`] — a pool is
//! just a `Highway` built with more than one worker thread draining the
//! same mailbox. This type exists so callers can spell that choice by
//! name instead of a bare `worker_threads` field.

use std::sync::Arc;

use crate::clock::Clock;

use super::worker::{ExceptionHandler, Highway, HighwayConfig};

pub struct HighwayPool;

impl HighwayPool {
    pub fn new(mut config: HighwayConfig, worker_count: usize) -> Highway {
        config.worker_threads = worker_count.max(2);
        Highway::new(config)
    }

    pub fn with_collaborators(
        mut config: HighwayConfig,
        worker_count: usize,
        exception_handler: Arc<dyn ExceptionHandler>,
        clock: Arc<dyn Clock>,
    ) -> Highway {
        config.worker_threads = worker_count.max(2);
        Highway::with_collaborators(config, exception_handler, clock)
    }
}
