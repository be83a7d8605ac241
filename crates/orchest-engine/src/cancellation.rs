use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The cancellation-token service, consumed as a boolean probe (C6).
///
/// `is_aborted` is deliberately synchronous: per the concurrency model the
/// poll loop's only suspension points are the tracker call, the engine GET,
/// and the 250ms sleep, so an implementation must answer from state it
/// already holds rather than making a blocking network call here.
pub trait CancellationProbe: Send + Sync {
    fn is_aborted(&self, task_id: &str) -> bool;
}

/// A probe that never reports cancellation. Useful for tests and for
/// callers that don't wire up real cancellation.
pub struct NeverCancelled;

impl CancellationProbe for NeverCancelled {
    fn is_aborted(&self, _task_id: &str) -> bool {
        false
    }
}

/// An in-memory `task_id -> aborted` registry.
///
/// The real abort signal lives in an out-of-scope task control service;
/// whatever observes that service is expected to call [`Self::cancel`] on
/// this registry, and the controller's poll loop reads it back through
/// [`CancellationProbe::is_aborted`] with no I/O of its own.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    flags: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag_for(&self, task_id: &str) -> Arc<AtomicBool> {
        let mut flags = self.flags.lock().expect("cancellation registry poisoned");
        flags
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// Marks `task_id` as cancelled. Idempotent.
    pub fn cancel(&self, task_id: &str) {
        self.flag_for(task_id).store(true, Ordering::SeqCst);
    }

    /// Drops the bookkeeping for `task_id` once its run has finalized.
    pub fn forget(&self, task_id: &str) {
        self.flags
            .lock()
            .expect("cancellation registry poisoned")
            .remove(task_id);
    }
}

impl CancellationProbe for CancellationRegistry {
    fn is_aborted(&self, task_id: &str) -> bool {
        self.flag_for(task_id).load(Ordering::SeqCst)
    }
}
