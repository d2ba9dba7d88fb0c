//! Reentrancy control for engine operations
//!
//! Every guarded and queued call shares a single lock, so there is exactly
//! one critical section per engine:
//! - `guard` / `guard_sync`: skip the call entirely while the lock is held
//! - `CommandQueue::run`: wait in a bounded FIFO, then wait for the lock
//!
//! Scheduler invariants (independent of the runtime's own ordering):
//! - the lock flag is only set through `try_acquire` and cleared by dropping
//!   the `LockHeld` token, so it is released on success, error and cancellation
//! - queued calls are handed their turn strictly in arrival order

mod queue;

pub use queue::CommandQueue;

use crate::error::{ErrorSink, MacroError};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// What happened to a guarded or queued call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Body ran and succeeded
    Completed,
    /// Body ran and its error went to the error sink
    Failed,
    /// Body never ran (lock held, or queue full)
    Skipped,
}

/// The binary lock flag shared by all guarded and queued calls
#[derive(Debug, Default)]
pub(crate) struct CommandLock {
    held: AtomicBool,
    released: Notify,
}

impl CommandLock {
    fn try_acquire(self: &Arc<Self>) -> Option<LockHeld> {
        self.held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LockHeld { lock: self.clone() })
    }

    /// Wait until the lock can be taken
    async fn acquire(self: &Arc<Self>) -> LockHeld {
        loop {
            // Registered before the check so a release in between is not lost
            let released = self.released.notified();
            if let Some(held) = self.try_acquire() {
                return held;
            }
            released.await;
        }
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// Ownership of the lock; releasing happens on drop
pub(crate) struct LockHeld {
    lock: Arc<CommandLock>,
}

impl Drop for LockHeld {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::SeqCst);
        self.lock.released.notify_waiters();
    }
}

/// Wraps fallible operation bodies in the engine-wide critical section
#[derive(Clone)]
pub struct CommandGuard {
    lock: Arc<CommandLock>,
    sink: Arc<dyn ErrorSink>,
}

impl CommandGuard {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            lock: Arc::new(CommandLock::default()),
            sink,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    /// Run `body` unless another guarded or queued call is in flight
    pub async fn guard<F, Fut>(&self, body: F) -> CallOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), MacroError>>,
    {
        let Some(_held) = self.lock.try_acquire() else {
            crate::verbose_print!("[kb-macro] Guarded call skipped: lock is held");
            return CallOutcome::Skipped;
        };
        self.settle(body().await)
    }

    /// Synchronous counterpart of [`guard`](Self::guard), same lock
    pub fn guard_sync<F>(&self, body: F) -> CallOutcome
    where
        F: FnOnce() -> Result<(), MacroError>,
    {
        let Some(_held) = self.lock.try_acquire() else {
            crate::verbose_print!("[kb-macro] Guarded call skipped: lock is held");
            return CallOutcome::Skipped;
        };
        self.settle(body())
    }

    /// Bounded FIFO queue sharing this guard's lock; `capacity` 0 is unbounded
    pub fn queue(&self, capacity: usize) -> CommandQueue {
        CommandQueue::new(self.lock.clone(), self.sink.clone(), capacity)
    }

    fn settle(&self, result: Result<(), MacroError>) -> CallOutcome {
        settle(self.sink.as_ref(), result)
    }
}

fn settle(sink: &dyn ErrorSink, result: Result<(), MacroError>) -> CallOutcome {
    match result {
        Ok(()) => CallOutcome::Completed,
        Err(error) => {
            sink.report(&error);
            CallOutcome::Failed
        }
    }
}
