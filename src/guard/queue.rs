//! Bounded FIFO of calls that share the guard's lock

use super::{settle, CallOutcome, CommandLock};
use crate::error::{ErrorSink, MacroError};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Default)]
struct QueueState {
    /// A call currently owns the turn
    running: bool,
    /// Calls waiting for the turn, oldest first
    waiting: VecDeque<oneshot::Sender<Turn>>,
}

type SharedState = Arc<Mutex<QueueState>>;

fn lock_state(state: &SharedState) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The right to run the next queued body; dropping it hands the turn on
struct Turn {
    state: Option<SharedState>,
}

impl Turn {
    fn disarm(mut self) {
        self.state = None;
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            hand_off(&state);
        }
    }
}

/// Pass the turn to the oldest waiter still listening, or go idle
fn hand_off(state: &SharedState) {
    let mut queue = lock_state(state);
    while let Some(next) = queue.waiting.pop_front() {
        let turn = Turn {
            state: Some(state.clone()),
        };
        match next.send(turn) {
            Ok(()) => return,
            // Waiter gave up; skip it without re-entering hand_off
            Err(turn) => turn.disarm(),
        }
    }
    queue.running = false;
}

enum Entry {
    Ready(Turn),
    Waiting(oneshot::Receiver<Turn>),
    Full,
}

/// Calls run one at a time in arrival order; calls beyond `capacity`
/// (counting the running one) are dropped without running.
#[derive(Clone)]
pub struct CommandQueue {
    lock: Arc<CommandLock>,
    sink: Arc<dyn ErrorSink>,
    capacity: usize,
    state: SharedState,
}

impl CommandQueue {
    pub(crate) fn new(lock: Arc<CommandLock>, sink: Arc<dyn ErrorSink>, capacity: usize) -> Self {
        Self {
            lock,
            sink,
            capacity,
            state: Arc::default(),
        }
    }

    /// Calls currently running or waiting
    pub fn pending(&self) -> usize {
        let queue = lock_state(&self.state);
        usize::from(queue.running) + queue.waiting.len()
    }

    pub async fn run<F, Fut>(&self, body: F) -> CallOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), MacroError>>,
    {
        let _turn = match self.enter() {
            Entry::Ready(turn) => turn,
            Entry::Waiting(receiver) => match receiver.await {
                Ok(turn) => turn,
                Err(_) => return CallOutcome::Skipped,
            },
            Entry::Full => {
                tracing::warn!("[kb-macro] Queue is full ({}), call dropped", self.capacity);
                return CallOutcome::Skipped;
            }
        };
        let _held = self.lock.acquire().await;
        settle(self.sink.as_ref(), body().await)
    }

    fn enter(&self) -> Entry {
        let mut queue = lock_state(&self.state);
        let pending = usize::from(queue.running) + queue.waiting.len();
        if self.capacity > 0 && pending >= self.capacity {
            return Entry::Full;
        }
        if !queue.running {
            queue.running = true;
            return Entry::Ready(Turn {
                state: Some(self.state.clone()),
            });
        }
        let (sender, receiver) = oneshot::channel();
        queue.waiting.push_back(sender);
        Entry::Waiting(receiver)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MacroError;
    use crate::guard::{CallOutcome, CommandGuard};
    use crate::testing::CollectingSink;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn guard_with_sink() -> (CommandGuard, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        (CommandGuard::new(sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_calls_beyond_capacity_are_dropped() {
        let (guard, _) = guard_with_sink();
        let queue = guard.queue(2);
        let log = Mutex::new(Vec::new());

        let call = |id: u32| {
            let log = &log;
            queue.run(move || async move {
                log.lock().unwrap().push(format!("start {}", id));
                tokio::time::sleep(Duration::from_millis(5)).await;
                log.lock().unwrap().push(format!("end {}", id));
                Ok(())
            })
        };

        let outcomes = tokio::join!(call(1), call(2), call(3), call(4));

        assert_eq!(
            outcomes,
            (
                CallOutcome::Completed,
                CallOutcome::Completed,
                CallOutcome::Skipped,
                CallOutcome::Skipped
            )
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start 1", "end 1", "start 2", "end 2"]
        );
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_unbounded_queue_runs_all_in_order() {
        let (guard, _) = guard_with_sink();
        let queue = guard.queue(0);
        let order = Mutex::new(Vec::new());

        let call = |id: u32| {
            let order = &order;
            queue.run(move || async move {
                tokio::task::yield_now().await;
                order.lock().unwrap().push(id);
                Ok(())
            })
        };

        tokio::join!(call(1), call(2), call(3), call(4), call(5));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_queued_call_waits_for_guarded_call() {
        let (guard, _) = guard_with_sink();
        let queue = guard.queue(2);
        let order = Mutex::new(Vec::new());

        let (guarded, queued) = tokio::join!(
            guard.guard(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                order.lock().unwrap().push("guarded");
                Ok(())
            }),
            queue.run(|| async {
                order.lock().unwrap().push("queued");
                Ok(())
            }),
        );

        assert_eq!(guarded, CallOutcome::Completed);
        assert_eq!(queued, CallOutcome::Completed);
        assert_eq!(*order.lock().unwrap(), vec!["guarded", "queued"]);
    }

    #[tokio::test]
    async fn test_guarded_call_skipped_while_queued_call_runs() {
        let (guard, _) = guard_with_sink();
        let queue = guard.queue(2);

        let (queued, guarded) = tokio::join!(
            queue.run(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            }),
            guard.guard(|| async { Ok(()) }),
        );

        assert_eq!(queued, CallOutcome::Completed);
        assert_eq!(guarded, CallOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_queue_keeps_draining_after_error() {
        let (guard, sink) = guard_with_sink();
        let queue = guard.queue(3);

        let (failed, next) = tokio::join!(
            queue.run(|| async {
                tokio::task::yield_now().await;
                Err(MacroError::invalid_argument("first"))
            }),
            queue.run(|| async { Ok(()) }),
        );

        assert_eq!(failed, CallOutcome::Failed);
        assert_eq!(next, CallOutcome::Completed);
        assert_eq!(sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_stall_queue() {
        let (guard, _) = guard_with_sink();
        let queue = guard.queue(0);

        let (first, abandoned) = tokio::join!(
            queue.run(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            }),
            tokio::time::timeout(Duration::from_millis(1), queue.run(|| async { Ok(()) })),
        );

        assert_eq!(first, CallOutcome::Completed);
        assert!(abandoned.is_err());
        assert_eq!(queue.run(|| async { Ok(()) }).await, CallOutcome::Completed);
        assert_eq!(queue.pending(), 0);
    }
}
