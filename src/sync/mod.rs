//! Side-effect synchronization for replayed operations
//!
//! Some editor operations finish before their effects are visible (the
//! document or selection updates later, the clipboard is filled
//! asynchronously). An await spec such as `"document selection"` names the
//! effects to wait for; the wait resolves once each has been observed, or
//! fails after a timeout.

use crate::error::MacroError;
use crate::host::EditorHost;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// An observable side effect named in an await spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitTarget {
    Document,
    Selection,
    Clipboard,
}

impl AwaitTarget {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "document" => Some(Self::Document),
            "selection" => Some(Self::Selection),
            "clipboard" => Some(Self::Clipboard),
            _ => None,
        }
    }
}

/// Split a space-separated await spec into targets
pub fn parse_await_spec(spec: &str) -> Result<Vec<AwaitTarget>, MacroError> {
    spec.split_whitespace()
        .map(|token| {
            AwaitTarget::parse(token).ok_or_else(|| {
                MacroError::InvalidAwaitSpec(format!("unknown token '{}' in '{}'", token, spec))
            })
        })
        .collect()
}

#[derive(Default)]
struct Listeners {
    document: Vec<oneshot::Sender<()>>,
    selection: Vec<oneshot::Sender<()>>,
}

/// Manages one-shot listeners for document and selection notifications
pub struct AwaitSynchronizer {
    listeners: Mutex<Listeners>,
    /// Clipboard polling period
    poll_interval: Duration,
}

impl AwaitSynchronizer {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            listeners: Mutex::new(Listeners::default()),
            poll_interval,
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register listeners for `spec`.
    ///
    /// Call this before starting the operation so that effects it produces
    /// while running are not missed; then await [`PendingWait::wait`].
    pub async fn prepare<'a>(
        &self,
        spec: &str,
        host: &'a dyn EditorHost,
    ) -> Result<PendingWait<'a>, MacroError> {
        let targets = parse_await_spec(spec)?;

        let clipboard = if targets.contains(&AwaitTarget::Clipboard) {
            Some(ClipboardWatch {
                host,
                initial: host.read_clipboard().await,
            })
        } else {
            None
        };

        let mut events = Vec::new();
        let mut listeners = self.listeners();
        for target in &targets {
            let list = match target {
                AwaitTarget::Document => &mut listeners.document,
                AwaitTarget::Selection => &mut listeners.selection,
                AwaitTarget::Clipboard => continue,
            };
            let (sender, receiver) = oneshot::channel();
            list.push(sender);
            events.push(receiver);
        }

        Ok(PendingWait {
            spec: spec.to_string(),
            events,
            clipboard,
            poll_interval: self.poll_interval,
        })
    }

    /// Wait for the effects in `spec`, counted from this call
    pub async fn wait_for(
        &self,
        spec: &str,
        timeout: Duration,
        host: &dyn EditorHost,
    ) -> Result<(), MacroError> {
        self.prepare(spec, host).await?.wait(timeout).await
    }

    /// Fire every document listener
    pub fn notify_document_changed(&self) {
        let mut listeners = self.listeners();
        for sender in std::mem::take(&mut listeners.document) {
            // Receiver may have timed out already
            let _ = sender.send(());
        }
        listeners.selection.retain(|sender| !sender.is_closed());
    }

    /// Fire every selection listener
    pub fn notify_selection_changed(&self) {
        let mut listeners = self.listeners();
        for sender in std::mem::take(&mut listeners.selection) {
            let _ = sender.send(());
        }
        listeners.document.retain(|sender| !sender.is_closed());
    }

    /// Listeners registered and not yet fired
    pub fn pending_listeners(&self) -> usize {
        let listeners = self.listeners();
        listeners.document.len() + listeners.selection.len()
    }

    /// Drop all listeners; their waits resolve immediately
    pub fn reset(&self) {
        let mut listeners = self.listeners();
        listeners.document.clear();
        listeners.selection.clear();
    }
}

struct ClipboardWatch<'a> {
    host: &'a dyn EditorHost,
    initial: String,
}

impl ClipboardWatch<'_> {
    async fn changed(&self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            if self.host.read_clipboard().await != self.initial {
                return;
            }
        }
    }
}

/// Listeners registered by [`AwaitSynchronizer::prepare`]
pub struct PendingWait<'a> {
    spec: String,
    events: Vec<oneshot::Receiver<()>>,
    clipboard: Option<ClipboardWatch<'a>>,
    poll_interval: Duration,
}

impl PendingWait<'_> {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.clipboard.is_none()
    }

    pub async fn wait(self, timeout: Duration) -> Result<(), MacroError> {
        if self.is_empty() {
            return Ok(());
        }

        let Self {
            spec,
            events,
            clipboard,
            poll_interval,
        } = self;

        let all_observed = async {
            // A dropped sender (reset) counts as observed
            let events = futures::future::join_all(events);
            let clipboard = async {
                if let Some(watch) = &clipboard {
                    watch.changed(poll_interval).await;
                }
            };
            tokio::join!(events, clipboard);
        };

        tokio::time::timeout(timeout, all_observed)
            .await
            .map_err(|_| MacroError::AwaitTimeout {
                spec,
                timeout_ms: timeout.as_millis() as u64,
            })
    }
}
