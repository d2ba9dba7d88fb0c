//! The macro engine: recording, background recording and playback
//!
//! All operations are split by concern across this directory:
//! - `recording`: foreground and background recording transitions
//! - `playback`: replaying sequences, repeat and abort
//! - `wrap`: executing and recording a single host operation
//! - `state`: context flags and subscriber notifications

mod playback;
mod recording;
mod state;
mod wrap;

pub use playback::parse_playback_args;
pub use playback::PlaybackArgs;
pub use state::{
    ChangeReason, EngineEvent, CONTEXT_ACTIVE, CONTEXT_BACKGROUND_RECORDING, CONTEXT_PLAYING,
    CONTEXT_RECORDING,
};

use crate::descriptor::{Descriptor, KeybindingEntry};
use crate::error::{ErrorSink, TracingSink};
use crate::guard::{CommandGuard, CommandQueue};
use crate::host::{DocumentChangeEvent, EditorHost, EditorState, Selection};
use crate::sequence::CommandSequence;
use crate::settings::EngineSettings;
use crate::sync::AwaitSynchronizer;
use crate::typing::TypingDetector;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Mutable engine state; only touched between suspension points
struct EngineState {
    recording: bool,
    background_recording: bool,
    playing: bool,
    abort_requested: bool,
    macro_buffer: CommandSequence,
    history: CommandSequence,
    observers: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

impl EngineState {
    fn is_active(&self) -> bool {
        self.recording || self.background_recording
    }
}

pub struct MacroEngine {
    host: Arc<dyn EditorHost>,
    settings: EngineSettings,
    guard: CommandGuard,
    wrap_queue: CommandQueue,
    background_queue: CommandQueue,
    state: Mutex<EngineState>,
    detector: Mutex<TypingDetector>,
    synchronizer: AwaitSynchronizer,
}

impl MacroEngine {
    pub fn new(host: Arc<dyn EditorHost>, settings: EngineSettings) -> Self {
        Self::with_error_sink(host, settings, Arc::new(TracingSink))
    }

    pub fn with_error_sink(
        host: Arc<dyn EditorHost>,
        settings: EngineSettings,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        crate::verbose_print!("[kb-macro] Engine {} starting", crate::VERSION);
        for issue in settings.validate() {
            tracing::warn!("[kb-macro] Settings: {}", issue);
        }

        let guard = CommandGuard::new(sink);
        let wrap_queue = guard.queue(settings.queue_size);
        let background_queue = guard.queue(0);

        Self {
            host,
            guard,
            wrap_queue,
            background_queue,
            state: Mutex::new(EngineState {
                recording: false,
                background_recording: false,
                playing: false,
                abort_requested: false,
                macro_buffer: CommandSequence::new(),
                history: CommandSequence::with_capacity(settings.history_capacity),
                observers: Vec::new(),
            }),
            detector: Mutex::new(TypingDetector::new()),
            synchronizer: AwaitSynchronizer::new(settings.clipboard_poll_interval()),
            settings,
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn detector(&self) -> MutexGuard<'_, TypingDetector> {
        self.detector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_recording(&self) -> bool {
        self.state().recording
    }

    pub fn is_background_recording(&self) -> bool {
        self.state().background_recording
    }

    /// Recording or background recording
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    /// A guarded or queued operation is running
    pub fn is_busy(&self) -> bool {
        self.guard.is_locked()
    }

    /// Record an executed operation into whichever buffers are active
    pub fn push(&self, descriptor: Descriptor) {
        if descriptor.is_side_effect() {
            crate::verbose_print!("[kb-macro] Not recording side-effect '{}'", descriptor.name);
            return;
        }
        let mut state = self.state();
        if state.background_recording {
            state.history.push(descriptor.clone());
        }
        if state.recording {
            state.macro_buffer.push(descriptor);
        }
    }

    /// Host notification: a document was edited
    pub fn process_document_change(&self, event: &DocumentChangeEvent) {
        self.synchronizer.notify_document_changed();
        let detected = self.detector().on_document_change(event);
        if let Some(descriptor) = detected {
            self.push(descriptor);
        }
    }

    /// Host notification: the cursors of the active editor changed
    pub fn process_selection_change(&self, state: &EditorState) {
        self.synchronizer.notify_selection_changed();
        let detected = self.detector().on_selection_change(state);
        if let Some(descriptor) = detected {
            self.push(descriptor);
        }
    }

    /// Announce where the cursors will be after an edit the host is about to
    /// apply, so the resulting selection change is not recorded as a motion
    pub fn expect_selections(&self, selections: &[Selection]) {
        self.detector().set_prediction(selections);
    }

    /// The macro buffer
    pub fn macro_sequence(&self) -> Vec<Descriptor> {
        self.state().macro_buffer.get().to_vec()
    }

    /// The whole history buffer, oldest first
    pub fn history(&self) -> Vec<Descriptor> {
        self.state().history.get().to_vec()
    }

    /// The newest `count` history entries, oldest first
    pub fn recent_history(&self, count: usize) -> Vec<Descriptor> {
        let state = self.state();
        let history = state.history.get();
        history[history.len().saturating_sub(count)..].to_vec()
    }

    /// The macro buffer as a keybinding entry replaying it
    pub fn macro_as_keybinding(&self, key: Option<String>) -> KeybindingEntry {
        KeybindingEntry::playback_of(key, self.state().macro_buffer.get())
    }
}
