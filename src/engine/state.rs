//! State notifications: host context flags and engine event subscribers

use super::MacroEngine;
use tokio::sync::mpsc;

pub const CONTEXT_RECORDING: &str = "kb-macro.recording";
pub const CONTEXT_BACKGROUND_RECORDING: &str = "kb-macro.backgroundRecording";
pub const CONTEXT_ACTIVE: &str = "kb-macro.active";
pub const CONTEXT_PLAYING: &str = "kb-macro.playing";

/// Why a state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    Start,
    Cancel,
    Finish,
    Abort,
}

/// State transition published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    RecordingChanged { recording: bool, reason: ChangeReason },
    BackgroundRecordingChanged { enabled: bool, reason: ChangeReason },
    PlaybackChanged { playing: bool, reason: ChangeReason },
}

impl MacroEngine {
    /// Receive every subsequent state transition
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state().observers.push(sender);
        receiver
    }

    /// Push the context flags to the host and notify subscribers
    pub(super) fn publish(&self, event: EngineEvent) {
        crate::verbose_print!("[kb-macro] {:?}", event);

        let flags = {
            let state = self.state();
            [
                (CONTEXT_RECORDING, state.recording),
                (CONTEXT_BACKGROUND_RECORDING, state.background_recording),
                (CONTEXT_ACTIVE, state.is_active()),
                (CONTEXT_PLAYING, state.playing),
            ]
        };
        for (key, value) in flags {
            self.host.set_context(key, value);
        }

        // Closed receivers are dropped here
        self.state()
            .observers
            .retain(|observer| observer.send(event.clone()).is_ok());
    }

    /// Start or stop typing detection when the active state flips
    pub(super) fn active_changed(&self, was_active: bool) {
        let is_active = self.is_active();
        if was_active == is_active {
            return;
        }
        if is_active {
            let editor = self.host.active_editor();
            self.detector().start(editor.as_ref());
        } else {
            self.detector().stop();
        }
    }

    /// Keep the detector away from effects of operations the engine runs itself
    pub(super) fn suspend_detection(&self) {
        self.detector().suspend();
    }

    pub(super) fn resume_detection(&self) {
        let editor = self.host.active_editor();
        self.detector().resume(editor.as_ref());
    }
}
