//! Recording and background recording transitions

use super::state::{ChangeReason, EngineEvent};
use super::MacroEngine;
use crate::guard::CallOutcome;

impl MacroEngine {
    /// Begin a new recording into an emptied macro buffer
    pub fn start_recording(&self) -> CallOutcome {
        self.guard.guard_sync(|| {
            let was_active = {
                let mut state = self.state();
                if state.recording {
                    return Ok(());
                }
                let was_active = state.is_active();
                state.macro_buffer.clear();
                state.recording = true;
                was_active
            };
            self.active_changed(was_active);
            self.publish(EngineEvent::RecordingChanged {
                recording: true,
                reason: ChangeReason::Start,
            });
            Ok(())
        })
    }

    /// Stop recording and discard what was recorded
    pub fn cancel_recording(&self) -> CallOutcome {
        self.guard.guard_sync(|| {
            self.end_recording(ChangeReason::Cancel);
            Ok(())
        })
    }

    /// Stop recording and keep the optimized macro
    pub fn finish_recording(&self) -> CallOutcome {
        self.guard.guard_sync(|| {
            self.end_recording(ChangeReason::Finish);
            Ok(())
        })
    }

    fn end_recording(&self, reason: ChangeReason) {
        {
            let mut state = self.state();
            if !state.recording {
                return;
            }
            match reason {
                ChangeReason::Cancel => state.macro_buffer.clear(),
                _ => state.macro_buffer.optimize(),
            }
            state.recording = false;
        }
        // Background recording may keep the engine active
        self.active_changed(true);
        self.publish(EngineEvent::RecordingChanged {
            recording: false,
            reason,
        });
    }

    /// Start capturing into the rolling history buffer
    pub async fn start_background_recording(&self) -> CallOutcome {
        self.background_queue
            .run(|| async {
                let was_active = {
                    let mut state = self.state();
                    if state.background_recording {
                        return Ok(());
                    }
                    let was_active = state.is_active();
                    state.history.clear();
                    state.background_recording = true;
                    was_active
                };
                self.active_changed(was_active);
                self.publish(EngineEvent::BackgroundRecordingChanged {
                    enabled: true,
                    reason: ChangeReason::Start,
                });
                Ok(())
            })
            .await
    }

    /// Stop capturing history; recorded entries stay queryable
    pub async fn stop_background_recording(&self) -> CallOutcome {
        self.background_queue
            .run(|| async {
                {
                    let mut state = self.state();
                    if !state.background_recording {
                        return Ok(());
                    }
                    state.background_recording = false;
                }
                self.active_changed(true);
                self.publish(EngineEvent::BackgroundRecordingChanged {
                    enabled: false,
                    reason: ChangeReason::Finish,
                });
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::{Descriptor, RecordMode};
    use crate::engine::tests::engine_with;
    use crate::engine::{ChangeReason, EngineEvent};
    use crate::guard::CallOutcome;
    use crate::settings::EngineSettings;

    #[tokio::test]
    async fn test_recording_lifecycle() {
        let (engine, _, _) = engine_with("", EngineSettings::default());
        assert!(!engine.is_active());

        assert_eq!(engine.start_recording(), CallOutcome::Completed);
        assert!(engine.is_recording() && engine.is_active());

        engine.push(Descriptor::typing("a"));
        engine.push(Descriptor::typing("b"));
        engine.finish_recording();

        assert!(!engine.is_recording());
        assert_eq!(engine.macro_sequence(), vec![Descriptor::typing("ab")]);
    }

    #[tokio::test]
    async fn test_start_recording_twice_keeps_buffer() {
        let (engine, _, _) = engine_with("", EngineSettings::default());
        let mut events = engine.subscribe();

        engine.start_recording();
        engine.push(Descriptor::new("cursorDown"));
        engine.start_recording();
        assert_eq!(engine.macro_sequence().len(), 1);

        engine.cancel_recording();
        assert!(engine.macro_sequence().is_empty());

        let mut reasons = Vec::new();
        while let Ok(event) = events.try_recv() {
            reasons.push(event);
        }
        assert_eq!(
            reasons,
            vec![
                EngineEvent::RecordingChanged {
                    recording: true,
                    reason: ChangeReason::Start
                },
                EngineEvent::RecordingChanged {
                    recording: false,
                    reason: ChangeReason::Cancel
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_finish_without_recording_is_silent() {
        let (engine, _, _) = engine_with("", EngineSettings::default());
        let mut events = engine.subscribe();
        engine.finish_recording();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_routes_to_active_buffers() {
        let (engine, _, _) = engine_with(
            "",
            EngineSettings {
                history_capacity: 2,
                ..Default::default()
            },
        );

        // Inactive: nothing recorded anywhere
        engine.push(Descriptor::new("cursorUp"));

        engine.start_background_recording().await;
        engine.push(Descriptor::new("cursorDown"));
        engine.start_recording();
        engine.push(Descriptor::new("cursorLeft"));
        engine.push(Descriptor::new("cursorRight").with_record(RecordMode::SideEffect));
        engine.push(Descriptor::new("cursorEnd"));

        assert_eq!(
            engine.macro_sequence(),
            vec![Descriptor::new("cursorLeft"), Descriptor::new("cursorEnd")]
        );
        // Oldest history entry evicted
        assert_eq!(
            engine.history(),
            vec![Descriptor::new("cursorLeft"), Descriptor::new("cursorEnd")]
        );
        assert_eq!(engine.recent_history(1), vec![Descriptor::new("cursorEnd")]);
        assert_eq!(engine.recent_history(10).len(), 2);

        engine.stop_background_recording().await;
        engine.push(Descriptor::new("cursorHome"));
        assert_eq!(engine.history().len(), 2);
        assert!(engine.is_active());
    }
}
