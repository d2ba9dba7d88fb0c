//! Playback of recorded or supplied sequences

use super::state::{ChangeReason, EngineEvent};
use super::MacroEngine;
use crate::descriptor::{Descriptor, PLAYBACK, WRAP};
use crate::eof::EndOfFileTracker;
use crate::error::{MacroError, Phase, Result};
use crate::guard::CallOutcome;
use serde_json::{json, Value};

/// Validated arguments of the playback operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackArgs {
    pub repeat: u64,
    pub sequence: Option<Vec<Descriptor>>,
}

impl Default for PlaybackArgs {
    fn default() -> Self {
        Self {
            repeat: 1,
            sequence: None,
        }
    }
}

/// Parse `{repeat?: positive integer, sequence?: [descriptor]}`
pub fn parse_playback_args(args: Option<&Value>) -> Result<PlaybackArgs> {
    let Some(args) = args.filter(|args| !args.is_null()) else {
        return Ok(PlaybackArgs::default());
    };
    let Some(object) = args.as_object() else {
        return Err(MacroError::invalid_argument(format!(
            "playback arguments must be an object, got {}",
            args
        )));
    };

    let repeat = match object.get("repeat") {
        None | Some(Value::Null) => 1,
        Some(value) => value.as_u64().filter(|repeat| *repeat > 0).ok_or_else(|| {
            MacroError::invalid_argument(format!("repeat must be a positive integer, got {}", value))
        })?,
    };
    let sequence = match object.get("sequence") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value(value.clone())
                .map_err(|e| MacroError::invalid_argument(format!("sequence: {}", e)))?,
        ),
    };

    Ok(PlaybackArgs { repeat, sequence })
}

/// Parse a repeat count typed by the user
fn parse_repeat_count(input: &str) -> Result<u64> {
    input
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|repeat| *repeat > 0)
        .ok_or_else(|| {
            MacroError::invalid_argument(format!("'{}' is not a positive number", input.trim()))
        })
}

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct PlaybackOptions {
    pub till_end_of_file: bool,
}

impl MacroEngine {
    /// Replay `args.sequence`, or the macro buffer when not recording
    pub async fn playback(&self, args: Option<&Value>) -> CallOutcome {
        self.guard
            .guard(|| self.run_playback(args, PlaybackOptions::default()))
            .await
    }

    /// Ask the host for a count, then replay the macro that many times
    pub async fn repeat_playback(&self) -> CallOutcome {
        self.guard
            .guard(|| async {
                let Some(answer) = self.host.prompt_repeat_count().await else {
                    return Ok(());
                };
                let repeat = match parse_repeat_count(&answer) {
                    Ok(repeat) => repeat,
                    Err(error) => {
                        self.report_invalid_argument(&error);
                        return Ok(());
                    }
                };
                let args = json!({ "repeat": repeat });
                self.run_playback(Some(&args), PlaybackOptions::default())
                    .await
            })
            .await
    }

    /// Replay the macro until the cursor stops approaching the end of file
    pub async fn repeat_playback_till_end_of_file(&self) -> CallOutcome {
        self.guard
            .guard(|| {
                self.run_playback(
                    None,
                    PlaybackOptions {
                        till_end_of_file: true,
                    },
                )
            })
            .await
    }

    /// Stop the running playback before its next step
    pub fn abort_playback(&self) {
        let mut state = self.state();
        if state.playing {
            crate::verbose_print!("[kb-macro] Abort requested");
            state.abort_requested = true;
        }
    }

    pub(super) fn report_invalid_argument(&self, error: &MacroError) {
        tracing::warn!("[kb-macro] {}", error);
        self.host.show_message(&error.to_string());
    }

    /// Playback body; the caller holds the command lock
    pub(super) async fn run_playback(&self, args: Option<&Value>, options: PlaybackOptions) -> Result<()> {
        let args = match parse_playback_args(args) {
            Ok(args) => args,
            Err(error) => {
                self.report_invalid_argument(&error);
                return Ok(());
            }
        };

        let (sequence, record_steps) = {
            let state = self.state();
            let sequence = match args.sequence {
                Some(sequence) => sequence,
                None if state.recording => {
                    crate::verbose_print!("[kb-macro] Playback of the macro being recorded ignored");
                    return Ok(());
                }
                None => state.macro_buffer.get().to_vec(),
            };
            (sequence, state.is_active())
        };
        let sequence: Vec<Descriptor> = sequence
            .into_iter()
            .map(|descriptor| self.settings.complete(descriptor))
            .collect();
        let repeat = (!options.till_end_of_file).then_some(args.repeat);

        self.begin_playback();
        let result = self.play(&sequence, repeat, record_steps).await;
        let reason = match &result {
            Ok(true) => ChangeReason::Finish,
            _ => ChangeReason::Abort,
        };
        self.end_playback(reason);
        result.map(|_| ())
    }

    fn begin_playback(&self) {
        {
            let mut state = self.state();
            state.playing = true;
            state.abort_requested = false;
        }
        self.suspend_detection();
        self.publish(EngineEvent::PlaybackChanged {
            playing: true,
            reason: ChangeReason::Start,
        });
    }

    fn end_playback(&self, reason: ChangeReason) {
        {
            let mut state = self.state();
            state.playing = false;
            state.abort_requested = false;
        }
        self.resume_detection();
        self.publish(EngineEvent::PlaybackChanged {
            playing: false,
            reason,
        });
    }

    fn abort_requested(&self) -> bool {
        self.state().abort_requested
    }

    /// Run the passes; `Ok(false)` when aborted. `repeat` of `None` runs
    /// until the end of file is reached.
    async fn play(&self, sequence: &[Descriptor], repeat: Option<u64>, record_steps: bool) -> Result<bool> {
        let mut tracker = match repeat {
            Some(_) => None,
            None => match self.host.active_editor() {
                Some(editor) => Some(EndOfFileTracker::new(&editor)),
                None => return Ok(true),
            },
        };

        let mut pass: u64 = 0;
        while repeat.map_or(true, |repeat| pass < repeat) {
            for descriptor in sequence {
                if self.abort_requested() {
                    return Ok(false);
                }
                // A recorded side-effect step is captured through its document edits
                let observed = record_steps && descriptor.is_side_effect();
                if observed {
                    self.resume_detection();
                }
                let result = self.play_step(descriptor).await;
                if observed {
                    self.suspend_detection();
                }
                result?;
                if record_steps {
                    self.push(descriptor.clone());
                }
            }
            pass += 1;

            if let Some(tracker) = tracker.as_mut() {
                let reached = match self.host.active_editor() {
                    Some(editor) => tracker.reached_end_of_file(&editor),
                    None => true,
                };
                if reached {
                    break;
                }
            }
        }
        crate::verbose_print!("[kb-macro] Playback finished after {} pass(es)", pass);
        Ok(!self.abort_requested())
    }

    async fn play_step(&self, descriptor: &Descriptor) -> Result<()> {
        match descriptor.name.as_str() {
            // The command lock is held: a nested playback is absorbed
            PLAYBACK => {
                tracing::warn!("[kb-macro] Nested playback in a sequence skipped");
                Ok(())
            }
            WRAP => {
                let inner: Descriptor = descriptor
                    .args
                    .clone()
                    .and_then(|args| serde_json::from_value(args).ok())
                    .ok_or_else(|| {
                        MacroError::invocation(
                            WRAP,
                            descriptor.args.as_ref(),
                            Phase::Playback,
                            "wrapped operation is malformed",
                        )
                    })?;
                self.invoke(&self.settings.complete(inner), Phase::Playback)
                    .await
            }
            _ => self.invoke(descriptor, Phase::Playback).await,
        }
    }
}
