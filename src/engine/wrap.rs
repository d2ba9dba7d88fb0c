//! Wrapped execution: run one host operation and record it

use super::playback::PlaybackOptions;
use super::MacroEngine;
use crate::descriptor::{Descriptor, PLAYBACK, WRAP};
use crate::error::{MacroError, Phase, Result};
use crate::guard::CallOutcome;
use serde_json::Value;

impl MacroEngine {
    /// Execute the operation described by `args` and record it.
    ///
    /// Calls are queued (see `queueSize`); a call arriving while the queue
    /// is full is dropped.
    pub async fn wrap(&self, args: Option<&Value>) -> CallOutcome {
        self.wrap_queue.run(|| self.run_wrap(args)).await
    }

    async fn run_wrap(&self, args: Option<&Value>) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let descriptor = match parse_wrapped(args) {
            Ok(descriptor) => self.settings.complete(descriptor),
            Err(error) => {
                self.report_invalid_argument(&error);
                return Ok(());
            }
        };

        match descriptor.name.as_str() {
            WRAP => {
                crate::verbose_print!("[kb-macro] Recursive wrap dropped");
                Ok(())
            }
            PLAYBACK => {
                self.run_playback(descriptor.args.as_ref(), PlaybackOptions::default())
                    .await
            }
            // Typing detection stays on: the document edits are what gets recorded
            _ if descriptor.is_side_effect() => self.invoke(&descriptor, Phase::Wrap).await,
            _ => {
                self.suspend_detection();
                let result = self.invoke(&descriptor, Phase::Wrap).await;
                self.resume_detection();
                result?;
                self.push(descriptor);
                Ok(())
            }
        }
    }

    /// Execute one operation and wait for the side effects named by its
    /// await spec. Await timeouts are logged, never fatal.
    pub(super) async fn invoke(&self, descriptor: &Descriptor, phase: Phase) -> Result<()> {
        let args = descriptor.args.as_ref();
        let pending = match &descriptor.await_spec {
            Some(spec) => match self.synchronizer.prepare(spec, self.host.as_ref()).await {
                Ok(pending) => Some(pending),
                Err(error) => {
                    tracing::warn!("[kb-macro] '{}': {}", descriptor.name, error);
                    None
                }
            },
            None => None,
        };

        if let Err(error) = self.host.execute(&descriptor.name, args).await {
            // Nothing will wait on the listeners registered above
            self.synchronizer.reset();
            return Err(MacroError::invocation(&descriptor.name, args, phase, error.to_string()));
        }

        if let Some(pending) = pending {
            if let Err(error) = pending.wait(self.settings.await_timeout()).await {
                tracing::warn!("[kb-macro] '{}': {}", descriptor.name, error);
            }
        }
        Ok(())
    }
}

fn parse_wrapped(args: Option<&Value>) -> Result<Descriptor> {
    let args = args.ok_or_else(|| MacroError::invalid_argument("wrap needs an operation"))?;
    serde_json::from_value(args.clone())
        .map_err(|e| MacroError::invalid_argument(format!("wrapped operation: {}", e)))
}
