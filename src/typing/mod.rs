//! Typing and implicit cursor motion detection
//!
//! Turns raw document and selection notifications into replayable
//! descriptors. Every classified edit leaves a prediction of where the
//! cursors should end up; the next selection notification is checked
//! against it, and any discrepancy (auto-indent, bracket skipping, ...) is
//! recorded as an implicit cursor motion.
//!
//! The host is expected to deliver a document change before the selection
//! change it causes. A selection change that arrives first is compared with
//! the previous baseline instead and may be recorded as a motion.

mod classify;

use crate::descriptor::Descriptor;
use crate::host::{sort_selections, DocumentChangeEvent, EditorState, LineLengths, Selection};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct TypingDetector {
    recording: bool,
    suspended: bool,
    /// Last known editor snapshot; its document is the detection target
    current: Option<EditorState>,
    /// Expected selections after pending edits, oldest first (sorted)
    predictions: VecDeque<Vec<Selection>>,
}

impl TypingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, editor: Option<&EditorState>) {
        self.recording = true;
        self.suspended = false;
        self.rebaseline(editor);
        crate::verbose_print!("[kb-macro] Typing detection started");
    }

    pub fn stop(&mut self) {
        self.recording = false;
        self.suspended = false;
        self.current = None;
        self.predictions.clear();
        crate::verbose_print!("[kb-macro] Typing detection stopped");
    }

    /// Ignore notifications until [`resume`](Self::resume)
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self, editor: Option<&EditorState>) {
        self.suspended = false;
        self.rebaseline(editor);
    }

    pub fn is_enabled(&self) -> bool {
        self.recording && !self.suspended
    }

    /// Expect `selections` after the next edit instead of treating the
    /// resulting cursor change as user motion
    pub fn set_prediction(&mut self, selections: &[Selection]) {
        if self.is_enabled() {
            self.predictions.push_back(sort_selections(selections));
        }
    }

    pub fn pending_predictions(&self) -> usize {
        self.predictions.len()
    }

    fn rebaseline(&mut self, editor: Option<&EditorState>) {
        self.current = editor.cloned();
        self.predictions.clear();
    }

    pub fn on_document_change(&mut self, event: &DocumentChangeEvent) -> Option<Descriptor> {
        if !self.is_enabled() || event.changes.is_empty() {
            return None;
        }
        let current = self.current.as_ref()?;
        if current.document != event.document {
            return None;
        }

        // Cursors as they stand just before this edit
        let reference = self
            .predictions
            .back()
            .cloned()
            .unwrap_or_else(|| current.selections.clone());

        match classify::classify(&event.changes, &reference) {
            Some(classified) => {
                crate::verbose_print!(
                    "[kb-macro] Detected typing: {:?}",
                    classified.descriptor.args
                );
                self.predictions.push_back(classified.prediction);
                Some(classified.descriptor)
            }
            None => {
                crate::verbose_print!(
                    "[kb-macro] Unclassified document change ({} edit(s)) dropped",
                    event.changes.len()
                );
                None
            }
        }
    }

    pub fn on_selection_change(&mut self, event: &EditorState) -> Option<Descriptor> {
        if !self.is_enabled() {
            return None;
        }
        let same_document = self
            .current
            .as_ref()
            .is_some_and(|current| current.document == event.document);
        if !same_document {
            // Switched editors: adopt the new one without recording anything
            self.rebaseline(Some(event));
            return None;
        }

        let expected = match self.predictions.pop_front() {
            Some(predicted) => predicted,
            None => sort_selections(&self.current.as_ref()?.selections),
        };
        let actual = sort_selections(&event.selections);

        let motion = if expected == actual {
            None
        } else {
            implicit_motion(&expected, &actual, &event.lines)
        };
        if let Some(motion) = &motion {
            crate::verbose_print!("[kb-macro] Detected cursor motion: {:?}", motion.args);
        }

        self.current = Some(event.clone());
        motion
    }
}

/// Character motion taking the first expected cursor to the first actual one
fn implicit_motion(expected: &[Selection], actual: &[Selection], lines: &LineLengths) -> Option<Descriptor> {
    let (expected, actual) = (expected.first()?, actual.first()?);
    let delta = lines.offset_at(actual.active) as i64 - lines.offset_at(expected.active) as i64;
    (delta != 0).then(|| Descriptor::cursor_motion(delta))
}
