//! Command sequence: the ordered list of descriptors a macro replays

use crate::descriptor::Descriptor;

/// Ordered descriptors; insertion order is replay order.
///
/// With a capacity the sequence keeps only the newest entries (history
/// buffer); without one it grows freely (macro buffer).
#[derive(Debug, Clone, Default)]
pub struct CommandSequence {
    commands: Vec<Descriptor>,
    capacity: Option<usize>,
}

/// Result of fusing two adjacent descriptors
enum Fused {
    Into(Descriptor),
    /// The pair has no net effect
    Cancelled,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence that evicts its oldest entries beyond `capacity`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn push(&mut self, descriptor: Descriptor) {
        self.commands.push(descriptor);
        if let Some(capacity) = self.capacity {
            if self.commands.len() > capacity {
                let excess = self.commands.len() - capacity;
                self.commands.drain(..excess);
            }
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn get(&self) -> &[Descriptor] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Fuse adjacent descriptors whose combined effect is a single descriptor:
    /// consecutive plain typing is concatenated, and a pair of character
    /// motions that cancel out is dropped. Other motions are kept apart, since
    /// a motion clamped at a line or document edge cannot be summed.
    ///
    /// Each incoming descriptor is fused with the current tail, so a cancelled
    /// pair exposes the previous tail to the next descriptor. The output has no
    /// fusible neighbours left, which makes the pass idempotent.
    pub fn optimize(&mut self) {
        let mut optimized: Vec<Descriptor> = Vec::with_capacity(self.commands.len());
        for descriptor in self.commands.drain(..) {
            match optimized.last().and_then(|last| fuse(last, &descriptor)) {
                Some(Fused::Into(fused)) => {
                    if let Some(last) = optimized.last_mut() {
                        *last = fused;
                    }
                }
                Some(Fused::Cancelled) => {
                    optimized.pop();
                }
                None => optimized.push(descriptor),
            }
        }
        crate::verbose_print!(
            "[kb-macro] Optimized sequence: {} descriptor(s)",
            optimized.len()
        );
        self.commands = optimized;
    }
}

fn fuse(prev: &Descriptor, next: &Descriptor) -> Option<Fused> {
    if prev.await_spec.is_some() || next.await_spec.is_some() {
        return None;
    }

    if let (Some(left), Some(right)) = (prev.plain_typing_text(), next.plain_typing_text()) {
        return Some(Fused::Into(Descriptor::typing(left + &right)));
    }

    if let (Some(a), Some(b)) = (prev.character_motion(), next.character_motion()) {
        if a + b == 0 {
            return Some(Fused::Cancelled);
        }
    }

    None
}
