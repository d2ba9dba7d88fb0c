//! Distance to the end of the document, used to stop repeated playback

use crate::host::EditorState;

/// `(lines below, characters right on the line)` from the last cursor in
/// document order. Tuples compare lexicographically.
pub fn distance_below(state: &EditorState) -> (u32, u32) {
    let Some(cursor) = state.last_cursor() else {
        return (0, 0);
    };
    let lines = &state.lines;
    let last_line = lines.line_count() - 1;
    (
        last_line.saturating_sub(cursor.line),
        lines.line_len(cursor.line).saturating_sub(cursor.character),
    )
}

/// Reports the end of the file once the cursor stops getting closer to it
#[derive(Debug, Clone)]
pub struct EndOfFileTracker {
    closest: (u32, u32),
}

impl EndOfFileTracker {
    pub fn new(state: &EditorState) -> Self {
        Self {
            closest: distance_below(state),
        }
    }

    pub fn reached_end_of_file(&mut self, state: &EditorState) -> bool {
        let distance = distance_below(state);
        if distance == (0, 0) || distance >= self.closest {
            crate::verbose_print!("[kb-macro] End of file reached at distance {:?}", distance);
            return true;
        }
        self.closest = distance;
        false
    }
}
