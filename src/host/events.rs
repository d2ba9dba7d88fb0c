//! Typed editor snapshots and change events received from the host
//!
//! Positions follow the LSP convention: 0-indexed lines, UTF-16 columns.

use lsp_types::{Position, Range};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identity of a text document (typically its URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Position ordering in document order
pub fn compare_positions(a: &Position, b: &Position) -> Ordering {
    (a.line, a.character).cmp(&(b.line, b.character))
}

/// One cursor; `anchor == active` for a plain caret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// Empty selection at (line, character)
    pub fn cursor(line: u32, character: u32) -> Self {
        let position = Position::new(line, character);
        Self::new(position, position)
    }

    pub fn start(&self) -> Position {
        match compare_positions(&self.anchor, &self.active) {
            Ordering::Greater => self.active,
            _ => self.anchor,
        }
    }

    pub fn end(&self) -> Position {
        match compare_positions(&self.anchor, &self.active) {
            Ordering::Greater => self.anchor,
            _ => self.active,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }

    pub fn range(&self) -> Range {
        Range::new(self.start(), self.end())
    }

    /// Same orientation, both ends moved
    pub fn with_ends(&self, start: Position, end: Position) -> Self {
        if compare_positions(&self.anchor, &self.active) == Ordering::Greater {
            Self::new(end, start)
        } else {
            Self::new(start, end)
        }
    }
}

/// Sort selections by start position (document order)
pub fn sort_selections(selections: &[Selection]) -> Vec<Selection> {
    let mut sorted = selections.to_vec();
    sorted.sort_by(|a, b| compare_positions(&a.start(), &b.start()));
    sorted
}

/// UTF-16 length of every line, enough to map positions to offsets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineLengths(Vec<u32>);

impl LineLengths {
    pub fn new(lengths: Vec<u32>) -> Self {
        Self(lengths)
    }

    /// Line breaks may be `\n` or `\r\n`; either counts as one offset unit
    pub fn from_text(text: &str) -> Self {
        Self(
            text.split('\n')
                .map(|line| {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    line.encode_utf16().count() as u32
                })
                .collect(),
        )
    }

    pub fn line_count(&self) -> u32 {
        (self.0.len() as u32).max(1)
    }

    pub fn line_len(&self, line: u32) -> u32 {
        self.0.get(line as usize).copied().unwrap_or(0)
    }

    /// Character offset of `position`, columns clamped to the line
    pub fn offset_at(&self, position: Position) -> usize {
        let before: usize = self
            .0
            .iter()
            .take(position.line as usize)
            .map(|len| *len as usize + 1)
            .sum();
        before + position.character.min(self.line_len(position.line)) as usize
    }
}

/// Snapshot of an editor: which document, where the cursors are, how the
/// lines are shaped. Selection-change notifications carry one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorState {
    pub document: DocumentId,
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub lines: LineLengths,
}

impl EditorState {
    pub fn new(document: DocumentId, selections: Vec<Selection>, lines: LineLengths) -> Self {
        Self {
            document,
            selections,
            lines,
        }
    }

    pub fn from_text(document: impl Into<DocumentId>, text: &str, selections: Vec<Selection>) -> Self {
        Self::new(document.into(), selections, LineLengths::from_text(text))
    }

    /// Last cursor in document order
    pub fn last_cursor(&self) -> Option<Position> {
        self.selections
            .iter()
            .map(|selection| selection.active)
            .max_by(compare_positions)
    }
}

/// One edit of a document-change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// Replaced range, in the document before the change
    pub range: Range,
    pub text: String,
}

impl ContentChange {
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// Insertion at (line, character)
    pub fn insert(line: u32, character: u32, text: impl Into<String>) -> Self {
        let position = Position::new(line, character);
        Self::new(Range::new(position, position), text)
    }

    pub fn is_insertion(&self) -> bool {
        self.range.start == self.range.end
    }
}

/// Document mutation notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChangeEvent {
    pub document: DocumentId,
    #[serde(alias = "contentChanges")]
    pub changes: Vec<ContentChange>,
}
