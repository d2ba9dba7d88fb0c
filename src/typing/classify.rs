//! Classification of document changes into typing descriptors
//!
//! Three narrow shapes are recognized; anything else is left unclassified:
//! - plain typing: each change replaces exactly the corresponding selection
//! - code completion: each change replaces a single-line range around an
//!   empty cursor, deleting the same amount left and right of every cursor
//! - bracket completion: a selection gets an opening token inserted at its
//!   start and a closing token at its end; for an empty cursor both land on
//!   the cursor and it ends up between them

use crate::descriptor::{Descriptor, TypeArgs};
use crate::host::{compare_positions, sort_selections, ContentChange, Selection};
use lsp_types::Position;

pub(super) struct Classified {
    pub descriptor: Descriptor,
    /// Expected selections once the change has been applied
    pub prediction: Vec<Selection>,
}

pub(super) fn classify(changes: &[ContentChange], reference: &[Selection]) -> Option<Classified> {
    let mut changes = changes.to_vec();
    changes.sort_by(|a, b| compare_positions(&a.range.start, &b.range.start));
    let selections = sort_selections(reference);

    if changes.len() == selections.len() {
        let text = uniform_text(changes.iter())?;
        return plain_typing(&changes, &selections, text)
            .or_else(|| code_completion(&changes, &selections, text));
    }
    if changes.len() == 2 * selections.len() {
        return bracket_completion(&changes, &selections);
    }
    None
}

/// The text every change inserts, when identical and non-empty
fn uniform_text<'a>(mut changes: impl Iterator<Item = &'a ContentChange>) -> Option<&'a str> {
    let first = changes.next()?.text.as_str();
    if first.is_empty() || !changes.all(|change| change.text == first) {
        return None;
    }
    Some(first)
}

fn plain_typing(changes: &[ContentChange], selections: &[Selection], text: &str) -> Option<Classified> {
    let replaces_selections = changes
        .iter()
        .zip(selections)
        .all(|(change, selection)| change.range == selection.range());
    if !replaces_selections {
        return None;
    }
    Some(Classified {
        descriptor: Descriptor::typing(text),
        prediction: cursors_at(insertion_ends(changes)),
    })
}

fn code_completion(changes: &[ContentChange], selections: &[Selection], text: &str) -> Option<Classified> {
    let mut deletes: Option<(u32, u32)> = None;
    for (change, selection) in changes.iter().zip(selections) {
        let (start, end) = (change.range.start, change.range.end);
        let cursor = selection.active;
        let surrounds_cursor = selection.is_empty()
            && start.line == cursor.line
            && end.line == cursor.line
            && start.character <= cursor.character
            && cursor.character <= end.character
            && start != end;
        if !surrounds_cursor {
            return None;
        }
        let these = (cursor.character - start.character, end.character - cursor.character);
        match deletes {
            Some(previous) if previous != these => return None,
            _ => deletes = Some(these),
        }
    }
    let (delete_left, delete_right) = deletes?;
    Some(Classified {
        descriptor: Descriptor::perform_type(TypeArgs {
            text: text.to_string(),
            delete_left,
            delete_right,
        }),
        prediction: cursors_at(insertion_ends(changes)),
    })
}

fn bracket_completion(changes: &[ContentChange], selections: &[Selection]) -> Option<Classified> {
    let opens = uniform_text(changes.iter().step_by(2))?;
    let closes = uniform_text(changes.iter().skip(1).step_by(2))?;
    if opens.contains('\n') || closes.contains('\n') {
        return None;
    }

    let surrounds_selections = selections.iter().enumerate().all(|(i, selection)| {
        let (open, close) = (&changes[2 * i], &changes[2 * i + 1]);
        open.is_insertion()
            && close.is_insertion()
            && open.range.start == selection.start()
            && close.range.start == selection.end()
    });
    if !surrounds_selections {
        return None;
    }

    let inserts: Vec<Insert> = changes
        .iter()
        .enumerate()
        .map(|(i, change)| Insert {
            at: change.range.start,
            len: utf16_len(&change.text),
            closing: i % 2 == 1,
        })
        .collect();
    let prediction = selections
        .iter()
        .map(|selection| {
            selection.with_ends(
                shift_past(selection.start(), &inserts),
                shift_past(selection.end(), &inserts),
            )
        })
        .collect();

    Some(Classified {
        descriptor: Descriptor::typing(opens),
        prediction,
    })
}

/// Single-line insertion used to shift selection ends
struct Insert {
    at: Position,
    len: u32,
    /// Closing tokens stay after a selection end placed at the same spot
    closing: bool,
}

fn shift_past(position: Position, inserts: &[Insert]) -> Position {
    let shift: u32 = inserts
        .iter()
        .filter(|insert| insert.at.line == position.line)
        .filter(|insert| {
            insert.at.character < position.character
                || (insert.at.character == position.character && !insert.closing)
        })
        .map(|insert| insert.len)
        .sum();
    Position::new(position.line, position.character + shift)
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// Number of line breaks and the length of the last line of `text`
fn text_extent(text: &str) -> (u32, u32) {
    let breaks = text.matches('\n').count() as u32;
    let last_line = text.rsplit('\n').next().unwrap_or("");
    (breaks, utf16_len(last_line))
}

/// Position right after each change's inserted text, in the document as it
/// is once all `changes` (sorted, non-overlapping) have been applied.
///
/// Earlier changes shift later ones: line breaks added or removed move every
/// following line, and an edit on the same line moves the columns after it.
pub(super) fn insertion_ends(changes: &[ContentChange]) -> Vec<Position> {
    let mut ends = Vec::with_capacity(changes.len());
    let mut line_shift: i64 = 0;
    // Original line of the previous change's end, and how far columns after it moved
    let mut column_shift: Option<(u32, i64)> = None;

    for change in changes {
        let (start, end) = (change.range.start, change.range.end);
        let start_line = (i64::from(start.line) + line_shift) as u32;
        let start_character = match column_shift {
            Some((line, shift)) if line == start.line => (i64::from(start.character) + shift) as u32,
            _ => start.character,
        };

        let (breaks, last_len) = text_extent(&change.text);
        let new_end = if breaks == 0 {
            Position::new(start_line, start_character + last_len)
        } else {
            Position::new(start_line + breaks, last_len)
        };

        line_shift += i64::from(breaks) - i64::from(end.line - start.line);
        column_shift = Some((end.line, i64::from(new_end.character) - i64::from(end.character)));
        ends.push(new_end);
    }
    ends
}

fn cursors_at(positions: Vec<Position>) -> Vec<Selection> {
    positions
        .into_iter()
        .map(|position| Selection::new(position, position))
        .collect()
}
