//! Test doubles: a line-buffer editor host and a collecting error sink

use crate::descriptor::{CursorMoveArgs, TypeArgs, CURSOR_MOVE, PERFORM_TYPE};
use crate::error::{ErrorSink, HostError, MacroError};
use crate::host::{DocumentId, EditorHost, EditorState, Selection};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const FAKE_DOCUMENT: &str = "file:///fake.txt";

#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, error: &MacroError) {
        self.messages.lock().unwrap().push(error.to_string());
    }
}

struct Buffer {
    lines: Vec<String>,
    line: usize,
    column: usize,
    clipboard: String,
    contexts: HashMap<String, bool>,
    messages: Vec<String>,
    executed: Vec<String>,
    repeat_answer: Option<String>,
    latency: Duration,
}

impl Buffer {
    fn line_len(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }

    fn last_line(&self) -> usize {
        self.lines.len() - 1
    }

    fn byte_index(&self, line: usize, column: usize) -> usize {
        self.lines[line]
            .char_indices()
            .nth(column)
            .map(|(index, _)| index)
            .unwrap_or(self.lines[line].len())
    }

    fn left(&mut self) {
        if self.column > 0 {
            self.column -= 1;
        } else if self.line > 0 {
            self.line -= 1;
            self.column = self.line_len(self.line);
        }
    }

    fn right(&mut self) {
        if self.column < self.line_len(self.line) {
            self.column += 1;
        } else if self.line < self.last_line() {
            self.line += 1;
            self.column = 0;
        }
    }

    fn vertical(&mut self, down: bool) {
        self.line = if down {
            (self.line + 1).min(self.last_line())
        } else {
            self.line.saturating_sub(1)
        };
        self.column = self.column.min(self.line_len(self.line));
    }

    fn delete_left(&mut self) {
        if self.column > 0 {
            let at = self.byte_index(self.line, self.column - 1);
            self.lines[self.line].remove(at);
            self.column -= 1;
        } else if self.line > 0 {
            let removed = self.lines.remove(self.line);
            self.line -= 1;
            self.column = self.line_len(self.line);
            self.lines[self.line].push_str(&removed);
        }
    }

    fn delete_right(&mut self) {
        if self.column < self.line_len(self.line) {
            let at = self.byte_index(self.line, self.column);
            self.lines[self.line].remove(at);
        } else if self.line < self.last_line() {
            let removed = self.lines.remove(self.line + 1);
            self.lines[self.line].push_str(&removed);
        }
    }

    fn insert(&mut self, text: &str) {
        let at = self.byte_index(self.line, self.column);
        let tail = self.lines[self.line].split_off(at);
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            self.lines[self.line].push_str(first);
            self.column += first.chars().count();
        }
        for piece in pieces {
            self.line += 1;
            self.lines.insert(self.line, piece.to_string());
            self.column = piece.chars().count();
        }
        self.lines[self.line].push_str(&tail);
    }

    fn apply(&mut self, command: &str, args: Option<&Value>) -> Result<(), HostError> {
        match command {
            "cursorEnd" => self.column = self.line_len(self.line),
            "cursorHome" => self.column = 0,
            "cursorLeft" => self.left(),
            "cursorRight" => self.right(),
            "cursorDown" => self.vertical(true),
            "cursorUp" => self.vertical(false),
            "deleteLeft" => self.delete_left(),
            "deleteRight" => self.delete_right(),
            "copyLine" => self.clipboard = self.lines[self.line].clone(),
            PERFORM_TYPE => {
                let args: TypeArgs = parse_args(args)?;
                for _ in 0..args.delete_left {
                    self.delete_left();
                }
                for _ in 0..args.delete_right {
                    self.delete_right();
                }
                self.insert(&args.text);
            }
            CURSOR_MOVE => {
                let args: CursorMoveArgs = parse_args(args)?;
                for _ in 0..args.value {
                    match args.to.as_str() {
                        "left" => self.left(),
                        "right" => self.right(),
                        "up" => self.vertical(false),
                        "down" => self.vertical(true),
                        other => return Err(HostError::new(format!("unsupported direction {}", other))),
                    }
                }
            }
            "fail" => return Err(HostError::new("command failed on purpose")),
            other => return Err(HostError::new(format!("command '{}' not found", other))),
        }
        Ok(())
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Option<&Value>) -> Result<T, HostError> {
    let args = args.cloned().unwrap_or(Value::Null);
    serde_json::from_value(args).map_err(|e| HostError::new(e.to_string()))
}

/// Single-cursor editor over a line buffer. Columns count chars, so tests
/// stick to text where that equals UTF-16 units.
pub struct FakeEditor {
    buffer: Mutex<Buffer>,
}

impl FakeEditor {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: Mutex::new(Buffer {
                lines: text.split('\n').map(str::to_string).collect(),
                line: 0,
                column: 0,
                clipboard: String::new(),
                contexts: HashMap::new(),
                messages: Vec::new(),
                executed: Vec::new(),
                repeat_answer: None,
                latency: Duration::ZERO,
            }),
        }
    }

    fn buffer(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap()
    }

    pub fn text(&self) -> String {
        self.buffer().lines.join("\n")
    }

    pub fn line(&self, line: usize) -> String {
        self.buffer().lines[line].clone()
    }

    pub fn cursor(&self) -> (u32, u32) {
        let buffer = self.buffer();
        (buffer.line as u32, buffer.column as u32)
    }

    pub fn set_cursor(&self, line: u32, column: u32) {
        let mut buffer = self.buffer();
        buffer.line = line as usize;
        buffer.column = column as usize;
    }

    pub fn set_clipboard(&self, text: &str) {
        self.buffer().clipboard = text.to_string();
    }

    pub fn set_repeat_answer(&self, answer: Option<&str>) {
        self.buffer().repeat_answer = answer.map(str::to_string);
    }

    /// Delay every command by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.buffer().latency = latency;
    }

    pub fn context(&self, key: &str) -> Option<bool> {
        self.buffer().contexts.get(key).copied()
    }

    pub fn messages(&self) -> Vec<String> {
        self.buffer().messages.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.buffer().executed.clone()
    }
}

#[async_trait]
impl EditorHost for FakeEditor {
    async fn execute(&self, command: &str, args: Option<&Value>) -> Result<(), HostError> {
        let latency = self.buffer().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut buffer = self.buffer();
        buffer.executed.push(command.to_string());
        buffer.apply(command, args)
    }

    fn set_context(&self, key: &str, value: bool) {
        self.buffer().contexts.insert(key.to_string(), value);
    }

    fn show_message(&self, text: &str) {
        self.buffer().messages.push(text.to_string());
    }

    async fn read_clipboard(&self) -> String {
        self.buffer().clipboard.clone()
    }

    fn active_editor(&self) -> Option<EditorState> {
        let buffer = self.buffer();
        let cursor = Selection::cursor(buffer.line as u32, buffer.column as u32);
        Some(EditorState::from_text(
            DocumentId::from(FAKE_DOCUMENT),
            &buffer.lines.join("\n"),
            vec![cursor],
        ))
    }

    async fn prompt_repeat_count(&self) -> Option<String> {
        self.buffer().repeat_answer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    #[test]
    fn test_fake_editor_editing() {
        let editor = FakeEditor::new("ab\ncd");
        editor.set_cursor(0, 2);
        editor.buffer().apply("deleteRight", None).unwrap();
        assert_eq!(editor.text(), "abcd");

        let args = serde_json::json!({ "text": "X\nY", "deleteLeft": 1 });
        editor.buffer().apply(PERFORM_TYPE, Some(&args)).unwrap();
        assert_eq!(editor.text(), "aX\nYcd");
        assert_eq!(editor.cursor(), (1, 1));
        assert_eq!(
            editor.active_editor().map(|state| state.selections),
            Some(vec![Selection::new(Position::new(1, 1), Position::new(1, 1))])
        );
    }
}
