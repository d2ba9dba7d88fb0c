//! Operation descriptors: the replayable unit of a macro

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The engine's own keybinding entry point
pub const WRAP: &str = "kb-macro.wrap";
pub const PLAYBACK: &str = "kb-macro.playback";
/// Typing replayed by the host: `{text, deleteLeft?, deleteRight?}`
pub const PERFORM_TYPE: &str = "internal:performType";
/// Editor cursor motion: `{to, by, value, select?}`
pub const CURSOR_MOVE: &str = "cursorMove";

/// How an executed operation is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordMode {
    /// Recorded as a replayable descriptor (default)
    Command,
    /// Executed only; its effects are observed through document events
    SideEffect,
}

/// One recorded operation invocation
///
/// Equality ignores `record`: two descriptors are the same operation when the
/// name, the arguments and the await spec match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "command", alias = "name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(
        rename = "await",
        alias = "awaitSpec",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub await_spec: Option<String>,
    #[serde(
        rename = "record",
        alias = "recordMode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub record: Option<RecordMode>,
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args && self.await_spec == other.await_spec
    }
}

impl Eq for Descriptor {}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
            await_spec: None,
            record: None,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_await(mut self, spec: impl Into<String>) -> Self {
        self.await_spec = Some(spec.into());
        self
    }

    pub fn with_record(mut self, record: RecordMode) -> Self {
        self.record = Some(record);
        self
    }

    /// Plain typing of `text` at every cursor
    pub fn typing(text: impl Into<String>) -> Self {
        Self::perform_type(TypeArgs {
            text: text.into(),
            ..Default::default()
        })
    }

    pub fn perform_type(args: TypeArgs) -> Self {
        // TypeArgs always serializes to an object
        let value = serde_json::to_value(&args).unwrap_or_else(|_| json!({ "text": args.text }));
        Self::new(PERFORM_TYPE).with_args(value)
    }

    /// Character-wise cursor motion; negative deltas move left
    pub fn cursor_motion(delta: i64) -> Self {
        let to = if delta < 0 { "left" } else { "right" };
        Self::new(CURSOR_MOVE).with_args(json!({
            "to": to,
            "by": "character",
            "value": delta.unsigned_abs(),
        }))
    }

    pub fn is_side_effect(&self) -> bool {
        self.record == Some(RecordMode::SideEffect)
    }

    pub fn type_args(&self) -> Option<TypeArgs> {
        if self.name != PERFORM_TYPE {
            return None;
        }
        serde_json::from_value(self.args.clone()?).ok()
    }

    /// Text of a typing descriptor that deletes nothing around the cursor
    pub fn plain_typing_text(&self) -> Option<String> {
        self.type_args()
            .filter(|args| args.delete_left == 0 && args.delete_right == 0)
            .map(|args| args.text)
    }

    /// Signed character delta of a non-selecting left/right `cursorMove`
    pub fn character_motion(&self) -> Option<i64> {
        if self.name != CURSOR_MOVE {
            return None;
        }
        let args: CursorMoveArgs = serde_json::from_value(self.args.clone()?).ok()?;
        if args.select || !matches!(args.by.as_deref(), None | Some("character")) {
            return None;
        }
        match args.to.as_str() {
            "left" => Some(-i64::from(args.value)),
            "right" => Some(i64::from(args.value)),
            _ => None,
        }
    }
}

/// Arguments of [`PERFORM_TYPE`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeArgs {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delete_left: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delete_right: u32,
}

/// Arguments of [`CURSOR_MOVE`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorMoveArgs {
    pub to: String,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default = "default_move_value")]
    pub value: u32,
    #[serde(default)]
    pub select: bool,
}

fn default_move_value() -> u32 {
    1
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Keybinding table entry, as exchanged with the host's keybinding file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeybindingEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<String>,
}

impl KeybindingEntry {
    /// Keybinding that replays `sequence` through the playback operation
    pub fn playback_of(key: Option<String>, sequence: &[Descriptor]) -> Self {
        Self {
            key,
            command: PLAYBACK.to_string(),
            args: Some(json!({ "sequence": sequence })),
            when: None,
            mac: None,
            win: None,
            linux: None,
        }
    }
}
