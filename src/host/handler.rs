use super::EditorState;
use crate::error::HostError;
use async_trait::async_trait;
use serde_json::Value;

/// Operations the engine needs from the editor it drives.
///
/// The engine never touches documents itself: every replayed descriptor is
/// forwarded to [`execute`](EditorHost::execute), and editor state reaches the
/// engine as snapshots and change notifications.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Invoke a named editor operation and wait for it to finish
    async fn execute(&self, command: &str, args: Option<&Value>) -> Result<(), HostError>;

    /// Set a context flag usable in keybinding `when` clauses
    fn set_context(&self, key: &str, value: bool);

    /// Show a transient message to the user
    fn show_message(&self, text: &str);

    async fn read_clipboard(&self) -> String;

    /// Snapshot of the focused editor, if any
    fn active_editor(&self) -> Option<EditorState>;

    /// Ask the user how many times to repeat; `None` when dismissed
    async fn prompt_repeat_count(&self) -> Option<String>;
}
