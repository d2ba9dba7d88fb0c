mod descriptor;
mod engine;
mod eof;
mod error;
mod guard;
mod host;
mod sequence;
mod settings;
mod sync;
mod typing;

#[cfg(test)]
mod testing;

pub use descriptor::{
    CursorMoveArgs, Descriptor, KeybindingEntry, RecordMode, TypeArgs, CURSOR_MOVE, PERFORM_TYPE,
    PLAYBACK, WRAP,
};
pub use engine::{
    parse_playback_args, ChangeReason, EngineEvent, MacroEngine, PlaybackArgs, CONTEXT_ACTIVE,
    CONTEXT_BACKGROUND_RECORDING, CONTEXT_PLAYING, CONTEXT_RECORDING,
};
pub use eof::{distance_below, EndOfFileTracker};
pub use error::{ErrorSink, HostError, MacroError, Phase, Result, TracingSink};
pub use guard::{CallOutcome, CommandGuard, CommandQueue};
pub use host::{
    compare_positions, sort_selections, ContentChange, DocumentChangeEvent, DocumentId,
    EditorHost, EditorState, LineLengths, Selection,
};
pub use sequence::CommandSequence;
pub use settings::{CommandTables, EngineSettings, SettingsIssue};
pub use sync::{parse_await_spec, AwaitSynchronizer, AwaitTarget, PendingWait};
pub use typing::TypingDetector;

/// Build version stamped by build.rs
pub const VERSION: &str = env!("KB_MACRO_BUILD_VERSION");

/// Trace-level engine diagnostics, only visible with a debug subscriber
#[macro_export]
macro_rules! verbose_print {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}
