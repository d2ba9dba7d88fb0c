mod events;
mod handler;

pub use events::{
    compare_positions, sort_selections, ContentChange, DocumentChangeEvent, DocumentId, EditorState,
    LineLengths, Selection,
};
pub use handler::EditorHost;
