//! Interactive editing core.
//!
//! - **Selection**: ordered set of selected objects plus one selected cord
//! - **Undo**: a single undo/redo slot shared by every canvas of a session
//! - **Graph**: cord traversal, validation and hit-testing
//! - **State machine**: mouse and key gestures per canvas, including box resizing
//! - **Operations**: copy, cut, paste, duplicate, clear, select-all, tidy
//!   and the undo handlers
//! - **Session**: the context object and the exposed entry points

pub mod graph;
pub mod operations;
pub mod selection;
pub mod session;
pub mod state;
pub mod undo;

pub use graph::{Edge, EdgeCursor, can_connect, edges, hit_line, is_connected};
pub use selection::{Selection, SelectionRect};
pub use session::{EditorContext, LastClick, Session};
pub use state::{CanvasEditor, EditorMode};
pub use undo::{
    CutMode, CutPayload, Direction, MoveEntry, PastePayload, ResizeEntry, UndoAction, UndoKind,
    UndoRecord, UndoStack, UndoState,
};
