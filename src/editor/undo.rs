//! The single undo/redo slot.
//!
//! Exactly one [`UndoRecord`] exists at a time across every canvas sharing
//! an editor context. Installing a new record frees the old payload;
//! undoing flips the record to [`UndoState::Redoable`] and redoing flips it
//! back. The per-kind handlers that actually mutate the canvas live in
//! [`super::operations`]; this module only guards state and ownership.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.set_undo(canvas, UndoAction::Move(entries), "motion");
//! let mut rec = stack.begin(canvas, Direction::Undo)?;
//! // ... run the handler on rec.action ...
//! stack.finish(rec, Direction::Undo);
//! assert_eq!(stack.state(), Some(UndoState::Redoable));
//! ```

use crate::error::{EditorError, EditorResult};
use crate::model::{CanvasId, ConnectRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Undoable,
    Redoable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Connect,
    Disconnect,
    CutClearOrType,
    Move,
    Paste,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutMode {
    Cut,
    Clear,
    TypedText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutPayload {
    pub mode: CutMode,
    /// Serialized objects that were removed or retyped.
    pub objects: Vec<u8>,
    /// Edges with exactly one selected endpoint, numbered as after the
    /// removed objects are re-inserted at the end of the list.
    pub reconnect: Vec<ConnectRecord>,
    /// Original list positions of the removed objects, ascending.
    pub positions: Vec<usize>,
    /// Final text state, captured on the first undo of a typing record.
    pub redo_text: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEntry {
    pub index: usize,
    pub x: i32,
    pub y: i32,
}

/// Text width of one object, in columns; `None` means automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEntry {
    pub index: usize,
    pub width: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PastePayload {
    /// Index of the first pasted object.
    pub onset: usize,
    /// What was pasted, for redo.
    pub buffer: Vec<u8>,
    /// Displacement applied after pasting.
    pub offset: (i32, i32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    Connect(ConnectRecord),
    Disconnect(ConnectRecord),
    CutClearOrType(CutPayload),
    Move(Vec<MoveEntry>),
    Paste(PastePayload),
    Resize(ResizeEntry),
}

impl UndoAction {
    pub fn kind(&self) -> UndoKind {
        match self {
            UndoAction::Connect(_) => UndoKind::Connect,
            UndoAction::Disconnect(_) => UndoKind::Disconnect,
            UndoAction::CutClearOrType(_) => UndoKind::CutClearOrType,
            UndoAction::Move(_) => UndoKind::Move,
            UndoAction::Paste(_) => UndoKind::Paste,
            UndoAction::Resize(_) => UndoKind::Resize,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoRecord {
    pub canvas: CanvasId,
    pub action: UndoAction,
    pub name: String,
    pub state: UndoState,
}

#[derive(Debug, Default)]
pub struct UndoStack {
    slot: Option<UndoRecord>,
    freed: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new undoable action, freeing whatever was there.
    pub fn set_undo(&mut self, canvas: CanvasId, action: UndoAction, name: &str) {
        tracing::debug!(
            target: "patchedit::undo",
            "set undo {:?} \"{}\" on {}",
            action.kind(),
            name,
            canvas
        );
        if self.slot.take().is_some() {
            self.freed += 1;
        }
        self.slot = Some(UndoRecord {
            canvas,
            action,
            name: name.to_string(),
            state: UndoState::Undoable,
        });
    }

    /// Re-arm the current payload under a new name without freeing it.
    /// Returns false if there is nothing on `canvas` to reinstall.
    pub fn reinstall(&mut self, canvas: CanvasId, name: &str) -> bool {
        match self.slot.as_mut() {
            Some(rec) if rec.canvas == canvas => {
                rec.name = name.to_string();
                rec.state = UndoState::Undoable;
                true
            }
            _ => false,
        }
    }

    /// Drop the record. With `Some(canvas)`, only if it belongs to that canvas.
    pub fn clear_undo(&mut self, canvas: Option<CanvasId>) {
        let matches = match (&self.slot, canvas) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(rec), Some(c)) => rec.canvas == c,
        };
        if matches {
            self.slot = None;
            self.freed += 1;
        }
    }

    pub fn current(&self) -> Option<&UndoRecord> {
        self.slot.as_ref()
    }

    pub fn state(&self) -> Option<UndoState> {
        self.slot.as_ref().map(|r| r.state)
    }

    pub fn kind(&self) -> Option<UndoKind> {
        self.slot.as_ref().map(|r| r.action.kind())
    }

    /// Number of payloads freed so far.
    pub fn payloads_freed(&self) -> usize {
        self.freed
    }

    /// Menu labels: `(undo, redo)`.
    pub fn menu(&self) -> (Option<&str>, Option<&str>) {
        match &self.slot {
            Some(rec) if rec.state == UndoState::Undoable => (Some(rec.name.as_str()), None),
            Some(rec) => (None, Some(rec.name.as_str())),
            None => (None, None),
        }
    }

    /// Take the record out for `dir` on `canvas`. The record stays in place
    /// on error.
    pub fn begin(&mut self, canvas: CanvasId, dir: Direction) -> EditorResult<UndoRecord> {
        let wanted = match dir {
            Direction::Undo => UndoState::Undoable,
            Direction::Redo => UndoState::Redoable,
        };
        let label = match dir {
            Direction::Undo => "canvas_undo",
            Direction::Redo => "canvas_redo",
        };
        match &self.slot {
            None => Err(EditorError::bug(format!("{label}: nothing to {dir:?}"))),
            Some(rec) if rec.canvas != canvas => Err(EditorError::bug(format!(
                "{label} 1: record belongs to {}, not {canvas}",
                rec.canvas
            ))),
            Some(rec) if rec.state != wanted => Err(EditorError::bug(format!(
                "{label} 2: state is {:?}",
                rec.state
            ))),
            Some(_) => self
                .slot
                .take()
                .ok_or_else(|| EditorError::bug(format!("{label}: slot vanished"))),
        }
    }

    /// Put a record back after its handler ran, flipping its state.
    pub fn finish(&mut self, mut record: UndoRecord, dir: Direction) {
        record.state = match dir {
            Direction::Undo => UndoState::Redoable,
            Direction::Redo => UndoState::Undoable,
        };
        tracing::debug!(
            target: "patchedit::undo",
            "{:?} \"{}\" done, now {:?}",
            dir,
            record.name,
            record.state
        );
        if self.slot.is_some() {
            // a handler installed a record of its own; ours is superseded
            self.freed += 1;
            return;
        }
        self.slot = Some(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: CanvasId = CanvasId(1);
    const B: CanvasId = CanvasId(2);

    fn connect() -> UndoAction {
        UndoAction::Connect(ConnectRecord::new(0, 0, 1, 0))
    }

    #[test]
    fn test_set_undo_frees_previous_exactly_once() {
        let mut s = UndoStack::new();
        s.set_undo(A, connect(), "connect");
        assert_eq!(s.payloads_freed(), 0);
        s.set_undo(A, UndoAction::Move(vec![]), "motion");
        assert_eq!(s.payloads_freed(), 1);
        assert_eq!(s.kind(), Some(UndoKind::Move));
    }

    #[test]
    fn test_reinstall_does_not_free() {
        let mut s = UndoStack::new();
        s.set_undo(A, UndoAction::Move(vec![]), "motion");
        assert!(s.reinstall(A, "tidy"));
        assert_eq!(s.payloads_freed(), 0);
        assert_eq!(s.menu(), (Some("tidy"), None));
        assert!(!s.reinstall(B, "tidy"));
    }

    #[test]
    fn test_clear_undo_scoped_to_canvas() {
        let mut s = UndoStack::new();
        s.set_undo(A, connect(), "connect");
        s.clear_undo(Some(B));
        assert!(s.current().is_some());
        s.clear_undo(Some(A));
        assert!(s.current().is_none());
        s.set_undo(B, connect(), "connect");
        s.clear_undo(None);
        assert!(s.current().is_none());
        assert_eq!(s.payloads_freed(), 2);
    }

    #[test]
    fn test_state_guards() {
        let mut s = UndoStack::new();
        assert!(s.begin(A, Direction::Undo).unwrap_err().is_bug());
        s.set_undo(A, connect(), "connect");
        assert!(s.begin(B, Direction::Undo).unwrap_err().is_bug(), "wrong canvas");
        assert!(s.begin(A, Direction::Redo).unwrap_err().is_bug(), "not redoable yet");
        let rec = s.begin(A, Direction::Undo).unwrap();
        s.finish(rec, Direction::Undo);
        assert_eq!(s.state(), Some(UndoState::Redoable));
        assert_eq!(s.menu(), (None, Some("connect")));
        let err = s.begin(A, Direction::Undo).unwrap_err();
        assert!(err.to_string().contains("canvas_undo 2"));
        assert_eq!(s.state(), Some(UndoState::Redoable), "record kept after rejection");
    }

    #[test]
    fn test_direction_flip() {
        assert_eq!(Direction::Undo.flipped(), Direction::Redo);
        assert_eq!(Direction::Redo.flipped(), Direction::Undo);
    }
}
