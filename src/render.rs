//! Write-only drawing seam.
//!
//! The editor describes what changed in terms of tagged shapes; how (or
//! whether) anything is painted is up to the [`Renderer`] implementation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::{Point, Rect};
use crate::input::Cursor;
use crate::model::{CanvasId, ObjectId};

/// Identity of a drawn primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Object(ObjectId),
    Cord {
        src: ObjectId,
        outlet: usize,
        dst: ObjectId,
        inlet: usize,
    },
    /// Selection rubber band.
    RubberBand,
    /// Cord being dragged out of an outlet.
    TentativeCord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect(Rect),
    Line { from: Point, to: Point, signal: bool },
    Text { rect: Rect, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Normal,
    Selected,
}

/// Caret or selection inside a text widget, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCursor {
    Caret(usize),
    /// Inclusive range `from..=to`.
    Range { from: usize, to: usize },
}

impl TextCursor {
    pub fn from_chars(start: usize, end: usize) -> Self {
        if end > start {
            TextCursor::Range {
                from: start,
                to: end - 1,
            }
        } else {
            TextCursor::Caret(start)
        }
    }
}

pub trait Renderer {
    fn create(&mut self, canvas: CanvasId, tag: Tag, shape: Shape);
    fn delete(&mut self, canvas: CanvasId, tag: Tag);
    fn move_by(&mut self, canvas: CanvasId, tag: Tag, dx: i32, dy: i32);
    /// Replace the geometry of an existing primitive.
    fn set_coords(&mut self, canvas: CanvasId, tag: Tag, shape: Shape);
    fn recolor(&mut self, canvas: CanvasId, tag: Tag, highlight: Highlight);
    fn text_cursor(&mut self, canvas: CanvasId, obj: ObjectId, cursor: TextCursor);
    fn set_cursor(&mut self, canvas: CanvasId, cursor: Cursor);
    /// Labels for the undo and redo menu entries; `None` disables an entry.
    fn undo_menu(&mut self, undo: Option<&str>, redo: Option<&str>);
    /// Transient status-line message.
    fn status(&mut self, canvas: CanvasId, message: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn create(&mut self, _: CanvasId, _: Tag, _: Shape) {}
    fn delete(&mut self, _: CanvasId, _: Tag) {}
    fn move_by(&mut self, _: CanvasId, _: Tag, _: i32, _: i32) {}
    fn set_coords(&mut self, _: CanvasId, _: Tag, _: Shape) {}
    fn recolor(&mut self, _: CanvasId, _: Tag, _: Highlight) {}
    fn text_cursor(&mut self, _: CanvasId, _: ObjectId, _: TextCursor) {}
    fn set_cursor(&mut self, _: CanvasId, _: Cursor) {}
    fn undo_menu(&mut self, _: Option<&str>, _: Option<&str>) {}
    fn status(&mut self, _: CanvasId, _: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Create(CanvasId, Tag, Shape),
    Delete(CanvasId, Tag),
    MoveBy(CanvasId, Tag, i32, i32),
    SetCoords(CanvasId, Tag, Shape),
    Recolor(CanvasId, Tag, Highlight),
    TextCursor(CanvasId, ObjectId, TextCursor),
    SetCursor(CanvasId, Cursor),
    UndoMenu(Option<String>, Option<String>),
    Status(CanvasId, String),
}

/// Keeps every command in a shared log. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Rc<RefCell<Vec<RenderCommand>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<RenderCommand> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn last_status(&self) -> Option<String> {
        self.log.borrow().iter().rev().find_map(|c| match c {
            RenderCommand::Status(_, msg) => Some(msg.clone()),
            _ => None,
        })
    }

    pub fn last_cursor(&self) -> Option<Cursor> {
        self.log.borrow().iter().rev().find_map(|c| match c {
            RenderCommand::SetCursor(_, cur) => Some(*cur),
            _ => None,
        })
    }

    pub fn last_undo_menu(&self) -> Option<(Option<String>, Option<String>)> {
        self.log.borrow().iter().rev().find_map(|c| match c {
            RenderCommand::UndoMenu(u, r) => Some((u.clone(), r.clone())),
            _ => None,
        })
    }

    fn push(&self, cmd: RenderCommand) {
        self.log.borrow_mut().push(cmd);
    }
}

impl Renderer for RecordingRenderer {
    fn create(&mut self, canvas: CanvasId, tag: Tag, shape: Shape) {
        self.push(RenderCommand::Create(canvas, tag, shape));
    }

    fn delete(&mut self, canvas: CanvasId, tag: Tag) {
        self.push(RenderCommand::Delete(canvas, tag));
    }

    fn move_by(&mut self, canvas: CanvasId, tag: Tag, dx: i32, dy: i32) {
        self.push(RenderCommand::MoveBy(canvas, tag, dx, dy));
    }

    fn set_coords(&mut self, canvas: CanvasId, tag: Tag, shape: Shape) {
        self.push(RenderCommand::SetCoords(canvas, tag, shape));
    }

    fn recolor(&mut self, canvas: CanvasId, tag: Tag, highlight: Highlight) {
        self.push(RenderCommand::Recolor(canvas, tag, highlight));
    }

    fn text_cursor(&mut self, canvas: CanvasId, obj: ObjectId, cursor: TextCursor) {
        self.push(RenderCommand::TextCursor(canvas, obj, cursor));
    }

    fn set_cursor(&mut self, canvas: CanvasId, cursor: Cursor) {
        self.push(RenderCommand::SetCursor(canvas, cursor));
    }

    fn undo_menu(&mut self, undo: Option<&str>, redo: Option<&str>) {
        self.push(RenderCommand::UndoMenu(
            undo.map(str::to_string),
            redo.map(str::to_string),
        ));
    }

    fn status(&mut self, canvas: CanvasId, message: &str) {
        self.push(RenderCommand::Status(canvas, message.to_string()));
    }
}
