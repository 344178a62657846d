//! Selection bookkeeping for one canvas.
//!
//! Holds the ordered, duplicate-free set of selected objects, the single
//! selected cord and the rubber band being dragged. Pure data: highlighting
//! and text commits on deselect are done by the state machine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use patchedit::editor::selection::{Selection, SelectionRect};
//!
//! let mut sel = Selection::new();
//! sel.insert(id)?;
//! assert!(sel.contains(id));
//! sel.remove(id)?;
//! ```

use indexmap::IndexSet;

use crate::error::{EditorError, EditorResult};
use crate::geometry::{Point, Rect};
use crate::model::{Canvas, ConnectRecord, ObjectId};

/// Rubber band in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

impl SelectionRect {
    /// Band anchored at the press point.
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            start_x: x,
            start_y: y,
            end_x: x,
            end_y: y,
        }
    }

    pub fn update(&mut self, x: i32, y: i32) {
        self.end_x = x;
        self.end_y = y;
    }

    /// The band as a rectangle, whichever way it was dragged.
    pub fn normalized(&self) -> Rect {
        Rect::from_corners(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    objects: IndexSet<ObjectId>,
    /// Selected cord, by object index. Independent of `objects`.
    line: Option<ConnectRecord>,
    /// Active drag-selection rectangle, if any.
    pub rect: Option<SelectionRect>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Selected ids in selection order.
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().copied()
    }

    pub fn first(&self) -> Option<ObjectId> {
        self.objects.first().copied()
    }

    /// Add an unselected object.
    pub fn insert(&mut self, id: ObjectId) -> EditorResult<()> {
        if !self.objects.insert(id) {
            return Err(EditorError::bug(format!("select: {id} already selected")));
        }
        Ok(())
    }

    /// Remove a selected object.
    pub fn remove(&mut self, id: ObjectId) -> EditorResult<()> {
        if !self.objects.shift_remove(&id) {
            return Err(EditorError::bug(format!("deselect: {id} not selected")));
        }
        Ok(())
    }

    /// Swap `old` for `new` in place after an object was rebuilt.
    pub fn replace(&mut self, old: ObjectId, new: ObjectId) -> bool {
        match self.objects.get_index_of(&old) {
            Some(pos) => {
                self.objects.shift_remove(&old);
                self.objects.shift_insert(pos, new);
                true
            }
            None => false,
        }
    }

    /// Drop every selected object, returning them.
    pub fn take_all(&mut self) -> Vec<ObjectId> {
        self.objects.drain(..).collect()
    }

    pub fn line(&self) -> Option<ConnectRecord> {
        self.line
    }

    pub fn set_line(&mut self, line: Option<ConnectRecord>) {
        self.line = line;
    }

    /// Canvas indices of the selected objects, ascending.
    pub fn indices(&self, canvas: &Canvas) -> Vec<usize> {
        canvas
            .objects()
            .iter()
            .enumerate()
            .filter(|(_, o)| self.contains(o.id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of selected objects before `id` in canvas order, if `id` is selected.
    pub fn rank_among_selected(&self, canvas: &Canvas, id: ObjectId) -> Option<usize> {
        self.rank(canvas, id, true)
    }

    /// Number of unselected objects before `id` in canvas order, if `id` is unselected.
    pub fn rank_among_unselected(&self, canvas: &Canvas, id: ObjectId) -> Option<usize> {
        self.rank(canvas, id, false)
    }

    fn rank(&self, canvas: &Canvas, id: ObjectId, selected: bool) -> Option<usize> {
        if self.contains(id) != selected {
            return None;
        }
        let mut n = 0;
        for obj in canvas.objects() {
            if obj.id == id {
                return Some(n);
            }
            if self.contains(obj.id) == selected {
                n += 1;
            }
        }
        None
    }

    /// Count of selected (or unselected) objects in `canvas`.
    pub fn count_in(&self, canvas: &Canvas, selected: bool) -> usize {
        canvas
            .objects()
            .iter()
            .filter(|o| self.contains(o.id) == selected)
            .count()
    }
}
