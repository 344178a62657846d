//! Per-canvas gesture state machine.
//!
//! [`CanvasEditor`] owns a [`Canvas`] and its [`Selection`] and turns raw
//! mouse and key events into selection changes, moves, connections and
//! inline text edits. Everything that outlives one canvas (undo slot,
//! clipboard, timers, collaborators) is borrowed from the
//! [`EditorContext`] on each call.

use super::graph::{self, Edge};
use super::selection::{Selection, SelectionRect};
use super::session::EditorContext;
use super::undo::{CutMode, ResizeEntry, UndoAction};
use crate::error::{EditorError, EditorResult};
use crate::geometry::{Point, Rect, closest_port, outlet_at};
use crate::host::{ClickInfo, ClickOutcome, Connectable};
use crate::input::{Cursor, Key, Modifiers, MouseButton};
use crate::model::{Canvas, CanvasId, ConnectRecord, Fragment, Object, ObjectId, ObjectKind};
use crate::render::{Highlight, Shape, Tag, TextCursor};
use crate::rtext::{RText, TextKey, TextMouse};
use crate::timer::TimerId;
use crate::widgets;

// ────────────────────────────────────────────────────────────────────────────
// Gesture mode
// ────────────────────────────────────────────────────────────────────────────

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Idle,
    /// Dragging a rubber band.
    SelectBox,
    /// Dragging the selection; motion is coalesced by a short timer.
    MoveObjects,
    /// Dragging the right edge of a text box to change its width.
    ResizeBox,
    /// Dragging a tentative cord out of an outlet.
    DragConnection,
    /// Extending the text selection of the box being edited.
    DragTextCaret,
    /// An object has captured motion and keys.
    ExternalGrab,
}

// ────────────────────────────────────────────────────────────────────────────
// Canvas editor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CanvasEditor {
    pub(crate) canvas: Canvas,
    pub(crate) selection: Selection,
    pub(crate) mode: EditorMode,
    pub(crate) edit_mode: bool,
    /// Object whose text is open for inline editing.
    pub(crate) text_edited_for: Option<ObjectId>,
    pub(crate) grab: Option<ObjectId>,
    /// Box whose width is being dragged.
    pub(crate) resizing: Option<ObjectId>,
    /// A Move undo record already covers the current gesture.
    pub(crate) move_undo_set: bool,
    pub(crate) xwas: i32,
    pub(crate) ywas: i32,
    pub(crate) xnew: i32,
    pub(crate) ynew: i32,
    pub(crate) band_shift: bool,
    /// The cord being dragged comes out of a signal outlet.
    pub(crate) drag_signal: bool,
    pub(crate) cursor: Cursor,
}

impl CanvasEditor {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            selection: Selection::new(),
            mode: EditorMode::Idle,
            edit_mode: true,
            text_edited_for: None,
            grab: None,
            resizing: None,
            move_undo_set: false,
            xwas: 0,
            ywas: 0,
            xnew: 0,
            ynew: 0,
            band_shift: false,
            drag_signal: false,
            cursor: Cursor::EditNothing,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn grab(&self) -> Option<ObjectId> {
        self.grab
    }

    pub fn text_edited_for(&self) -> Option<ObjectId> {
        self.text_edited_for
    }

    /// Inline editor of the box being edited, if any.
    pub fn rtext(&self) -> Option<&RText> {
        self.text_edited_for
            .and_then(|id| self.canvas.get(id))
            .and_then(|o| o.rtext.as_ref())
    }

    pub(crate) fn id(&self) -> CanvasId {
        self.canvas.id
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    fn object_shape(&self, ctx: &EditorContext, obj: &Object) -> Shape {
        let rect = ctx.host.bounding_rect(obj, &ctx.config);
        if obj.kind.has_text() {
            Shape::Text {
                rect,
                text: obj.display_text().to_string(),
            }
        } else {
            Shape::Rect(rect)
        }
    }

    fn edges_touching(&self, ctx: &EditorContext, ids: &[ObjectId]) -> Vec<Edge> {
        graph::edges(&self.canvas, ctx.host.as_ref(), &ctx.config)
            .filter(|e| ids.iter().any(|&id| e.touches(id)))
            .collect()
    }

    pub(crate) fn draw_object(&self, ctx: &mut EditorContext, id: ObjectId) {
        let Some(obj) = self.canvas.get(id) else {
            return;
        };
        let shape = self.object_shape(ctx, obj);
        ctx.renderer.create(self.id(), Tag::Object(id), shape);
        if self.selection.contains(id) {
            ctx.renderer
                .recolor(self.id(), Tag::Object(id), Highlight::Selected);
        }
    }

    pub(crate) fn draw_cord(&self, ctx: &mut EditorContext, rec: ConnectRecord) {
        let edge = graph::edges(&self.canvas, ctx.host.as_ref(), &ctx.config)
            .find(|e| e.record() == rec);
        if let Some(e) = edge {
            ctx.renderer.create(
                self.id(),
                e.tag(),
                Shape::Line {
                    from: e.from,
                    to: e.to,
                    signal: e.signal,
                },
            );
        }
    }

    /// Draw the whole canvas from scratch.
    pub fn draw_all(&self, ctx: &mut EditorContext) {
        let ids: Vec<ObjectId> = self.canvas.objects().iter().map(|o| o.id).collect();
        for id in ids {
            self.draw_object(ctx, id);
        }
        let all: Vec<Edge> = graph::edges(&self.canvas, ctx.host.as_ref(), &ctx.config).collect();
        for e in all {
            self.draw_cord(ctx, e.record());
        }
    }

    /// Delete an object's primitives along with every cord touching it.
    pub(crate) fn erase_object(&self, ctx: &mut EditorContext, id: ObjectId) {
        for e in self.edges_touching(ctx, &[id]) {
            ctx.renderer.delete(self.id(), e.tag());
        }
        ctx.renderer.delete(self.id(), Tag::Object(id));
    }

    /// Re-route the cords of `ids` after they moved or changed size.
    pub(crate) fn fix_cords(&self, ctx: &mut EditorContext, ids: &[ObjectId]) {
        for e in self.edges_touching(ctx, ids) {
            ctx.renderer.set_coords(
                self.id(),
                e.tag(),
                Shape::Line {
                    from: e.from,
                    to: e.to,
                    signal: e.signal,
                },
            );
        }
    }

    /// Refresh an object's shape and, while editing, its text cursor.
    pub(crate) fn redraw_object(&self, ctx: &mut EditorContext, id: ObjectId) {
        let Some(obj) = self.canvas.get(id) else {
            return;
        };
        let shape = self.object_shape(ctx, obj);
        ctx.renderer.set_coords(self.id(), Tag::Object(id), shape);
        if let Some(rt) = obj.rtext.as_ref().filter(|rt| rt.is_active()) {
            let layout = rt.layout(&ctx.config.text_metrics());
            ctx.renderer.text_cursor(
                self.id(),
                rt.owner(),
                TextCursor::from_chars(layout.sel_chars.0, layout.sel_chars.1),
            );
        }
        self.fix_cords(ctx, &[id]);
    }

    pub(crate) fn set_cursor(&mut self, ctx: &mut EditorContext, cursor: Cursor) {
        if self.cursor != cursor {
            self.cursor = cursor;
            ctx.renderer.set_cursor(self.id(), cursor);
        }
    }

    /// Displace objects without touching the undo record.
    pub(crate) fn displace_raw(&mut self, ctx: &mut EditorContext, ids: &[ObjectId], dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for &id in ids {
            if let Some(obj) = self.canvas.get_mut(id) {
                obj.displace(dx, dy);
                ctx.renderer.move_by(self.id(), Tag::Object(id), dx, dy);
            }
        }
        self.fix_cords(ctx, ids);
    }

    /// Instantiate a fragment at the end of the list through the paste side
    /// channel, so its connect records are offset by the onset. Returns the
    /// onset.
    pub(crate) fn load_fragment(&mut self, ctx: &mut EditorContext, fragment: &Fragment) -> EditorResult<usize> {
        let onset = self.canvas.len();
        ctx.paste = Some((self.id(), onset));
        for rec in &fragment.objects {
            let ports = ctx.host.instantiate(rec.kind, &rec.text);
            let id = self.canvas.alloc_id();
            self.canvas.push(Object::from_record(id, rec, ports));
            self.draw_object(ctx, id);
        }
        for &rec in &fragment.connections {
            if let Err(err) = self.connect_replay(ctx, rec) {
                tracing::warn!(target: "patchedit::editor", "connection failed: {err}");
            }
        }
        ctx.paste = None;
        tracing::debug!(
            target: "patchedit::editor",
            "materialized {} objects at {onset} on {}",
            fragment.objects.len(),
            self.id()
        );
        Ok(onset)
    }

    /// Stop everything in flight before the canvas goes away.
    pub(crate) fn shutdown(&mut self, ctx: &mut EditorContext) {
        ctx.timers.cancel(TimerId::CoalescedMove(self.id()));
        self.release_grab(ctx);
        self.resizing = None;
        if let Some(id) = self.text_edited_for.take() {
            if let Some(obj) = self.canvas.get_mut(id) {
                obj.rtext = None;
            }
        }
        self.mode = EditorMode::Idle;
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Select an unselected object. Selecting clears the selected cord.
    pub fn select(&mut self, ctx: &mut EditorContext, id: ObjectId) -> EditorResult<()> {
        if self.selection.line().is_some() {
            self.deselect_line(ctx);
        }
        self.selection.insert(id)?;
        ctx.renderer
            .recolor(self.id(), Tag::Object(id), Highlight::Selected);
        Ok(())
    }

    /// Deselect a selected object, committing its text first if it is
    /// being edited. The object may be rebuilt with a new id on the way.
    pub fn deselect(&mut self, ctx: &mut EditorContext, id: ObjectId) -> EditorResult<()> {
        if !self.selection.contains(id) {
            return Err(EditorError::bug(format!("deselect: {id} not selected")));
        }
        let id = if self.text_edited_for == Some(id) {
            self.commit_text(ctx)?
        } else {
            id
        };
        self.selection.remove(id)?;
        ctx.renderer
            .recolor(self.id(), Tag::Object(id), Highlight::Normal);
        Ok(())
    }

    /// Deselect every object and the selected cord.
    pub fn noselect(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        while let Some(id) = self.selection.first() {
            self.deselect(ctx, id)?;
        }
        if self.selection.line().is_some() {
            self.deselect_line(ctx);
        }
        Ok(())
    }

    fn cord_tag(&self, rec: ConnectRecord) -> Option<Tag> {
        let src = self.canvas.at(rec.src)?.id;
        let dst = self.canvas.at(rec.dst)?.id;
        Some(Tag::Cord {
            src,
            outlet: rec.outlet,
            dst,
            inlet: rec.inlet,
        })
    }

    pub(crate) fn select_line(&mut self, ctx: &mut EditorContext, rec: ConnectRecord) {
        self.deselect_line(ctx);
        self.selection.set_line(Some(rec));
        if let Some(tag) = self.cord_tag(rec) {
            ctx.renderer.recolor(self.id(), tag, Highlight::Selected);
        }
    }

    pub(crate) fn deselect_line(&mut self, ctx: &mut EditorContext) {
        if let Some(rec) = self.selection.line() {
            self.selection.set_line(None);
            if let Some(tag) = self.cord_tag(rec) {
                ctx.renderer.recolor(self.id(), tag, Highlight::Normal);
            }
        }
    }

    /// Select everything whose rectangle touches the rubber band. With
    /// shift held, already selected objects in the band are deselected.
    fn select_in_rect(&mut self, ctx: &mut EditorContext, area: Rect) -> EditorResult<()> {
        let hits: Vec<ObjectId> = self
            .canvas
            .objects()
            .iter()
            .filter(|o| ctx.host.bounding_rect(o, &ctx.config).intersects(&area))
            .map(|o| o.id)
            .collect();
        for id in hits {
            if !self.selection.contains(id) {
                self.select(ctx, id)?;
            } else if self.band_shift {
                self.deselect(ctx, id)?;
            }
        }
        Ok(())
    }

    // ── Inline text ─────────────────────────────────────────────────────

    /// Open the text of `id` for editing, closing any other edit first.
    pub(crate) fn activate_text(&mut self, ctx: &mut EditorContext, id: ObjectId) -> EditorResult<()> {
        if self.text_edited_for == Some(id) {
            return Ok(());
        }
        if self.text_edited_for.is_some() {
            self.commit_text(ctx)?;
        }
        let obj = self
            .canvas
            .get_mut(id)
            .ok_or_else(|| EditorError::not_found(format!("activate: object {id}")))?;
        if !obj.kind.has_text() {
            return Ok(());
        }
        let mut rt = RText::new(id, &obj.text, obj.width, obj.kind.text_style());
        rt.activate();
        obj.rtext = Some(rt);
        self.text_edited_for = Some(id);
        tracing::trace!(target: "patchedit::editor", "activate text of {id}");
        self.redraw_object(ctx, id);
        Ok(())
    }

    /// Close the inline editor. A dirty buffer rebuilds the object from the
    /// new text; returns the id the object ends up with.
    pub(crate) fn commit_text(&mut self, ctx: &mut EditorContext) -> EditorResult<ObjectId> {
        let id = self
            .text_edited_for
            .take()
            .ok_or_else(|| EditorError::bug("commit_text: nothing is being edited"))?;
        let obj = self
            .canvas
            .get_mut(id)
            .ok_or_else(|| EditorError::not_found(format!("commit_text: object {id}")))?;
        let Some(mut rt) = obj.rtext.take() else {
            return Ok(id);
        };
        if !rt.deactivate() {
            self.redraw_object(ctx, id);
            return Ok(id);
        }
        let text = rt.text().to_string();

        // Only the retyped object may stay selected while its edges are stowed.
        let others: Vec<ObjectId> = self.selection.iter().filter(|&o| o != id).collect();
        for other in others {
            self.selection.remove(other)?;
            ctx.renderer
                .recolor(self.id(), Tag::Object(other), Highlight::Normal);
        }
        let from = self
            .canvas
            .index_of(id)
            .ok_or_else(|| EditorError::not_found(format!("commit_text: object {id}")))?;
        let last = self.canvas.len() - 1;
        self.canvas.reorder(from, last);
        let stowed: Vec<ConnectRecord> = self
            .edges_touching(ctx, &[id])
            .iter()
            .map(Edge::record)
            .collect();

        self.erase_object(ctx, id);
        let old = self
            .canvas
            .remove(id)
            .ok_or_else(|| EditorError::not_found(format!("commit_text: object {id}")))?;
        let mut rec = old.to_record();
        rec.text = text;
        if rec.kind == ObjectKind::Atom {
            if let Ok(v) = rec.text.trim().parse::<f32>() {
                rec.value = v;
            }
        }
        let ports = ctx.host.instantiate(rec.kind, &rec.text);
        let new_id = self.canvas.alloc_id();
        self.canvas.push(Object::from_record(new_id, &rec, ports));
        for c in stowed {
            match graph::connect(&mut self.canvas, c) {
                Ok(_) => self.draw_cord(ctx, c),
                Err(err) => {
                    tracing::debug!(target: "patchedit::editor", "dropped edge after retyping: {err}")
                }
            }
        }
        self.selection.replace(id, new_id);
        self.draw_object(ctx, new_id);
        tracing::debug!(target: "patchedit::editor", "retyped {id} as {new_id}: \"{}\"", rec.text);
        Ok(new_id)
    }

    fn text_mouse(&mut self, ctx: &mut EditorContext, id: ObjectId, x: i32, y: i32, flag: TextMouse) {
        let metrics = ctx.config.text_metrics();
        let Some(obj) = self.canvas.get(id) else {
            return;
        };
        let rect = ctx.host.bounding_rect(obj, &ctx.config);
        if let Some(rt) = self.canvas.get_mut(id).and_then(|o| o.rtext.as_mut()) {
            rt.mouse(x - rect.x1, y - rect.y1, flag, &metrics);
        }
        self.redraw_object(ctx, id);
    }

    /// Apply a buffer change to the text being edited. The first change of
    /// an editing session installs a "typing" undo record.
    pub(crate) fn edit_text(
        &mut self,
        ctx: &mut EditorContext,
        modifying: bool,
        f: impl FnOnce(&mut RText) -> bool,
    ) -> EditorResult<bool> {
        let id = self
            .text_edited_for
            .ok_or_else(|| EditorError::bug("edit_text: nothing is being edited"))?;
        let was_dirty = self.rtext().is_some_and(RText::is_dirty);
        let snapshot = if modifying && !was_dirty {
            let mut only = Selection::new();
            only.insert(id)?;
            Some(self.cut_payload(ctx, CutMode::TypedText, &only)?)
        } else {
            None
        };
        let rt = self
            .canvas
            .get_mut(id)
            .and_then(|o| o.rtext.as_mut())
            .ok_or_else(|| EditorError::not_found(format!("edit_text: object {id}")))?;
        let changed = f(rt);
        if changed {
            if let Some(payload) = snapshot {
                ctx.set_undo(self.id(), UndoAction::CutClearOrType(payload), "typing");
            }
        }
        self.redraw_object(ctx, id);
        Ok(changed)
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    /// Topmost hit: the largest left edge wins, first among equals. With two
    /// or more objects selected a selected hit is preferred.
    pub(crate) fn find_hit(&self, ctx: &EditorContext, x: i32, y: i32) -> Option<(usize, ObjectId)> {
        let mut best: Option<(usize, ObjectId, i32)> = None;
        for (i, obj) in self.canvas.objects().iter().enumerate() {
            let rect = ctx.host.bounding_rect(obj, &ctx.config);
            if rect.contains(x, y) && best.is_none_or(|(_, _, x1)| rect.x1 > x1) {
                best = Some((i, obj.id, rect.x1));
            }
        }
        let (mut index, mut id, _) = best?;
        if self.selection.len() >= 2 && !self.selection.contains(id) {
            for (i, obj) in self.canvas.objects().iter().enumerate() {
                let rect = ctx.host.bounding_rect(obj, &ctx.config);
                if rect.contains(x, y) && self.selection.contains(obj.id) {
                    index = i;
                    id = obj.id;
                }
            }
        }
        Some((index, id))
    }

    pub(crate) fn mouse_down(
        &mut self,
        ctx: &mut EditorContext,
        x: i32,
        y: i32,
        button: MouseButton,
        mods: Modifiers,
        commit: bool,
    ) -> EditorResult<()> {
        let run_mode = mods.ctrl || !self.edit_mode;
        let double = commit && !run_mode && ctx.is_double_click(self.id(), x, y);
        if commit {
            self.move_undo_set = false;
            if self.mode == EditorMode::MoveObjects {
                ctx.timers.cancel(TimerId::CoalescedMove(self.id()));
                self.flush_move(ctx)?;
            }
            self.release_grab(ctx);
            self.mode = EditorMode::Idle;
        } else if self.mode != EditorMode::Idle {
            return Ok(());
        }
        tracing::trace!(
            target: "patchedit::editor",
            "mouse {x} {y} {button:?} {mods:?} commit={commit} double={double}"
        );
        self.xwas = x;
        self.ywas = y;

        if run_mode && button != MouseButton::Right {
            return self.run_click(ctx, x, y, mods, double, commit);
        }

        if let Some((index, id)) = self.find_hit(ctx, x, y) {
            return self.click_object(ctx, index, id, x, y, button, mods, double, commit);
        }

        if button == MouseButton::Right || run_mode {
            let cursor = if run_mode { Cursor::RunNothing } else { Cursor::EditNothing };
            self.set_cursor(ctx, cursor);
            return Ok(());
        }

        if !mods.alt {
            let hit = graph::hit_line(&self.canvas, ctx.host.as_ref(), &ctx.config, x, y);
            if hit.is_some() {
                if commit {
                    if !mods.shift {
                        self.noselect(ctx)?;
                    }
                    // the commit above may have renumbered objects
                    let edge = graph::hit_line(&self.canvas, ctx.host.as_ref(), &ctx.config, x, y);
                    if let Some(rec) = edge.map(|e| e.record()) {
                        if mods.shift && self.selection.line() == Some(rec) {
                            self.deselect_line(ctx);
                        } else {
                            self.select_line(ctx, rec);
                        }
                    }
                }
                self.set_cursor(ctx, Cursor::EditDisconnect);
                return Ok(());
            }
        }

        self.set_cursor(ctx, Cursor::EditNothing);
        if commit {
            if !mods.shift {
                self.noselect(ctx)?;
            }
            self.band_shift = mods.shift;
            self.selection.rect = Some(SelectionRect::new(x, y));
            ctx.renderer
                .create(self.id(), Tag::RubberBand, Shape::Rect(Rect::new(x, y, x, y)));
            self.mode = EditorMode::SelectBox;
        }
        Ok(())
    }

    /// Run-mode click: the first object under the pointer that reacts gets it.
    fn run_click(
        &mut self,
        ctx: &mut EditorContext,
        x: i32,
        y: i32,
        mods: Modifiers,
        double: bool,
        commit: bool,
    ) -> EditorResult<()> {
        let info = ClickInfo {
            x,
            y,
            shift: mods.shift,
            alt: mods.alt,
            double,
            commit,
        };
        let mut outcome = ClickOutcome::Ignored;
        let mut clicked = None;
        for index in 0..self.canvas.len() {
            let Some(obj) = self.canvas.at(index) else {
                break;
            };
            if !ctx.host.bounding_rect(obj, &ctx.config).contains(x, y) {
                continue;
            }
            let Some(behavior) = widgets::clickable(obj.kind) else {
                continue;
            };
            let id = obj.id;
            let Some(obj) = self.canvas.at_mut(index) else {
                break;
            };
            let result = behavior.click(obj, &info, ctx.host.as_mut());
            if result != ClickOutcome::Ignored {
                outcome = result;
                clicked = Some(id);
                break;
            }
        }
        if let (true, Some(id)) = (commit, clicked) {
            self.redraw_object(ctx, id);
            if outcome == ClickOutcome::Grab {
                tracing::trace!(target: "patchedit::editor", "{id} grabs input");
                self.grab = Some(id);
                self.mode = EditorMode::ExternalGrab;
            }
        }
        self.set_cursor(ctx, outcome.cursor());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn click_object(
        &mut self,
        ctx: &mut EditorContext,
        index: usize,
        id: ObjectId,
        x: i32,
        y: i32,
        button: MouseButton,
        mods: Modifiers,
        double: bool,
        commit: bool,
    ) -> EditorResult<()> {
        if button == MouseButton::Right {
            if commit {
                self.open_properties(ctx, id);
            }
            return Ok(());
        }

        if mods.shift {
            if commit {
                if self.text_edited_for == Some(id) {
                    self.text_mouse(ctx, id, x, y, TextMouse::ShiftClick);
                    self.mode = EditorMode::DragTextCaret;
                } else if self.selection.contains(id) {
                    self.deselect(ctx, id)?;
                } else {
                    self.select(ctx, id)?;
                }
            }
            return Ok(());
        }

        let Some(obj) = self.canvas.at(index) else {
            return Err(EditorError::not_found(format!("click: object {id}")));
        };
        let rect = ctx.host.bounding_rect(obj, &ctx.config);
        let width = obj.width;
        let alone = self.selection.is_empty()
            || (self.selection.len() == 1 && self.selection.contains(id));
        if obj.kind.has_text()
            && alone
            && x >= rect.x2 - 4
            && y < rect.y2 - 4
        {
            if commit {
                if !self.selection.contains(id) {
                    self.select(ctx, id)?;
                }
                ctx.set_undo(
                    self.id(),
                    UndoAction::Resize(ResizeEntry { index, width }),
                    "resize",
                );
                self.resizing = Some(id);
                self.xwas = rect.x1;
                self.ywas = rect.y1;
                self.mode = EditorMode::ResizeBox;
            } else {
                self.set_cursor(ctx, Cursor::EditResize);
            }
            return Ok(());
        }
        if let Some(outlet) = outlet_at(&rect, obj.outlet_count(), x, y, &ctx.config) {
            if commit {
                self.drag_signal = obj.is_signal_outlet(outlet);
                self.mode = EditorMode::DragConnection;
                let p = Point::new(x, y);
                ctx.renderer.create(
                    self.id(),
                    Tag::TentativeCord,
                    Shape::Line {
                        from: p,
                        to: p,
                        signal: self.drag_signal,
                    },
                );
            } else {
                self.set_cursor(ctx, Cursor::EditConnect);
            }
            return Ok(());
        }

        if self.text_edited_for == Some(id) {
            if commit {
                let flag = if double {
                    TextMouse::DoubleClick
                } else {
                    TextMouse::Down
                };
                self.text_mouse(ctx, id, x, y, flag);
                self.xwas = rect.x1;
                self.ywas = rect.y1;
                self.mode = EditorMode::DragTextCaret;
            } else {
                self.set_cursor(ctx, Cursor::EditNothing);
            }
            return Ok(());
        }

        if commit {
            if !self.selection.contains(id) {
                self.noselect(ctx)?;
                self.select(ctx, id)?;
            }
            self.xnew = x;
            self.ynew = y;
            self.mode = EditorMode::MoveObjects;
        } else {
            self.set_cursor(ctx, Cursor::EditNothing);
        }
        Ok(())
    }

    fn open_properties(&mut self, ctx: &mut EditorContext, id: ObjectId) {
        let Some(obj) = self.canvas.get(id) else {
            return;
        };
        match widgets::propertied(obj.kind) {
            Some(p) => {
                let props = p.properties(obj);
                ctx.host.open_properties(id, &props);
            }
            None => tracing::debug!(target: "patchedit::editor", "{id} has no properties"),
        }
    }

    pub(crate) fn motion(&mut self, ctx: &mut EditorContext, x: i32, y: i32, mods: Modifiers) -> EditorResult<()> {
        match self.mode {
            EditorMode::MoveObjects => {
                self.xnew = x;
                self.ynew = y;
                let deadline = ctx.now() + ctx.config.move_coalesce_ms;
                ctx.timers.arm(TimerId::CoalescedMove(self.id()), deadline);
                Ok(())
            }
            EditorMode::SelectBox => {
                if let Some(band) = self.selection.rect.as_mut() {
                    band.update(x, y);
                    let area = band.normalized();
                    ctx.renderer
                        .set_coords(self.id(), Tag::RubberBand, Shape::Rect(area));
                }
                Ok(())
            }
            EditorMode::DragConnection => {
                ctx.renderer.set_coords(
                    self.id(),
                    Tag::TentativeCord,
                    Shape::Line {
                        from: Point::new(self.xwas, self.ywas),
                        to: Point::new(x, y),
                        signal: self.drag_signal,
                    },
                );
                self.do_connect(ctx, x, y, false)
            }
            EditorMode::ResizeBox => {
                let Some(id) = self.resizing else {
                    return Ok(());
                };
                let columns = ((x - self.xwas) / ctx.config.font_width.max(1)).max(1) as usize;
                self.set_width(ctx, id, Some(columns))
            }
            EditorMode::DragTextCaret => {
                if let Some(id) = self.text_edited_for {
                    self.text_mouse(ctx, id, x, y, TextMouse::Drag);
                }
                Ok(())
            }
            EditorMode::ExternalGrab => {
                let (dx, dy) = (x - self.xwas, y - self.ywas);
                self.xwas = x;
                self.ywas = y;
                let Some(id) = self.grab else {
                    return Ok(());
                };
                let Some(obj) = self.canvas.get_mut(id) else {
                    self.grab = None;
                    return Err(EditorError::not_found(format!("grabbed object {id}")));
                };
                if let Some(behavior) = widgets::clickable(obj.kind) {
                    behavior.drag(obj, dx, dy, ctx.host.as_mut());
                }
                self.redraw_object(ctx, id);
                Ok(())
            }
            EditorMode::Idle => self.mouse_down(ctx, x, y, MouseButton::Left, mods, false),
        }
    }

    pub(crate) fn mouse_up(&mut self, ctx: &mut EditorContext, x: i32, y: i32, _mods: Modifiers) -> EditorResult<()> {
        let now = ctx.now();
        ctx.last_up = Some(super::session::LastClick {
            canvas: self.id(),
            x,
            y,
            at: now,
        });
        ctx.timers
            .arm(TimerId::DoubleClickWindow, now + ctx.config.double_click_ms);

        let result = match self.mode {
            EditorMode::DragConnection => {
                let r = self.do_connect(ctx, x, y, true);
                ctx.renderer.delete(self.id(), Tag::TentativeCord);
                r
            }
            EditorMode::SelectBox => {
                let band = self.selection.rect.take();
                ctx.renderer.delete(self.id(), Tag::RubberBand);
                match band {
                    Some(band) => self.select_in_rect(ctx, band.normalized()),
                    None => Ok(()),
                }
            }
            EditorMode::MoveObjects => {
                ctx.timers.cancel(TimerId::CoalescedMove(self.id()));
                self.flush_move(ctx).and_then(|_| self.activate_lone_selection(ctx))
            }
            EditorMode::ResizeBox => {
                self.resizing = None;
                self.activate_lone_selection(ctx)
            }
            EditorMode::ExternalGrab => {
                self.release_grab(ctx);
                Ok(())
            }
            EditorMode::DragTextCaret | EditorMode::Idle => Ok(()),
        };
        self.mode = EditorMode::Idle;
        // the next displacement belongs to a new gesture
        self.move_undo_set = false;
        result
    }

    /// After a move or resize, a single selected box opens for typing.
    fn activate_lone_selection(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        match self.selection.first() {
            Some(only) if self.selection.len() == 1 => self.activate_text(ctx, only),
            _ => Ok(()),
        }
    }

    /// Set the wrap width of a text box, keeping an open editor in step.
    pub(crate) fn set_width(&mut self, ctx: &mut EditorContext, id: ObjectId, width: Option<usize>) -> EditorResult<()> {
        let obj = self
            .canvas
            .get_mut(id)
            .ok_or_else(|| EditorError::not_found(format!("resize: object {id}")))?;
        if obj.width == width {
            return Ok(());
        }
        obj.width = width;
        if let Some(rt) = obj.rtext.as_mut() {
            rt.set_width(width);
        }
        self.redraw_object(ctx, id);
        Ok(())
    }

    /// Apply the motion accumulated since the last flush.
    pub(crate) fn flush_move(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        let (dx, dy) = (self.xnew - self.xwas, self.ynew - self.ywas);
        if dx != 0 || dy != 0 {
            self.displace_selection(ctx, dx, dy, true)?;
            self.xwas = self.xnew;
            self.ywas = self.ynew;
        }
        Ok(())
    }

    /// Validate, and on commit create, the cord from the press point to `(x, y)`.
    fn do_connect(&mut self, ctx: &mut EditorContext, x: i32, y: i32, commit: bool) -> EditorResult<()> {
        let target = (|| {
            let (i1, _) = self.find_hit(ctx, self.xwas, self.ywas)?;
            let (i2, _) = self.find_hit(ctx, x, y)?;
            if i1 == i2 {
                return None;
            }
            let (src, dst) = (self.canvas.at(i1)?, self.canvas.at(i2)?);
            if src.outlet_count() == 0 || dst.inlet_count() == 0 {
                return None;
            }
            let r1 = ctx.host.bounding_rect(src, &ctx.config);
            let r2 = ctx.host.bounding_rect(dst, &ctx.config);
            Some(ConnectRecord::new(
                i1,
                closest_port(&r1, src.outlet_count(), self.xwas),
                i2,
                closest_port(&r2, dst.inlet_count(), x),
            ))
        })();
        let Some(rec) = target else {
            self.set_cursor(ctx, Cursor::EditNothing);
            return Ok(());
        };
        match graph::can_connect(&self.canvas, rec) {
            Err(err) => {
                self.set_cursor(ctx, Cursor::EditNothing);
                if commit { Err(err) } else { Ok(()) }
            }
            Ok(()) if commit => {
                self.set_cursor(ctx, Cursor::EditNothing);
                self.connect_with_undo(ctx, rec, "connect")
            }
            Ok(()) => {
                self.set_cursor(ctx, Cursor::EditConnect);
                Ok(())
            }
        }
    }

    pub(crate) fn release_grab(&mut self, ctx: &mut EditorContext) {
        if let Some(id) = self.grab.take() {
            tracing::trace!(target: "patchedit::editor", "{id} releases input");
            if self.mode == EditorMode::ExternalGrab {
                self.mode = EditorMode::Idle;
            }
            let cursor = if self.edit_mode {
                Cursor::EditNothing
            } else {
                Cursor::RunNothing
            };
            self.set_cursor(ctx, cursor);
        }
    }

    pub fn set_edit_mode(&mut self, ctx: &mut EditorContext, on: bool) -> EditorResult<()> {
        if self.edit_mode == on {
            return Ok(());
        }
        tracing::debug!(target: "patchedit::editor", "edit mode {on} on {}", self.id());
        if !on {
            if self.mode == EditorMode::MoveObjects {
                self.flush_move(ctx)?;
            }
            ctx.timers.cancel(TimerId::CoalescedMove(self.id()));
            self.release_grab(ctx);
            self.noselect(ctx)?;
            self.mode = EditorMode::Idle;
        }
        self.edit_mode = on;
        let cursor = if on {
            Cursor::EditNothing
        } else {
            Cursor::RunNothing
        };
        self.set_cursor(ctx, cursor);
        Ok(())
    }

    // ── Keys ────────────────────────────────────────────────────────────

    pub(crate) fn key_event(&mut self, ctx: &mut EditorContext, down: bool, key: &Key, shift: bool) -> EditorResult<()> {
        if key.is_dropped() {
            tracing::debug!(target: "patchedit::editor", "key {key:?} dropped");
            return Ok(());
        }
        if !down {
            // lifting any key ends the nudge gesture
            self.move_undo_set = false;
            ctx.host.key_broadcast(false, key, shift);
            return Ok(());
        }
        if !key.is_arrow() {
            self.move_undo_set = false;
        }
        if self.mode == EditorMode::MoveObjects {
            ctx.timers.cancel(TimerId::CoalescedMove(self.id()));
            self.flush_move(ctx)?;
            self.mode = EditorMode::Idle;
        }

        if let Some(id) = self.grab {
            if let Some(obj) = self.canvas.get_mut(id) {
                let consumed = widgets::clickable(obj.kind)
                    .is_some_and(|b| b.key(obj, key, ctx.host.as_mut()));
                if consumed {
                    self.redraw_object(ctx, id);
                    return Ok(());
                }
            }
        }

        if self.text_edited_for.is_some() {
            if let Some(text_key) = key.to_text_key() {
                let modifying = matches!(
                    text_key,
                    TextKey::Char(_) | TextKey::BackSpace | TextKey::Delete
                );
                return self.edit_text(ctx, modifying, |rt| rt.key(text_key)).map(|_| ());
            }
        }

        match key {
            Key::BackSpace | Key::Delete => {
                if let Some(rec) = self.selection.line() {
                    self.disconnect_with_undo(ctx, rec)
                } else if !self.selection.is_empty() {
                    self.clear(ctx)
                } else {
                    ctx.host.key_broadcast(true, key, shift);
                    Ok(())
                }
            }
            Key::Up | Key::Down | Key::Left | Key::Right
                if self.edit_mode && !self.selection.is_empty() =>
            {
                let step = if shift {
                    ctx.config.nudge_large
                } else {
                    ctx.config.nudge_small
                };
                let (dx, dy) = match key {
                    Key::Up => (0, -step),
                    Key::Down => (0, step),
                    Key::Left => (-step, 0),
                    _ => (step, 0),
                };
                self.displace_selection(ctx, dx, dy, true)
            }
            _ => {
                ctx.host.key_broadcast(true, key, shift);
                Ok(())
            }
        }
    }
}
