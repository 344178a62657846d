//! Editing verbs and the undo handlers that invert them.
//!
//! Each verb comes in two layers: a raw operation (`dopaste`, `doclear`,
//! `connect_raw`, `displace_raw`) that only mutates the canvas and its
//! drawing, and the user-facing verb that captures an [`UndoAction`] before
//! calling the raw layer. Undo handlers are built from raw operations only,
//! so replaying history never records new history.
//!
//! # Design
//!
//! Undo payloads address objects by list index, never by id: retyping and
//! cut/undo rebuild objects with fresh ids, but a replay restores the same
//! list order, so indices stay meaningful.

use super::graph;
use super::selection::Selection;
use super::session::EditorContext;
use super::state::{CanvasEditor, EditorMode};
use super::undo::{
    CutMode, CutPayload, Direction, MoveEntry, PastePayload, ResizeEntry, UndoAction, UndoKind,
    UndoRecord, UndoState,
};
use crate::error::{EditorError, EditorResult};
use crate::geometry::Rect;
use crate::host::Connectable;
use crate::model::{ConnectRecord, ObjectId};

/// Tidy tolerances and histogram size, in pixels.
const XTOLERANCE: i32 = 18;
const YTOLERANCE: i32 = 17;
const NHIST: usize = 35;

impl CanvasEditor {
    // ────────────────────────────────────────────────────────────────────────
    // Connections
    // ────────────────────────────────────────────────────────────────────────

    pub(crate) fn connect_raw(&mut self, ctx: &mut EditorContext, rec: ConnectRecord) -> EditorResult<()> {
        graph::connect(&mut self.canvas, rec)?;
        self.draw_cord(ctx, rec);
        Ok(())
    }

    /// Remove an edge; a missing edge is reported as not found.
    pub(crate) fn disconnect_raw(&mut self, ctx: &mut EditorContext, rec: ConnectRecord) -> EditorResult<()> {
        let tag = graph::edges(&self.canvas, ctx.host.as_ref(), &ctx.config)
            .find(|e| e.record() == rec)
            .map(|e| e.tag());
        graph::disconnect(&mut self.canvas, rec)?;
        if let Some(tag) = tag {
            ctx.renderer.delete(self.id(), tag);
        }
        if self.selection.line() == Some(rec) {
            self.selection.set_line(None);
        }
        Ok(())
    }

    pub fn connect_with_undo(&mut self, ctx: &mut EditorContext, rec: ConnectRecord, name: &str) -> EditorResult<()> {
        self.connect_raw(ctx, rec)?;
        ctx.set_undo(self.id(), UndoAction::Connect(rec), name);
        Ok(())
    }

    pub fn disconnect_with_undo(&mut self, ctx: &mut EditorContext, rec: ConnectRecord) -> EditorResult<()> {
        self.disconnect_raw(ctx, rec)?;
        ctx.set_undo(self.id(), UndoAction::Disconnect(rec), "disconnect");
        Ok(())
    }

    /// Connect by index, offsetting by the paste onset while a fragment is
    /// being materialized on this canvas.
    pub(crate) fn connect_replay(&mut self, ctx: &mut EditorContext, rec: ConnectRecord) -> EditorResult<ConnectRecord> {
        let rec = match ctx.paste {
            Some((canvas, onset)) if canvas == self.id() => {
                ConnectRecord::new(rec.src + onset, rec.outlet, rec.dst + onset, rec.inlet)
            }
            _ => rec,
        };
        self.connect_raw(ctx, rec)?;
        Ok(rec)
    }

    fn apply_reconnect(&mut self, ctx: &mut EditorContext, records: &[ConnectRecord]) {
        for &rec in records {
            if let Err(err) = self.connect_raw(ctx, rec) {
                tracing::debug!(target: "patchedit::editor", "reconnect failed: {err}");
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Motion
    // ────────────────────────────────────────────────────────────────────────

    fn move_snapshot(&self, ids: &[ObjectId]) -> Vec<MoveEntry> {
        self.canvas
            .objects()
            .iter()
            .enumerate()
            .filter(|(_, o)| ids.contains(&o.id))
            .map(|(index, o)| MoveEntry { index, x: o.x, y: o.y })
            .collect()
    }

    /// Whether the undo slot still holds the "motion" record of the gesture
    /// in progress on this canvas.
    fn gesture_owns_undo(&self, ctx: &EditorContext) -> bool {
        self.move_undo_set
            && ctx.undo.current().is_some_and(|rec| {
                rec.canvas == self.id()
                    && rec.state == UndoState::Undoable
                    && rec.action.kind() == UndoKind::Move
                    && rec.name == "motion"
            })
    }

    /// Move the selection. The first displacement of a gesture records a
    /// "motion" undo; later ones ride on it.
    pub(crate) fn displace_selection(&mut self, ctx: &mut EditorContext, dx: i32, dy: i32, with_undo: bool) -> EditorResult<()> {
        let ids: Vec<ObjectId> = self.selection.iter().collect();
        if ids.is_empty() {
            return Ok(());
        }
        if with_undo && !self.gesture_owns_undo(ctx) {
            let entries = self.move_snapshot(&ids);
            ctx.set_undo(self.id(), UndoAction::Move(entries), "motion");
            self.move_undo_set = true;
        }
        self.displace_raw(ctx, &ids, dx, dy);
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Raw paste / clear
    // ────────────────────────────────────────────────────────────────────────

    /// Serialize the objects of `sel` plus the edges crossing its boundary,
    /// numbered as if the selection had been moved to the end of the list.
    pub(crate) fn cut_payload(&self, ctx: &EditorContext, mode: CutMode, sel: &Selection) -> EditorResult<CutPayload> {
        let positions = sel.indices(&self.canvas);
        let objects = ctx
            .persistence
            .encode(&self.canvas.to_fragment(&positions))?;
        let nnotsel = sel.count_in(&self.canvas, false);
        let renumber = |id: ObjectId| {
            if sel.contains(id) {
                sel.rank_among_selected(&self.canvas, id).map(|r| nnotsel + r)
            } else {
                sel.rank_among_unselected(&self.canvas, id)
            }
        };
        let reconnect = graph::edges(&self.canvas, ctx.host.as_ref(), &ctx.config)
            .filter(|e| sel.contains(e.src_id) != sel.contains(e.dst_id))
            .filter_map(|e| Some(ConnectRecord::new(renumber(e.src_id)?, e.outlet, renumber(e.dst_id)?, e.inlet)))
            .collect();
        Ok(CutPayload {
            mode,
            objects,
            reconnect,
            positions,
            redo_text: None,
        })
    }

    /// Decode `bytes` and append the objects, selecting exactly them.
    /// Returns the paste onset.
    pub(crate) fn dopaste(&mut self, ctx: &mut EditorContext, bytes: &[u8]) -> EditorResult<usize> {
        let fragment = ctx.persistence.decode(bytes)?;
        self.set_edit_mode(ctx, true)?;
        self.noselect(ctx)?;
        let onset = self.load_fragment(ctx, &fragment)?;
        let pasted: Vec<ObjectId> = self.canvas.objects()[onset..].iter().map(|o| o.id).collect();
        for id in pasted {
            self.select(ctx, id)?;
        }
        Ok(onset)
    }

    /// Delete the selected objects (and the selected cord) without undo.
    pub(crate) fn doclear(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if let Some(rec) = self.selection.line() {
            self.disconnect_raw(ctx, rec)?;
        }
        if let Some(id) = self.text_edited_for {
            if self.selection.contains(id) {
                if let Some(obj) = self.canvas.get_mut(id) {
                    obj.rtext = None;
                }
                self.text_edited_for = None;
            }
        }
        for id in self.selection.take_all() {
            self.erase_object(ctx, id);
            self.canvas.remove(id);
        }
        if self.grab.is_some_and(|g| self.canvas.get(g).is_none()) {
            self.release_grab(ctx);
        }
        Ok(())
    }

    fn delete_last(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        let id = self
            .canvas
            .objects()
            .last()
            .map(|o| o.id)
            .ok_or_else(|| EditorError::bug("undo: canvas is empty"))?;
        self.erase_object(ctx, id);
        self.canvas.remove(id);
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Verbs
    // ────────────────────────────────────────────────────────────────────────

    fn copy_objects(&self, ctx: &EditorContext) -> EditorResult<Vec<u8>> {
        let indices = self.selection.indices(&self.canvas);
        ctx.persistence.encode(&self.canvas.to_fragment(&indices))
    }

    pub fn copy(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if let Some(rt) = self.rtext() {
            ctx.text_clipboard = rt.selected_text().to_string();
            return Ok(());
        }
        if self.selection.is_empty() {
            return Ok(());
        }
        ctx.clipboard = Some(self.copy_objects(ctx)?);
        Ok(())
    }

    pub fn cut(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if let Some(rec) = self.selection.line() {
            return self.disconnect_with_undo(ctx, rec);
        }
        if let Some(rt) = self.rtext() {
            if rt.selected_text().is_empty() && self.selection.len() == 1 {
                // cutting nothing out of a lone box deletes the box
                let payload = self.cut_payload(ctx, CutMode::Cut, &self.selection)?;
                ctx.set_undo(self.id(), UndoAction::CutClearOrType(payload), "cut");
                return self.doclear(ctx);
            }
            let mut taken = String::new();
            self.edit_text(ctx, true, |rt| {
                taken = rt.cut_selection();
                !taken.is_empty()
            })?;
            ctx.text_clipboard = taken;
            return Ok(());
        }
        if self.selection.is_empty() {
            return Ok(());
        }
        let payload = self.cut_payload(ctx, CutMode::Cut, &self.selection)?;
        ctx.set_undo(self.id(), UndoAction::CutClearOrType(payload), "cut");
        ctx.clipboard = Some(self.copy_objects(ctx)?);
        self.doclear(ctx)
    }

    /// Delete the selection (or the selected cord) with undo.
    pub fn clear(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if let Some(rec) = self.selection.line() {
            return self.disconnect_with_undo(ctx, rec);
        }
        if self.text_edited_for.is_some() {
            return self
                .edit_text(ctx, true, |rt| !rt.cut_selection().is_empty())
                .map(|_| ());
        }
        if self.selection.is_empty() {
            return Ok(());
        }
        let payload = self.cut_payload(ctx, CutMode::Clear, &self.selection)?;
        ctx.set_undo(self.id(), UndoAction::CutClearOrType(payload), "clear");
        self.doclear(ctx)
    }

    pub fn paste(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if self.text_edited_for.is_some() {
            let text = ctx.text_clipboard.clone();
            return self
                .edit_text(ctx, !text.is_empty(), |rt| {
                    if text.is_empty() {
                        return false;
                    }
                    rt.insert_str(&text);
                    true
                })
                .map(|_| ());
        }
        let Some(buffer) = ctx.clipboard.clone() else {
            return Ok(());
        };
        let onset = self.dopaste(ctx, &buffer)?;
        let offset = self.paste_offset(ctx, onset);
        let pasted: Vec<ObjectId> = self.selection.iter().collect();
        self.displace_raw(ctx, &pasted, offset.0, offset.1);
        ctx.set_undo(
            self.id(),
            UndoAction::Paste(PastePayload {
                onset,
                buffer,
                offset,
            }),
            "paste",
        );
        Ok(())
    }

    /// Offset that keeps pasted objects from landing exactly on top of
    /// objects already on the canvas.
    fn paste_offset(&self, ctx: &EditorContext, onset: usize) -> (i32, i32) {
        let (existing, pasted) = self.canvas.objects().split_at(onset);
        let step = ctx.config.paste_offset;
        let mut off = 0;
        for _ in 0..1000 {
            let collides = pasted
                .iter()
                .any(|p| existing.iter().any(|e| e.x == p.x + off && e.y == p.y + off));
            if !collides {
                break;
            }
            off += step;
        }
        (off, off)
    }

    pub fn duplicate(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        if let Some(line) = self.selection.line() {
            return self.duplicate_connection(ctx, line);
        }
        if self.mode != EditorMode::Idle || self.selection.is_empty() {
            return Ok(());
        }
        if self.text_edited_for.is_some() {
            self.commit_text(ctx)?;
        }
        let buffer = self.copy_objects(ctx)?;
        ctx.clipboard = Some(buffer.clone());
        let onset = self.dopaste(ctx, &buffer)?;
        let step = ctx.config.paste_offset;
        let pasted: Vec<ObjectId> = self.selection.iter().collect();
        self.displace_raw(ctx, &pasted, step, step);
        ctx.set_undo(
            self.id(),
            UndoAction::Paste(PastePayload {
                onset,
                buffer,
                offset: (step, step),
            }),
            "duplicate",
        );
        Ok(())
    }

    /// Connect the next free outlet/inlet pair after the selected cord.
    fn duplicate_connection(&mut self, ctx: &mut EditorContext, line: ConnectRecord) -> EditorResult<()> {
        let (Some(src), Some(dst)) = (self.canvas.at(line.src), self.canvas.at(line.dst)) else {
            return Err(EditorError::not_found("duplicate: selected cord vanished"));
        };
        let (nout, nin) = (src.outlet_count(), dst.inlet_count());
        let (mut outlet, mut inlet) = (line.outlet + 1, line.inlet + 1);
        while outlet < nout && inlet < nin {
            let rec = ConnectRecord::new(line.src, outlet, line.dst, inlet);
            if graph::can_connect(&self.canvas, rec).is_ok() {
                self.connect_with_undo(ctx, rec, "duplicate connection")?;
                self.select_line(ctx, rec);
                return Ok(());
            }
            outlet += 1;
            inlet += 1;
        }
        tracing::debug!(target: "patchedit::editor", "duplicate: no free port pair after {line:?}");
        Ok(())
    }

    /// Select everything; if everything already is, select nothing.
    pub fn select_all(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        self.set_edit_mode(ctx, true)?;
        if let Some(id) = self.text_edited_for {
            if let Some(rt) = self.canvas.get_mut(id).and_then(|o| o.rtext.as_mut()) {
                rt.select_all();
            }
            self.redraw_object(ctx, id);
            return Ok(());
        }
        let unselected: Vec<ObjectId> = self
            .canvas
            .objects()
            .iter()
            .map(|o| o.id)
            .filter(|&id| !self.selection.contains(id))
            .collect();
        if unselected.is_empty() {
            return self.noselect(ctx);
        }
        for id in unselected {
            self.select(ctx, id)?;
        }
        Ok(())
    }

    /// Align rows, then guess the preferred vertical spacing and apply it
    /// to columns. Works on the selection, or on everything if nothing is
    /// selected.
    pub fn tidy(&mut self, ctx: &mut EditorContext) -> EditorResult<()> {
        let ids: Vec<ObjectId> = if self.selection.is_empty() {
            self.canvas.objects().iter().map(|o| o.id).collect()
        } else {
            self.selection.iter().collect()
        };
        let in_set: Vec<usize> = self
            .canvas
            .objects()
            .iter()
            .enumerate()
            .filter(|(_, o)| ids.contains(&o.id))
            .map(|(i, _)| i)
            .collect();
        if in_set.is_empty() {
            return Ok(());
        }

        let reuse = matches!(
            ctx.undo.current(),
            Some(rec) if rec.canvas == self.id()
                && rec.name == "tidy"
                && rec.state == UndoState::Undoable
                && ctx.undo.kind() == Some(UndoKind::Move)
        );
        if !(reuse && ctx.undo.reinstall(self.id(), "tidy")) {
            let entries = self.move_snapshot(&ids);
            ctx.set_undo(self.id(), UndoAction::Move(entries), "tidy");
        }

        // horizontal: everything near the row of a leftmost box lines up with it
        for &a in &in_set {
            let ra = self.rect_at(ctx, a);
            let is_head = !in_set.iter().any(|&b| {
                let rb = self.rect_at(ctx, b);
                rb.y1 <= ra.y1 + YTOLERANCE && rb.y1 >= ra.y1 - YTOLERANCE && rb.x1 < ra.x1
            });
            if !is_head {
                continue;
            }
            for &b in &in_set {
                let rb = self.rect_at(ctx, b);
                if rb.y1 <= ra.y1 + YTOLERANCE && rb.y1 >= ra.y1 - YTOLERANCE && rb.y1 != ra.y1 {
                    let id = self.canvas.objects()[b].id;
                    self.displace_raw(ctx, &[id], 0, ra.y1 - rb.y1);
                }
            }
        }

        // vertical: histogram of gaps between boxes in the same column
        let mut histogram = [0i32; NHIST];
        for &a in &in_set {
            let ra = self.rect_at(ctx, a);
            for &b in &in_set {
                let rb = self.rect_at(ctx, b);
                if rb.x1 <= ra.x1 + XTOLERANCE && rb.x1 >= ra.x1 - XTOLERANCE {
                    let distance = rb.y1 - ra.y2;
                    if (0..NHIST as i32).contains(&distance) {
                        histogram[distance as usize] += 1;
                    }
                }
            }
        }
        let (mut besthist, mut bestdist) = (0, 4);
        for i in 2..NHIST - 2 {
            let hit = histogram[i - 2] + 2 * histogram[i - 1] + 3 * histogram[i] + 2 * histogram[i + 1] + histogram[i + 2];
            if hit > besthist {
                besthist = hit;
                bestdist = i as i32;
            }
        }
        tracing::debug!(target: "patchedit::editor", "best vertical distance {bestdist}");

        for &a in &in_set {
            let mut ra = self.rect_at(ctx, a);
            let has_head = in_set.iter().any(|&b| {
                let rb = self.rect_at(ctx, b);
                rb.x1 <= ra.x1 + XTOLERANCE
                    && rb.x1 >= ra.x1 - XTOLERANCE
                    && ra.y1 >= rb.y2 - 10
                    && ra.y1 < rb.y2 + NHIST as i32
            });
            if has_head {
                continue;
            }
            loop {
                let next = in_set.iter().copied().find(|&b| {
                    let rb = self.rect_at(ctx, b);
                    rb.x1 <= ra.x1 + XTOLERANCE
                        && rb.x1 >= ra.x1 - XTOLERANCE
                        && rb.y1 > ra.y1
                        && rb.y1 < ra.y2 + NHIST as i32
                });
                let Some(b) = next else {
                    break;
                };
                let rb = self.rect_at(ctx, b);
                let vmove = ra.y2 + bestdist - rb.y1;
                let id = self.canvas.objects()[b].id;
                self.displace_raw(ctx, &[id], ra.x1 - rb.x1, vmove);
                ra = rb.translate(ra.x1 - rb.x1, vmove);
            }
        }
        Ok(())
    }

    fn rect_at(&self, ctx: &EditorContext, index: usize) -> Rect {
        ctx.host
            .bounding_rect(&self.canvas.objects()[index], &ctx.config)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Undo handlers
    // ────────────────────────────────────────────────────────────────────────

    /// Run the handler of `record` in direction `dir`. The caller has
    /// already cleared the selection and checked the record's state.
    pub(crate) fn apply_undo(&mut self, ctx: &mut EditorContext, record: &mut UndoRecord, dir: Direction) -> EditorResult<()> {
        match &mut record.action {
            UndoAction::Connect(rec) => self.undo_disconnect(ctx, *rec, dir.flipped()),
            UndoAction::Disconnect(rec) => self.undo_disconnect(ctx, *rec, dir),
            UndoAction::CutClearOrType(payload) => self.undo_cut(ctx, payload, dir),
            UndoAction::Move(entries) => self.undo_move(ctx, entries),
            UndoAction::Paste(payload) => self.undo_paste(ctx, payload, dir),
            UndoAction::Resize(entry) => self.undo_resize(ctx, entry),
        }
    }

    fn undo_disconnect(&mut self, ctx: &mut EditorContext, rec: ConnectRecord, dir: Direction) -> EditorResult<()> {
        match dir {
            Direction::Undo => self.connect_raw(ctx, rec),
            Direction::Redo => self.disconnect_raw(ctx, rec),
        }
    }

    fn undo_cut(&mut self, ctx: &mut EditorContext, payload: &mut CutPayload, dir: Direction) -> EditorResult<()> {
        match (dir, payload.mode) {
            (Direction::Undo, CutMode::Cut | CutMode::Clear) => {
                let paste_pos = self.canvas.len();
                self.dopaste(ctx, &payload.objects)?;
                self.apply_reconnect(ctx, &payload.reconnect);
                for (i, &pos) in payload.positions.iter().enumerate() {
                    self.canvas.reorder(paste_pos + i, pos);
                }
                Ok(())
            }
            (Direction::Undo, CutMode::TypedText) => {
                if payload.redo_text.is_none() {
                    let last = self
                        .canvas
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| EditorError::bug("undo typing: canvas is empty"))?;
                    let fragment = self.canvas.to_fragment(&[last]);
                    payload.redo_text = Some(ctx.persistence.encode(&fragment)?);
                }
                self.delete_last(ctx)?;
                self.dopaste(ctx, &payload.objects)?;
                self.apply_reconnect(ctx, &payload.reconnect);
                Ok(())
            }
            (Direction::Redo, CutMode::Cut | CutMode::Clear) => {
                let ids: Vec<ObjectId> = payload
                    .positions
                    .iter()
                    .filter_map(|&pos| self.canvas.at(pos).map(|o| o.id))
                    .collect();
                for id in ids {
                    self.select(ctx, id)?;
                }
                self.doclear(ctx)
            }
            (Direction::Redo, CutMode::TypedText) => {
                let text = payload
                    .redo_text
                    .clone()
                    .ok_or_else(|| EditorError::bug("redo typing: no final text captured"))?;
                self.delete_last(ctx)?;
                self.dopaste(ctx, &text)?;
                self.apply_reconnect(ctx, &payload.reconnect);
                Ok(())
            }
        }
    }

    /// Self-inverse: put every object back where the record says and
    /// remember where it was.
    fn undo_move(&mut self, ctx: &mut EditorContext, entries: &mut [MoveEntry]) -> EditorResult<()> {
        let mut moved = Vec::with_capacity(entries.len());
        for entry in entries.iter_mut() {
            let Some(obj) = self.canvas.at(entry.index) else {
                tracing::debug!(target: "patchedit::editor", "undo move: no object {}", entry.index);
                continue;
            };
            let (id, dx, dy) = (obj.id, entry.x - obj.x, entry.y - obj.y);
            self.displace_raw(ctx, &[id], dx, dy);
            entry.x -= dx;
            entry.y -= dy;
            moved.push(id);
        }
        self.noselect(ctx)?;
        for id in moved {
            self.select(ctx, id)?;
        }
        Ok(())
    }

    /// Self-inverse like [`Self::undo_move`]: swap the stored width with the
    /// current one.
    fn undo_resize(&mut self, ctx: &mut EditorContext, entry: &mut ResizeEntry) -> EditorResult<()> {
        let (id, current) = self
            .canvas
            .at(entry.index)
            .map(|o| (o.id, o.width))
            .ok_or_else(|| EditorError::not_found(format!("undo resize: no object {}", entry.index)))?;
        self.set_width(ctx, id, entry.width)?;
        entry.width = current;
        self.select(ctx, id)
    }

    fn undo_paste(&mut self, ctx: &mut EditorContext, payload: &mut PastePayload, dir: Direction) -> EditorResult<()> {
        match dir {
            Direction::Undo => {
                let ids: Vec<ObjectId> = self
                    .canvas
                    .objects()
                    .iter()
                    .skip(payload.onset)
                    .map(|o| o.id)
                    .collect();
                for id in ids {
                    self.select(ctx, id)?;
                }
                self.doclear(ctx)
            }
            Direction::Redo => {
                payload.onset = self.dopaste(ctx, &payload.buffer)?;
                let (dx, dy) = payload.offset;
                let pasted: Vec<ObjectId> = self.selection.iter().collect();
                self.displace_raw(ctx, &pasted, dx, dy);
                Ok(())
            }
        }
    }
}
