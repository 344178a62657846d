//! Top-level controller: the shared editor context plus every open canvas.
//!
//! A [`Session`] owns one [`EditorContext`] (undo slot, clipboards, paste
//! onset, timers and the external collaborators) and one
//! [`CanvasEditor`] per canvas. Sub-canvases opened with
//! [`Session::open_subcanvas`] share the same context, so there is exactly
//! one undo record across the whole hierarchy.
//!
//! Entry points never let an error escape unreported: gesture handlers
//! (`mouse_event`, `key_event`, ...) swallow it after [`EditorContext::report`],
//! verbs report it and hand it back as well.
//!
//! # Usage
//!
//! ```rust,ignore
//! use patchedit::{EditorConfig, Session, MouseButton, Modifiers};
//!
//! let mut session = Session::new(EditorContext::new(EditorConfig::default()));
//! let canvas = session.new_canvas();
//! session.load_doc(canvas, &doc)?;
//! session.mouse_event(canvas, 12, 12, MouseButton::Left, Modifiers::NONE, true);
//! session.mouse_motion(canvas, 17, 17, Modifiers::NONE);
//! session.mouse_up(canvas, 17, 17, Modifiers::NONE);
//! session.undo(canvas)?;
//! ```

use indexmap::IndexMap;

use super::state::CanvasEditor;
use super::undo::{Direction, UndoStack, UndoState};
use crate::config::EditorConfig;
use crate::error::{self, EditorError, EditorResult};
use crate::host::{BasicHost, Host};
use crate::input::{Key, Modifiers, MouseButton};
use crate::model::{Canvas, CanvasId, ConnectRecord, PatchDoc};
use crate::persist::{JsonPersistence, Persistence};
use crate::render::{NullRenderer, Renderer};
use crate::timer::{Clock, SystemClock, TimerId, TimerQueue};

// ────────────────────────────────────────────────────────────────────────────
// Editor context
// ────────────────────────────────────────────────────────────────────────────

/// Where and when the last mouse-up happened, for double-click detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastClick {
    pub canvas: CanvasId,
    pub x: i32,
    pub y: i32,
    pub at: u64,
}

/// State shared by every canvas of one hierarchy.
pub struct EditorContext {
    pub config: EditorConfig,
    pub undo: UndoStack,
    /// Serialized objects from the last copy or cut.
    pub clipboard: Option<Vec<u8>>,
    /// Copied text while editing inline.
    pub text_clipboard: String,
    /// Canvas and onset of the fragment currently being materialized.
    pub(crate) paste: Option<(CanvasId, usize)>,
    pub(crate) timers: TimerQueue,
    pub(crate) last_up: Option<LastClick>,
    pub(crate) clock: Box<dyn Clock>,
    pub renderer: Box<dyn Renderer>,
    pub host: Box<dyn Host>,
    pub persistence: Box<dyn Persistence>,
}

impl EditorContext {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            undo: UndoStack::new(),
            clipboard: None,
            text_clipboard: String::new(),
            paste: None,
            timers: TimerQueue::new(),
            last_up: None,
            clock: Box::new(SystemClock::default()),
            renderer: Box::new(NullRenderer),
            host: Box::new(BasicHost::new()),
            persistence: Box::new(JsonPersistence),
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_host(mut self, host: impl Host + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Box::new(persistence);
        self
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Install an undo record and update the menu.
    pub fn set_undo(&mut self, canvas: CanvasId, action: super::undo::UndoAction, name: &str) {
        self.undo.set_undo(canvas, action, name);
        self.refresh_undo_menu();
    }

    pub fn refresh_undo_menu(&mut self) {
        let (undo, redo) = self.undo.menu();
        self.renderer.undo_menu(undo, redo);
    }

    /// Route an error to its diagnostic channel; rejections also reach the
    /// status line of `canvas`.
    pub fn report(&mut self, canvas: CanvasId, err: &EditorError) {
        error::report(err);
        if let EditorError::Rejected(msg) = err {
            self.renderer.status(canvas, msg);
        }
    }

    /// Whether a press at `(x, y)` completes a double click.
    pub(crate) fn is_double_click(&self, canvas: CanvasId, x: i32, y: i32) -> bool {
        let Some(last) = self.last_up else {
            return false;
        };
        let slop = self.config.double_click_slop;
        last.canvas == canvas
            && (last.x - x).abs() <= slop
            && (last.y - y).abs() <= slop
            && self.now().saturating_sub(last.at) < self.config.double_click_ms
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

pub struct Session {
    ctx: EditorContext,
    editors: IndexMap<CanvasId, CanvasEditor>,
    next_canvas: u32,
}

impl Session {
    pub fn new(ctx: EditorContext) -> Self {
        Self {
            ctx,
            editors: IndexMap::new(),
            next_canvas: 0,
        }
    }

    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EditorContext {
        &mut self.ctx
    }

    fn open(&mut self, parent: Option<CanvasId>) -> CanvasId {
        let id = CanvasId(self.next_canvas);
        self.next_canvas += 1;
        self.editors
            .insert(id, CanvasEditor::new(Canvas::new(id, parent)));
        tracing::debug!(target: "patchedit::session", "opened canvas {id}");
        id
    }

    /// Open an empty top-level canvas.
    pub fn new_canvas(&mut self) -> CanvasId {
        self.open(None)
    }

    /// Open a canvas nested in `parent`, sharing its context.
    pub fn open_subcanvas(&mut self, parent: CanvasId) -> EditorResult<CanvasId> {
        if !self.editors.contains_key(&parent) {
            let err = EditorError::bug(format!("open_subcanvas: no canvas {parent}"));
            self.ctx.report(parent, &err);
            return Err(err);
        }
        Ok(self.open(Some(parent)))
    }

    /// Close a canvas and its descendants, dropping any undo record bound to them.
    pub fn close_canvas(&mut self, canvas: CanvasId) -> EditorResult<()> {
        let Some(mut editor) = self.editors.shift_remove(&canvas) else {
            let err = EditorError::bug(format!("close_canvas: no canvas {canvas}"));
            self.ctx.report(canvas, &err);
            return Err(err);
        };
        editor.shutdown(&mut self.ctx);
        self.ctx.undo.clear_undo(Some(canvas));
        self.ctx.refresh_undo_menu();
        let children: Vec<CanvasId> = self
            .editors
            .values()
            .filter(|e| e.canvas().parent == Some(canvas))
            .map(|e| e.canvas().id)
            .collect();
        for child in children {
            self.close_canvas(child)?;
        }
        Ok(())
    }

    pub fn canvas(&self, canvas: CanvasId) -> Option<&Canvas> {
        self.editors.get(&canvas).map(|e| e.canvas())
    }

    pub fn editor(&self, canvas: CanvasId) -> Option<&CanvasEditor> {
        self.editors.get(&canvas)
    }

    pub fn canvases(&self) -> impl Iterator<Item = CanvasId> + '_ {
        self.editors.keys().copied()
    }

    pub fn undo_state(&self) -> Option<UndoState> {
        self.ctx.undo.state()
    }

    /// Run `f` against the editor of `canvas`, reporting any error.
    fn with_editor<T>(
        &mut self,
        canvas: CanvasId,
        f: impl FnOnce(&mut CanvasEditor, &mut EditorContext) -> EditorResult<T>,
    ) -> EditorResult<T> {
        self.poll_timers();
        let result = match self.editors.get_mut(&canvas) {
            Some(editor) => f(editor, &mut self.ctx),
            None => Err(EditorError::bug(format!("no editor for canvas {canvas}"))),
        };
        if let Err(err) = &result {
            self.ctx.report(canvas, err);
        }
        result
    }

    /// Fire every timer whose deadline has passed.
    pub fn poll_timers(&mut self) {
        let now = self.ctx.now();
        for timer in self.ctx.timers.take_due(now) {
            match timer {
                TimerId::CoalescedMove(canvas) => {
                    let Some(editor) = self.editors.get_mut(&canvas) else {
                        continue;
                    };
                    if let Err(err) = editor.flush_move(&mut self.ctx) {
                        self.ctx.report(canvas, &err);
                    }
                }
                TimerId::DoubleClickWindow => self.ctx.last_up = None,
            }
        }
    }

    // ── Loading and saving ──────────────────────────────────────────────

    /// Append the objects and connections of `doc` to `canvas`.
    pub fn load_doc(&mut self, canvas: CanvasId, doc: &PatchDoc) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.load_fragment(ctx, &doc.patch).map(|_| ()))
    }

    pub fn to_doc(&self, canvas: CanvasId) -> Option<PatchDoc> {
        self.canvas(canvas).map(Canvas::to_doc)
    }

    // ── Gestures ────────────────────────────────────────────────────────

    /// Mouse press. With `is_commit` false this is a hover check that only
    /// updates the cursor.
    pub fn mouse_event(
        &mut self,
        canvas: CanvasId,
        x: i32,
        y: i32,
        button: MouseButton,
        mods: Modifiers,
        is_commit: bool,
    ) {
        let _ = self.with_editor(canvas, |ed, ctx| {
            ed.mouse_down(ctx, x, y, button, mods, is_commit)
        });
    }

    pub fn mouse_motion(&mut self, canvas: CanvasId, x: i32, y: i32, mods: Modifiers) {
        let _ = self.with_editor(canvas, |ed, ctx| ed.motion(ctx, x, y, mods));
    }

    pub fn mouse_up(&mut self, canvas: CanvasId, x: i32, y: i32, mods: Modifiers) {
        let _ = self.with_editor(canvas, |ed, ctx| ed.mouse_up(ctx, x, y, mods));
    }

    pub fn key_event(&mut self, canvas: CanvasId, down: bool, key: Key, shift: bool) {
        let _ = self.with_editor(canvas, |ed, ctx| ed.key_event(ctx, down, &key, shift));
    }

    pub fn release_grab(&mut self, canvas: CanvasId) {
        let _ = self.with_editor(canvas, |ed, ctx| {
            ed.release_grab(ctx);
            Ok(())
        });
    }

    // ── Verbs ───────────────────────────────────────────────────────────

    pub fn set_edit_mode(&mut self, canvas: CanvasId, on: bool) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.set_edit_mode(ctx, on))
    }

    pub fn select_all(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.select_all(ctx))
    }

    pub fn cut(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.cut(ctx))
    }

    pub fn copy(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.copy(ctx))
    }

    pub fn paste(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.paste(ctx))
    }

    pub fn duplicate(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.duplicate(ctx))
    }

    pub fn clear(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.clear(ctx))
    }

    pub fn tidy(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.with_editor(canvas, |ed, ctx| ed.tidy(ctx))
    }

    pub fn undo(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.undo_or_redo(canvas, Direction::Undo)
    }

    pub fn redo(&mut self, canvas: CanvasId) -> EditorResult<()> {
        self.undo_or_redo(canvas, Direction::Redo)
    }

    fn undo_or_redo(&mut self, canvas: CanvasId, dir: Direction) -> EditorResult<()> {
        self.poll_timers();
        // history moves, so no gesture may keep adding to the old record
        for editor in self.editors.values_mut() {
            editor.move_undo_set = false;
        }
        self.with_editor(canvas, |ed, ctx| {
            let mut record = ctx.undo.begin(canvas, dir)?;
            tracing::debug!(target: "patchedit::session", "{dir:?} \"{}\"", record.name);
            let result = ed
                .set_edit_mode(ctx, true)
                .and_then(|_| ed.noselect(ctx))
                .and_then(|_| ed.apply_undo(ctx, &mut record, dir));
            ctx.undo.finish(record, dir);
            ctx.refresh_undo_menu();
            result
        })
    }

    /// Connect by index, as a patch file does. Indices are shifted by the
    /// paste onset while a fragment is being materialized on this canvas.
    pub fn connect(
        &mut self,
        canvas: CanvasId,
        src: usize,
        outlet: usize,
        dst: usize,
        inlet: usize,
    ) -> EditorResult<()> {
        let rec = ConnectRecord::new(src, outlet, dst, inlet);
        self.with_editor(canvas, |ed, ctx| ed.connect_replay(ctx, rec).map(|_| ()))
    }

    pub fn disconnect(
        &mut self,
        canvas: CanvasId,
        src: usize,
        outlet: usize,
        dst: usize,
        inlet: usize,
    ) -> EditorResult<()> {
        let rec = ConnectRecord::new(src, outlet, dst, inlet);
        self.with_editor(canvas, |ed, ctx| ed.disconnect_raw(ctx, rec))
    }
}
