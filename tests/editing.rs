use anyhow::Result;
use patchedit::editor::UndoState;
use patchedit::render::RecordingRenderer;
use patchedit::timer::ManualClock;
use patchedit::{
    CanvasId, ConnectRecord, Cursor, EditorConfig, EditorContext, EditorError, Fragment, Modifiers,
    MouseButton, ObjectKind, ObjectRecord, PatchDoc, Session,
};

fn boxed(x: i32, y: i32, text: &str) -> ObjectRecord {
    ObjectRecord::new(ObjectKind::Box, x, y, text)
}

fn open(
    objects: Vec<ObjectRecord>,
    connections: Vec<ConnectRecord>,
) -> Result<(Session, CanvasId, ManualClock, RecordingRenderer)> {
    let clock = ManualClock::new();
    let renderer = RecordingRenderer::new();
    let ctx = EditorContext::new(EditorConfig::default())
        .with_clock(clock.clone())
        .with_renderer(renderer.clone());
    let mut session = Session::new(ctx);
    let canvas = session.new_canvas();
    let doc = PatchDoc {
        patch: Fragment {
            objects,
            connections,
        },
    };
    session.load_doc(canvas, &doc)?;
    Ok((session, canvas, clock, renderer))
}

fn position(session: &Session, canvas: CanvasId, index: usize) -> (i32, i32) {
    let obj = &session.canvas(canvas).unwrap().objects()[index];
    (obj.x, obj.y)
}

fn connections(session: &Session, canvas: CanvasId) -> Vec<ConnectRecord> {
    session.to_doc(canvas).unwrap().patch.connections
}

#[test]
fn test_drag_move_then_undo_redo() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f")], vec![])?;

    s.mouse_event(c, 12, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 17, 17, Modifiers::NONE);
    s.mouse_up(c, 17, 17, Modifiers::NONE);
    assert_eq!(position(&s, c, 0), (15, 15));
    assert_eq!(s.undo_state(), Some(UndoState::Undoable));
    assert_eq!(s.context().undo.current().unwrap().name, "motion");

    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (10, 10));
    assert_eq!(s.undo_state(), Some(UndoState::Redoable));

    let err = s.undo(c).unwrap_err();
    assert!(err.is_bug());

    s.redo(c)?;
    assert_eq!(position(&s, c, 0), (15, 15));
    assert_eq!(s.undo_state(), Some(UndoState::Undoable));
    Ok(())
}

#[test]
fn test_nudge_after_drag_is_a_separate_undo_step() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f"), boxed(100, 10, "g")], vec![])?;

    s.select_all(c)?;
    s.mouse_event(c, 12, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 17, 17, Modifiers::NONE);
    s.mouse_up(c, 17, 17, Modifiers::NONE);
    s.key_event(c, true, patchedit::Key::Right, false);
    s.key_event(c, false, patchedit::Key::Right, false);
    assert_eq!(position(&s, c, 0), (16, 15));
    assert_eq!(s.context().undo.payloads_freed(), 1);

    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (15, 15));
    assert_eq!(position(&s, c, 1), (105, 15));
    Ok(())
}

#[test]
fn test_nudge_after_undo_installs_a_fresh_record() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f"), boxed(100, 10, "g")], vec![])?;

    s.select_all(c)?;
    s.mouse_event(c, 12, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 17, 17, Modifiers::NONE);
    s.mouse_up(c, 17, 17, Modifiers::NONE);
    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (10, 10));
    assert_eq!(s.editor(c).unwrap().selection().len(), 2);

    s.key_event(c, true, patchedit::Key::Right, false);
    assert_eq!(position(&s, c, 0), (11, 10));
    assert_eq!(s.undo_state(), Some(UndoState::Undoable));
    assert!(s.redo(c).unwrap_err().is_bug());

    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (10, 10));
    Ok(())
}

#[test]
fn test_dragging_right_edge_resizes_box() -> Result<()> {
    let (mut s, c, _, renderer) = open(vec![boxed(10, 10, "f")], vec![])?;
    let width = |s: &Session| s.canvas(c).unwrap().objects()[0].width;

    s.mouse_event(c, 31, 12, MouseButton::Left, Modifiers::NONE, false);
    assert_eq!(renderer.last_cursor(), Some(Cursor::EditResize));

    s.mouse_event(c, 31, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 80, 12, Modifiers::NONE);
    s.mouse_up(c, 80, 12, Modifiers::NONE);
    assert_eq!(width(&s), Some(10));
    assert_eq!(position(&s, c, 0), (10, 10));
    assert_eq!(s.context().undo.current().unwrap().name, "resize");

    s.undo(c)?;
    assert_eq!(width(&s), None);
    s.redo(c)?;
    assert_eq!(width(&s), Some(10));
    Ok(())
}

#[test]
fn test_coalesced_motion_makes_one_undo_record() -> Result<()> {
    let (mut s, c, clock, _) = open(vec![boxed(10, 10, "f")], vec![])?;

    s.mouse_event(c, 12, 12, MouseButton::Left, Modifiers::NONE, true);
    for step in 1..=4 {
        s.mouse_motion(c, 12 + step * 3, 12, Modifiers::NONE);
        clock.advance(10);
        s.poll_timers();
    }
    s.mouse_up(c, 24, 12, Modifiers::NONE);
    assert_eq!(position(&s, c, 0), (22, 10));
    assert_eq!(s.context().undo.payloads_freed(), 0);

    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (10, 10));
    Ok(())
}

#[test]
fn test_drag_cord_between_boxes() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f"), boxed(10, 100, "print")], vec![])?;

    // press on the outlet strip of [f], release over [print]
    s.mouse_event(c, 11, 27, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 12, 105, Modifiers::NONE);
    s.mouse_up(c, 12, 105, Modifiers::NONE);
    assert_eq!(connections(&s, c), vec![ConnectRecord::new(0, 0, 1, 0)]);
    assert_eq!(s.context().undo.current().unwrap().name, "connect");

    s.undo(c)?;
    assert!(connections(&s, c).is_empty());
    s.redo(c)?;
    assert_eq!(connections(&s, c), vec![ConnectRecord::new(0, 0, 1, 0)]);
    Ok(())
}

#[test]
fn test_signal_into_control_inlet_is_rejected() -> Result<()> {
    let (mut s, c, _, renderer) = open(vec![boxed(10, 10, "osc~"), boxed(10, 100, "print")], vec![])?;

    let err = s.connect(c, 0, 0, 1, 0).unwrap_err();
    assert!(matches!(err, EditorError::Rejected(_)));
    assert_eq!(
        renderer.last_status().as_deref(),
        Some("can't connect signal outlet to control inlet")
    );
    assert!(connections(&s, c).is_empty());
    Ok(())
}

#[test]
fn test_duplicate_keeps_internal_cords() -> Result<()> {
    let (mut s, c, _, _) = open(
        vec![boxed(10, 10, "f"), boxed(10, 100, "print")],
        vec![ConnectRecord::new(0, 0, 1, 0)],
    )?;

    s.select_all(c)?;
    s.duplicate(c)?;
    assert_eq!(s.canvas(c).unwrap().len(), 4);
    assert_eq!(position(&s, c, 2), (20, 20));
    assert_eq!(position(&s, c, 3), (20, 110));
    assert_eq!(
        connections(&s, c),
        vec![ConnectRecord::new(0, 0, 1, 0), ConnectRecord::new(2, 0, 3, 0)]
    );

    s.undo(c)?;
    assert_eq!(s.canvas(c).unwrap().len(), 2);
    assert_eq!(connections(&s, c), vec![ConnectRecord::new(0, 0, 1, 0)]);
    Ok(())
}

#[test]
fn test_selected_cord_is_deleted_by_backspace() -> Result<()> {
    let (mut s, c, _, _) = open(
        vec![boxed(10, 10, "f"), boxed(10, 100, "print")],
        vec![ConnectRecord::new(0, 0, 1, 0)],
    )?;

    // the cord runs straight down from the outlet at x ~ 13
    s.mouse_event(c, 13, 60, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_up(c, 13, 60, Modifiers::NONE);
    assert_eq!(
        s.editor(c).unwrap().selection().line(),
        Some(ConnectRecord::new(0, 0, 1, 0))
    );

    s.key_event(c, true, patchedit::Key::BackSpace, false);
    assert!(connections(&s, c).is_empty());
    assert_eq!(s.context().undo.current().unwrap().name, "disconnect");

    s.undo(c)?;
    assert_eq!(connections(&s, c), vec![ConnectRecord::new(0, 0, 1, 0)]);
    Ok(())
}

#[test]
fn test_cut_and_undo_restores_order_and_cords() -> Result<()> {
    let (mut s, c, _, _) = open(
        vec![boxed(10, 10, "f"), boxed(10, 60, "+"), boxed(10, 110, "print")],
        vec![ConnectRecord::new(0, 0, 1, 0), ConnectRecord::new(1, 0, 2, 0)],
    )?;

    // band-select only the middle box, so no text gets activated
    s.mouse_event(c, 0, 55, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 50, 70, Modifiers::NONE);
    s.mouse_up(c, 50, 70, Modifiers::NONE);
    assert_eq!(s.editor(c).unwrap().selection().len(), 1);
    s.cut(c)?;

    let doc = s.to_doc(c).unwrap();
    let texts: Vec<&str> = doc.patch.objects.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["f", "print"]);
    assert!(doc.patch.connections.is_empty());
    assert!(s.context().clipboard.is_some());

    s.undo(c)?;
    let doc = s.to_doc(c).unwrap();
    let texts: Vec<&str> = doc.patch.objects.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["f", "+", "print"]);
    assert_eq!(
        doc.patch.connections,
        vec![ConnectRecord::new(0, 0, 1, 0), ConnectRecord::new(1, 0, 2, 0)]
    );
    Ok(())
}

#[test]
fn test_repeated_paste_steps_away_from_originals() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f")], vec![])?;

    s.select_all(c)?;
    s.copy(c)?;
    s.paste(c)?;
    s.paste(c)?;
    assert_eq!(position(&s, c, 1), (20, 20));
    assert_eq!(position(&s, c, 2), (30, 30));

    s.undo(c)?;
    assert_eq!(s.canvas(c).unwrap().len(), 2);
    s.redo(c)?;
    assert_eq!(position(&s, c, 2), (30, 30));
    Ok(())
}

#[test]
fn test_select_all_toggles() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f"), boxed(100, 10, "f")], vec![])?;

    s.select_all(c)?;
    assert_eq!(s.editor(c).unwrap().selection().len(), 2);
    s.select_all(c)?;
    assert!(s.editor(c).unwrap().selection().is_empty());
    Ok(())
}

#[test]
fn test_rubber_band_with_shift_extends_selection() -> Result<()> {
    let (mut s, c, _, _) = open(
        vec![boxed(10, 10, "f"), boxed(100, 10, "f"), boxed(200, 10, "f")],
        vec![],
    )?;

    s.mouse_event(c, 0, 0, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_motion(c, 50, 50, Modifiers::NONE);
    s.mouse_up(c, 50, 50, Modifiers::NONE);
    assert_eq!(s.editor(c).unwrap().selection().len(), 1);

    s.mouse_event(c, 90, 0, MouseButton::Left, Modifiers::shift(), true);
    s.mouse_motion(c, 140, 50, Modifiers::shift());
    s.mouse_up(c, 140, 50, Modifiers::shift());
    assert_eq!(s.editor(c).unwrap().selection().len(), 2);
    Ok(())
}

#[test]
fn test_arrow_keys_nudge_with_one_undo_record() -> Result<()> {
    let (mut s, c, _, _) = open(vec![boxed(10, 10, "f")], vec![])?;

    s.select_all(c)?;
    s.key_event(c, true, patchedit::Key::Right, false);
    s.key_event(c, true, patchedit::Key::Right, false);
    s.key_event(c, true, patchedit::Key::Down, true);
    assert_eq!(position(&s, c, 0), (12, 20));
    assert_eq!(s.context().undo.payloads_freed(), 0);

    s.undo(c)?;
    assert_eq!(position(&s, c, 0), (10, 10));
    Ok(())
}

#[test]
fn test_setting_undo_frees_previous_once() -> Result<()> {
    let (mut s, c, _, renderer) = open(vec![boxed(10, 10, "f"), boxed(10, 100, "print")], vec![])?;

    s.connect(c, 0, 0, 1, 0)?;
    // replayed connections never install undo records
    assert!(s.undo_state().is_none());

    s.select_all(c)?;
    s.key_event(c, true, patchedit::Key::Right, false);
    assert_eq!(s.context().undo.payloads_freed(), 0);
    s.key_event(c, false, patchedit::Key::Right, false);
    s.key_event(c, true, patchedit::Key::Right, false);
    assert_eq!(s.context().undo.payloads_freed(), 1);
    assert_eq!(
        renderer.last_undo_menu(),
        Some((Some("motion".to_string()), None))
    );
    Ok(())
}

#[test]
fn test_subcanvas_shares_the_undo_slot() -> Result<()> {
    let (mut s, top, _, _) = open(vec![boxed(10, 10, "f")], vec![])?;
    let sub = s.open_subcanvas(top)?;
    s.load_doc(
        sub,
        &PatchDoc {
            patch: Fragment {
                objects: vec![boxed(5, 5, "print")],
                connections: vec![],
            },
        },
    )?;

    s.select_all(top)?;
    s.key_event(top, true, patchedit::Key::Left, false);
    assert_eq!(s.context().undo.current().unwrap().canvas, top);

    // the record belongs to the parent, so the child cannot undo it
    assert!(s.undo(sub).unwrap_err().is_bug());

    s.select_all(sub)?;
    s.key_event(sub, true, patchedit::Key::Left, false);
    assert_eq!(s.context().undo.current().unwrap().canvas, sub);
    assert!(s.undo(top).unwrap_err().is_bug());

    s.close_canvas(sub)?;
    assert!(s.undo_state().is_none());
    Ok(())
}

#[test]
fn test_run_mode_clicks_reach_widgets() -> Result<()> {
    let (mut s, c, _, renderer) = open(
        vec![ObjectRecord::new(ObjectKind::Toggle, 10, 10, "")],
        vec![],
    )?;

    s.set_edit_mode(c, false)?;
    s.mouse_event(c, 12, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_up(c, 12, 12, Modifiers::NONE);
    let doc = s.to_doc(c).unwrap();
    assert_ne!(doc.patch.objects[0].value, 0.0);
    assert!(s.undo_state().is_none());
    assert_eq!(
        renderer.last_cursor(),
        Some(patchedit::Cursor::RunClickMe)
    );
    Ok(())
}
