use anyhow::Result;
use patchedit::rtext::{RText, TextKey, TextStyle, layout_text};
use patchedit::timer::ManualClock;
use patchedit::{
    CanvasId, EditorConfig, EditorContext, Fragment, Key, Modifiers, MouseButton, ObjectId,
    ObjectKind, ObjectRecord, PatchDoc, Session,
};

fn open(objects: Vec<ObjectRecord>) -> Result<(Session, CanvasId, ManualClock)> {
    let clock = ManualClock::new();
    let ctx = EditorContext::new(EditorConfig::default()).with_clock(clock.clone());
    let mut session = Session::new(ctx);
    let canvas = session.new_canvas();
    session.load_doc(
        canvas,
        &PatchDoc {
            patch: Fragment {
                objects,
                connections: vec![],
            },
        },
    )?;
    Ok((session, canvas, clock))
}

fn texts(session: &Session, canvas: CanvasId) -> Vec<String> {
    session
        .to_doc(canvas)
        .unwrap()
        .patch
        .objects
        .into_iter()
        .map(|o| o.text)
        .collect()
}

fn click(session: &mut Session, canvas: CanvasId, x: i32, y: i32) {
    session.mouse_event(canvas, x, y, MouseButton::Left, Modifiers::NONE, true);
    session.mouse_up(canvas, x, y, Modifiers::NONE);
}

fn type_str(session: &mut Session, canvas: CanvasId, s: &str) {
    for c in s.chars() {
        session.key_event(canvas, true, Key::Char(c), false);
        session.key_event(canvas, false, Key::Char(c), false);
    }
}

#[test]
fn test_layout_width_follows_longest_line() {
    let cfg = EditorConfig::default();
    let m = cfg.text_metrics();
    let layout = layout_text("hello world", None, TextStyle::Box, (0, 0), &m);
    assert_eq!(layout.width_px, 2 + 11 * 7);
    assert_eq!(layout.height_px, 16 + 2);

    // short boxes keep a minimum width, comments do not
    let short = layout_text("f", None, TextStyle::Box, (0, 0), &m);
    assert_eq!(short.width_px, 2 + 3 * 7);
    let note = layout_text("f", None, TextStyle::Comment, (0, 0), &m);
    assert_eq!(note.width_px, 2 + 7);
}

#[test]
fn test_multibyte_text_edits_by_codepoint() {
    let mut rt = RText::new(ObjectId(0), "añb", None, TextStyle::Box);
    rt.activate();
    // collapse the full selection to its end, then step back over 'b'
    rt.key(TextKey::Right);
    rt.key(TextKey::Left);
    assert!(rt.key(TextKey::BackSpace));
    assert_eq!(rt.text(), "ab");
    assert!(rt.is_dirty());
}

#[test]
fn test_click_release_activates_text() -> Result<()> {
    let (mut s, c, _) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "f")])?;

    click(&mut s, c, 12, 12);
    let ed = s.editor(c).unwrap();
    let rt = ed.rtext().expect("text should be active after click and release");
    assert!(rt.is_active());
    assert_eq!(rt.selected_text(), "f");
    Ok(())
}

#[test]
fn test_typing_retypes_box_with_undo_and_redo() -> Result<()> {
    let (mut s, c, _) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "f")])?;

    click(&mut s, c, 12, 12);
    assert!(s.undo_state().is_none());
    type_str(&mut s, c, "+ 1");
    assert_eq!(s.context().undo.current().unwrap().name, "typing");
    assert_eq!(s.editor(c).unwrap().rtext().unwrap().text(), "+ 1");

    // clicking the empty canvas commits the edit
    click(&mut s, c, 300, 300);
    assert_eq!(texts(&s, c), vec!["+ 1"]);
    assert!(s.editor(c).unwrap().text_edited_for().is_none());

    s.undo(c)?;
    assert_eq!(texts(&s, c), vec!["f"]);
    s.redo(c)?;
    assert_eq!(texts(&s, c), vec!["+ 1"]);
    Ok(())
}

#[test]
fn test_navigation_keys_do_not_install_undo() -> Result<()> {
    let (mut s, c, _) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "f")])?;

    click(&mut s, c, 12, 12);
    s.key_event(c, true, Key::Right, false);
    s.key_event(c, true, Key::Left, false);
    assert!(s.undo_state().is_none());

    click(&mut s, c, 300, 300);
    assert_eq!(texts(&s, c), vec!["f"]);
    Ok(())
}

#[test]
fn test_retyping_keeps_cords_that_still_fit() -> Result<()> {
    let (mut s, c, _) = open(vec![
        ObjectRecord::new(ObjectKind::Box, 10, 10, "f"),
        ObjectRecord::new(ObjectKind::Box, 10, 100, "print"),
    ])?;
    s.connect(c, 0, 0, 1, 0)?;

    click(&mut s, c, 12, 12);
    type_str(&mut s, c, "bang");
    click(&mut s, c, 300, 300);

    // the retyped box moves to the end of the list
    let doc = s.to_doc(c).unwrap();
    assert_eq!(texts(&s, c), vec!["print", "bang"]);
    assert_eq!(doc.patch.connections.len(), 1);
    assert_eq!(doc.patch.connections[0].src, 1);
    assert_eq!(doc.patch.connections[0].dst, 0);
    Ok(())
}

#[test]
fn test_double_click_selects_word_between_separators() -> Result<()> {
    let (mut s, c, _) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "foo;bar baz")])?;

    // sixth character cell, inside "bar"
    let x = 10 + 5 * 7 + 1;
    click(&mut s, c, x, 12);
    s.mouse_event(c, x, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_up(c, x, 12, Modifiers::NONE);
    assert_eq!(s.editor(c).unwrap().rtext().unwrap().selected_text(), "bar");
    Ok(())
}

#[test]
fn test_slow_second_click_is_not_a_double_click() -> Result<()> {
    let (mut s, c, clock) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "foo;bar baz")])?;

    let x = 10 + 5 * 7 + 1;
    click(&mut s, c, x, 12);
    clock.advance(1000);
    s.mouse_event(c, x, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_up(c, x, 12, Modifiers::NONE);
    assert_eq!(s.editor(c).unwrap().rtext().unwrap().selected_text(), "");
    Ok(())
}

#[test]
fn test_text_copy_and_paste_inside_box() -> Result<()> {
    let (mut s, c, _) = open(vec![ObjectRecord::new(ObjectKind::Box, 10, 10, "foo;bar baz")])?;

    let x = 10 + 5 * 7 + 1;
    click(&mut s, c, x, 12);
    s.mouse_event(c, x, 12, MouseButton::Left, Modifiers::NONE, true);
    s.mouse_up(c, x, 12, Modifiers::NONE);
    s.copy(c)?;
    assert_eq!(s.context().text_clipboard, "bar");

    s.key_event(c, true, Key::Right, false);
    s.paste(c)?;
    assert_eq!(
        s.editor(c).unwrap().rtext().unwrap().text(),
        "foo;barbar baz"
    );
    assert_eq!(s.context().undo.current().unwrap().name, "typing");
    Ok(())
}
