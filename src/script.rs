//! Replayable event scripts.
//!
//! A script is a JSON array of mouse, key, verb and wait events, applied to
//! a [`Session`] in order. Time only advances on `wait`, so a replay is
//! deterministic.
//!
//! # Example
//!
//! ```rust,ignore
//! let events: Vec<ScriptEvent> = serde_json::from_str(r#"[
//!     {"event": "mouse", "x": 12, "y": 12},
//!     {"event": "motion", "x": 17, "y": 17},
//!     {"event": "up", "x": 17, "y": 17},
//!     {"event": "verb", "verb": "undo"}
//! ]"#)?;
//! replay(&mut session, &clock, canvas, &events);
//! ```

use serde::{Deserialize, Serialize};

use crate::editor::Session;
use crate::input::{Key, Modifiers, MouseButton};
use crate::model::CanvasId;
use crate::timer::ManualClock;

fn yes() -> bool {
    true
}

/// A key given either as a raw code or as a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    Code(u32),
    Name(String),
}

impl KeySpec {
    pub fn to_key(&self) -> Key {
        match self {
            KeySpec::Code(code) => Key::from_code(*code),
            KeySpec::Name(name) => Key::from_name(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    SelectAll,
    Cut,
    Copy,
    Paste,
    Duplicate,
    Clear,
    Undo,
    Redo,
    Tidy,
    EditMode(bool),
    Connect {
        src: usize,
        outlet: usize,
        dst: usize,
        inlet: usize,
    },
    Disconnect {
        src: usize,
        outlet: usize,
        dst: usize,
        inlet: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Mouse {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        mods: Modifiers,
        #[serde(default = "yes")]
        commit: bool,
        #[serde(default)]
        canvas: Option<u32>,
    },
    Motion {
        x: i32,
        y: i32,
        #[serde(default)]
        mods: Modifiers,
        #[serde(default)]
        canvas: Option<u32>,
    },
    Up {
        x: i32,
        y: i32,
        #[serde(default)]
        mods: Modifiers,
        #[serde(default)]
        canvas: Option<u32>,
    },
    Key {
        key: KeySpec,
        #[serde(default = "yes")]
        down: bool,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        canvas: Option<u32>,
    },
    Verb {
        verb: Verb,
        #[serde(default)]
        canvas: Option<u32>,
    },
    Wait {
        ms: u64,
    },
}

/// Apply `events` to `session`, addressing `default_canvas` unless an event
/// names another one. Returns how many verbs failed; failures are already
/// reported through the session.
pub fn replay(
    session: &mut Session,
    clock: &ManualClock,
    default_canvas: CanvasId,
    events: &[ScriptEvent],
) -> usize {
    let target = |c: &Option<u32>| c.map_or(default_canvas, CanvasId);
    let mut failed = 0;
    for event in events {
        tracing::trace!(target: "patchedit::script", "{event:?}");
        match event {
            ScriptEvent::Mouse {
                x,
                y,
                button,
                mods,
                commit,
                canvas,
            } => session.mouse_event(target(canvas), *x, *y, *button, *mods, *commit),
            ScriptEvent::Motion { x, y, mods, canvas } => {
                session.mouse_motion(target(canvas), *x, *y, *mods)
            }
            ScriptEvent::Up { x, y, mods, canvas } => session.mouse_up(target(canvas), *x, *y, *mods),
            ScriptEvent::Key {
                key,
                down,
                shift,
                canvas,
            } => session.key_event(target(canvas), *down, key.to_key(), *shift),
            ScriptEvent::Verb { verb, canvas } => {
                let c = target(canvas);
                let result = match verb {
                    Verb::SelectAll => session.select_all(c),
                    Verb::Cut => session.cut(c),
                    Verb::Copy => session.copy(c),
                    Verb::Paste => session.paste(c),
                    Verb::Duplicate => session.duplicate(c),
                    Verb::Clear => session.clear(c),
                    Verb::Undo => session.undo(c),
                    Verb::Redo => session.redo(c),
                    Verb::Tidy => session.tidy(c),
                    Verb::EditMode(on) => session.set_edit_mode(c, *on),
                    Verb::Connect {
                        src,
                        outlet,
                        dst,
                        inlet,
                    } => session.connect(c, *src, *outlet, *dst, *inlet),
                    Verb::Disconnect {
                        src,
                        outlet,
                        dst,
                        inlet,
                    } => session.disconnect(c, *src, *outlet, *dst, *inlet),
                };
                if result.is_err() {
                    failed += 1;
                }
            }
            ScriptEvent::Wait { ms } => {
                clock.advance(*ms);
                session.poll_timers();
            }
        }
    }
    session.poll_timers();
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_script() {
        let events: Vec<ScriptEvent> = serde_json::from_str(
            r#"[
                {"event": "mouse", "x": 1, "y": 2, "mods": {"shift": true}},
                {"event": "key", "key": 8},
                {"event": "key", "key": "Up", "down": false},
                {"event": "verb", "verb": "undo"},
                {"event": "verb", "verb": {"edit_mode": false}},
                {"event": "verb", "verb": {"connect": {"src": 0, "outlet": 0, "dst": 1, "inlet": 0}}},
                {"event": "wait", "ms": 10}
            ]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 7);
        match &events[0] {
            ScriptEvent::Mouse { mods, commit, button, .. } => {
                assert!(mods.shift);
                assert!(*commit);
                assert_eq!(*button, MouseButton::Left);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &events[1] {
            ScriptEvent::Key { key, down, .. } => {
                assert_eq!(key.to_key(), Key::BackSpace);
                assert!(*down);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            events[4],
            ScriptEvent::Verb {
                verb: Verb::EditMode(false),
                canvas: None
            }
        );
    }
}
