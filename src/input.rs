//! Input vocabulary shared by the host, the state machine and the renderer.

use serde::{Deserialize, Serialize};

use crate::rtext::TextKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Pointer shape requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cursor {
    #[default]
    RunNothing,
    RunClickMe,
    EditNothing,
    EditConnect,
    EditDisconnect,
    /// Over the right edge of a resizable box.
    EditResize,
}

/// A key after platform normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    BackSpace,
    Tab,
    Return,
    Escape,
    Space,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// Any other symbolic key, passed through untouched.
    Named(String),
}

impl Key {
    /// Map a raw key code. Includes the legacy and private-use arrow codes
    /// some platforms send.
    pub fn from_code(code: u32) -> Key {
        match code {
            8 => Key::BackSpace,
            9 => Key::Tab,
            10 | 13 => Key::Return,
            27 => Key::Escape,
            32 => Key::Space,
            127 => Key::Delete,
            30 | 63232 => Key::Up,
            31 | 63233 => Key::Down,
            28 | 63234 => Key::Left,
            29 | 63235 => Key::Right,
            63273 => Key::Home,
            63275 => Key::End,
            63276 => Key::Named("Prior".into()),
            63277 => Key::Named("Next".into()),
            63236..=63247 => Key::Named(format!("F{}", code - 63235)),
            other => match char::from_u32(other) {
                Some(c) => Key::Char(c),
                None => Key::Named(format!("#{other}")),
            },
        }
    }

    /// Map a symbolic key name such as `"Up"` or `"BackSpace"`.
    pub fn from_name(name: &str) -> Key {
        match name {
            "BackSpace" => Key::BackSpace,
            "Tab" => Key::Tab,
            "Return" => Key::Return,
            "Escape" => Key::Escape,
            "Space" => Key::Space,
            "Delete" => Key::Delete,
            "Up" => Key::Up,
            "Down" => Key::Down,
            "Left" => Key::Left,
            "Right" => Key::Right,
            "Home" => Key::Home,
            "End" => Key::End,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Named(other.to_string()),
                }
            }
        }
    }

    /// Braces never reach the editor or the host.
    pub fn is_dropped(&self) -> bool {
        matches!(self, Key::Char('{' | '}'))
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, Key::Up | Key::Down | Key::Left | Key::Right)
    }

    /// Translation for the inline text editor, if the key means anything there.
    pub fn to_text_key(&self) -> Option<TextKey> {
        Some(match self {
            Key::Char(c) => TextKey::Char(*c),
            Key::BackSpace => TextKey::BackSpace,
            Key::Delete => TextKey::Delete,
            Key::Tab => TextKey::Char('\t'),
            Key::Return => TextKey::Char('\n'),
            Key::Space => TextKey::Char(' '),
            Key::Up => TextKey::Up,
            Key::Down => TextKey::Down,
            Key::Left => TextKey::Left,
            Key::Right => TextKey::Right,
            Key::Home => TextKey::Home,
            Key::End => TextKey::End,
            Key::Escape | Key::Named(_) => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        assert_eq!(Key::from_code(8), Key::BackSpace);
        assert_eq!(Key::from_code(13), Key::Return);
        assert_eq!(Key::from_code(63232), Key::Up);
        assert_eq!(Key::from_code(29), Key::Right);
        assert_eq!(Key::from_code(63275), Key::End);
        assert_eq!(Key::from_code('a' as u32), Key::Char('a'));
        assert_eq!(Key::from_code(0xE9), Key::Char('é'));
        assert_eq!(Key::from_code(63276), Key::Named("Prior".into()));
        assert_eq!(Key::from_code(63277), Key::Named("Next".into()));
        assert_eq!(Key::from_code(63236), Key::Named("F1".into()));
        assert_eq!(Key::from_code(63247), Key::Named("F12".into()));
    }

    #[test]
    fn test_braces_are_dropped() {
        assert!(Key::from_code('{' as u32).is_dropped());
        assert!(Key::from_name("}").is_dropped());
        assert!(!Key::Char('[').is_dropped());
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(Key::from_name("Left"), Key::Left);
        assert_eq!(Key::from_name("x"), Key::Char('x'));
        assert_eq!(Key::from_name("F5"), Key::Named("F5".into()));
    }

    #[test]
    fn test_text_key_mapping() {
        assert_eq!(Key::Return.to_text_key(), Some(TextKey::Char('\n')));
        assert_eq!(Key::Escape.to_text_key(), None);
        assert!(Key::Down.is_arrow());
        assert!(!Key::Home.is_arrow());
    }
}
