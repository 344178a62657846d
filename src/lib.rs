//! Editing core for visual dataflow patches.
//!
//! This crate tracks selection, undo history, typed connections between
//! object ports, the mouse/keyboard gesture state machine and the inline
//! UTF-8 text editor used to retype objects. Rendering, persistence and the
//! host object system are reached through the [`render::Renderer`],
//! [`persist::Persistence`] and [`host::Host`] traits.
//!
//! The binary `patchedit` loads a patch, replays an event script against it
//! and prints the resulting patch as JSON.

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod host;
pub mod input;
pub mod model;
pub mod persist;
pub mod render;
pub mod rtext;
pub mod script;
pub mod timer;
pub mod utf8;
pub mod widgets;

pub use config::EditorConfig;
pub use editor::{CanvasEditor, EditorContext, EditorMode, Session};
pub use error::{EditorError, EditorResult};
pub use input::{Cursor, Key, Modifiers, MouseButton};
pub use model::{
    Canvas, CanvasId, ConnectRecord, Fragment, ObjectId, ObjectKind, ObjectRecord, PatchDoc,
};
