//! Seams to the host object system.
//!
//! The editor never inspects an object's runtime type. It asks the
//! [`Host`] to build objects from text and queries per-kind capabilities
//! ([`Clickable`], [`Connectable`], [`Propertied`]) through
//! [`crate::widgets`].

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::EditorConfig;
use crate::geometry::{Rect, object_rect};
use crate::input::{Cursor, Key};
use crate::model::{Object, ObjectId, ObjectKind, ObjectPorts, PortKind};

// ────────────────────────────────────────────────────────────────────────────
// Capabilities
// ────────────────────────────────────────────────────────────────────────────

/// Pointer event delivered to a clickable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickInfo {
    pub x: i32,
    pub y: i32,
    pub shift: bool,
    pub alt: bool,
    pub double: bool,
    /// False for hover checks, which must not change any state.
    pub commit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The object does not react here; keep looking.
    Ignored,
    /// Handled in one shot.
    Clicked,
    /// The object wants subsequent motion and keys until release.
    Grab,
}

impl ClickOutcome {
    pub fn cursor(self) -> Cursor {
        match self {
            ClickOutcome::Ignored => Cursor::RunNothing,
            ClickOutcome::Clicked | ClickOutcome::Grab => Cursor::RunClickMe,
        }
    }
}

pub trait Clickable {
    fn click(&self, obj: &mut Object, info: &ClickInfo, host: &mut dyn Host) -> ClickOutcome;

    /// Pointer motion while grabbed.
    fn drag(&self, _obj: &mut Object, _dx: i32, _dy: i32, _host: &mut dyn Host) {}

    /// Key press while grabbed. Returns true if consumed.
    fn key(&self, _obj: &mut Object, _key: &Key, _host: &mut dyn Host) -> bool {
        false
    }
}

pub trait Connectable {
    fn inlet_count(&self) -> usize;
    fn outlet_count(&self) -> usize;
    fn inlet_kind(&self, n: usize) -> Option<PortKind>;
    fn outlet_kind(&self, n: usize) -> Option<PortKind>;

    fn is_signal_inlet(&self, n: usize) -> bool {
        self.inlet_kind(n) == Some(PortKind::Signal)
    }

    fn is_signal_outlet(&self, n: usize) -> bool {
        self.outlet_kind(n) == Some(PortKind::Signal)
    }
}

impl Connectable for Object {
    fn inlet_count(&self) -> usize {
        self.inlets.len()
    }

    fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    fn inlet_kind(&self, n: usize) -> Option<PortKind> {
        self.inlets.get(n).copied()
    }

    fn outlet_kind(&self, n: usize) -> Option<PortKind> {
        self.outlets.get(n).map(|o| o.kind)
    }
}

pub trait Propertied {
    /// Name/value pairs shown in the properties dialog.
    fn properties(&self, obj: &Object) -> Vec<(String, String)>;
}

// ────────────────────────────────────────────────────────────────────────────
// Host
// ────────────────────────────────────────────────────────────────────────────

pub trait Host {
    /// Build (or rebuild) an object from its kind and text.
    fn instantiate(&mut self, kind: ObjectKind, text: &str) -> ObjectPorts;

    fn bounding_rect(&self, obj: &Object, cfg: &EditorConfig) -> Rect {
        object_rect(obj, cfg)
    }

    /// Deliver a message on behalf of an object.
    fn send(&mut self, from: ObjectId, message: &str);

    /// Key events nobody in the editor consumed.
    fn key_broadcast(&mut self, down: bool, key: &Key, shift: bool);

    fn open_properties(&mut self, obj: ObjectId, props: &[(String, String)]);
}

/// Everything a [`BasicHost`] was asked to do, for inspection.
#[derive(Debug, Clone, Default)]
pub struct HostLog {
    pub sent: Vec<(ObjectId, String)>,
    pub keys: Vec<(bool, Key, bool)>,
    pub properties: Vec<(ObjectId, Vec<(String, String)>)>,
    pub instantiated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    pub inlets: Vec<PortKind>,
    pub outlets: Vec<PortKind>,
}

/// Table-driven host: object boxes resolve their first word against a class
/// registry, unknown words produce broken boxes.
#[derive(Debug, Clone)]
pub struct BasicHost {
    classes: IndexMap<String, ClassSpec>,
    log: Rc<RefCell<HostLog>>,
}

impl Default for BasicHost {
    fn default() -> Self {
        use PortKind::{Control as C, Signal as S};
        let mut host = Self {
            classes: IndexMap::new(),
            log: Rc::new(RefCell::new(HostLog::default())),
        };
        for name in ["+", "-", "*", "/", "f", "float", "metro", "pack"] {
            host.register(name, vec![C, C], vec![C]);
        }
        host.register("print", vec![C], vec![]);
        host.register("bang", vec![C], vec![C]);
        host.register("loadbang", vec![], vec![C]);
        host.register("inlet", vec![], vec![C]);
        host.register("outlet", vec![C], vec![]);
        host.register("t", vec![C], vec![C, C]);
        host.register("osc~", vec![S, C], vec![S]);
        host.register("*~", vec![S, C], vec![S]);
        host.register("+~", vec![S, C], vec![S]);
        host.register("sig~", vec![C], vec![S]);
        host.register("snapshot~", vec![S], vec![C]);
        host.register("adc~", vec![C], vec![S, S]);
        host.register("dac~", vec![S, S], vec![]);
        host.register("pd", vec![], vec![]);
        host
    }
}

impl BasicHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, inlets: Vec<PortKind>, outlets: Vec<PortKind>) {
        self.classes
            .insert(name.to_string(), ClassSpec { inlets, outlets });
    }

    /// Shared handle to the activity log; stays valid after the host is boxed.
    pub fn log(&self) -> Rc<RefCell<HostLog>> {
        Rc::clone(&self.log)
    }
}

impl Host for BasicHost {
    fn instantiate(&mut self, kind: ObjectKind, text: &str) -> ObjectPorts {
        use PortKind::Control as C;
        self.log.borrow_mut().instantiated.push(text.to_string());
        match kind {
            ObjectKind::Comment => ObjectPorts::new(vec![], vec![]),
            ObjectKind::Message
            | ObjectKind::Atom
            | ObjectKind::Toggle
            | ObjectKind::Slider => ObjectPorts::new(vec![C], vec![C]),
            ObjectKind::Box => {
                let name = text.split_whitespace().next().unwrap_or("");
                match self.classes.get(name) {
                    Some(spec) => ObjectPorts::new(spec.inlets.clone(), spec.outlets.clone()),
                    None => {
                        tracing::debug!(target: "patchedit::host", "couldn't create \"{text}\"");
                        ObjectPorts::broken()
                    }
                }
            }
        }
    }

    fn send(&mut self, from: ObjectId, message: &str) {
        tracing::trace!(target: "patchedit::host", "{from} sends {message}");
        self.log.borrow_mut().sent.push((from, message.to_string()));
    }

    fn key_broadcast(&mut self, down: bool, key: &Key, shift: bool) {
        self.log.borrow_mut().keys.push((down, key.clone(), shift));
    }

    fn open_properties(&mut self, obj: ObjectId, props: &[(String, String)]) {
        self.log.borrow_mut().properties.push((obj, props.to_vec()));
    }
}
