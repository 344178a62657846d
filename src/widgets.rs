//! Per-kind capability implementations.
//!
//! Query with [`clickable`] and [`propertied`]; a `None` means the kind
//! lacks that capability.

use crate::geometry::SLIDER_HEIGHT;
use crate::host::{ClickInfo, ClickOutcome, Clickable, Host, Propertied};
use crate::input::Key;
use crate::model::{Object, ObjectKind};

pub struct MessageBehavior;
pub struct ToggleBehavior;
pub struct SliderBehavior;
pub struct AtomBehavior;

static MESSAGE: MessageBehavior = MessageBehavior;
static TOGGLE: ToggleBehavior = ToggleBehavior;
static SLIDER: SliderBehavior = SliderBehavior;
static ATOM: AtomBehavior = AtomBehavior;

pub fn clickable(kind: ObjectKind) -> Option<&'static dyn Clickable> {
    match kind {
        ObjectKind::Message => Some(&MESSAGE),
        ObjectKind::Toggle => Some(&TOGGLE),
        ObjectKind::Slider => Some(&SLIDER),
        ObjectKind::Atom => Some(&ATOM),
        ObjectKind::Box | ObjectKind::Comment => None,
    }
}

pub fn propertied(kind: ObjectKind) -> Option<&'static dyn Propertied> {
    match kind {
        ObjectKind::Toggle => Some(&TOGGLE),
        ObjectKind::Slider => Some(&SLIDER),
        ObjectKind::Atom => Some(&ATOM),
        _ => None,
    }
}

fn format_value(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

impl Clickable for MessageBehavior {
    fn click(&self, obj: &mut Object, info: &ClickInfo, host: &mut dyn Host) -> ClickOutcome {
        if info.commit {
            host.send(obj.id, &obj.text);
        }
        ClickOutcome::Clicked
    }
}

impl Clickable for ToggleBehavior {
    fn click(&self, obj: &mut Object, info: &ClickInfo, host: &mut dyn Host) -> ClickOutcome {
        if info.commit {
            obj.value = if obj.value == 0.0 { 1.0 } else { 0.0 };
            host.send(obj.id, &format_value(obj.value));
        }
        ClickOutcome::Clicked
    }
}

impl Propertied for ToggleBehavior {
    fn properties(&self, obj: &Object) -> Vec<(String, String)> {
        vec![("value".into(), format_value(obj.value))]
    }
}

impl Clickable for SliderBehavior {
    fn click(&self, obj: &mut Object, info: &ClickInfo, host: &mut dyn Host) -> ClickOutcome {
        if info.commit {
            // jump to the click position, bottom is 0
            let from_bottom = (obj.y + SLIDER_HEIGHT - info.y).clamp(0, SLIDER_HEIGHT - 1);
            obj.value = from_bottom as f32;
            host.send(obj.id, &format_value(obj.value));
        }
        ClickOutcome::Grab
    }

    fn drag(&self, obj: &mut Object, _dx: i32, dy: i32, host: &mut dyn Host) {
        let v = (obj.value - dy as f32).clamp(0.0, (SLIDER_HEIGHT - 1) as f32);
        if v != obj.value {
            obj.value = v;
            host.send(obj.id, &format_value(v));
        }
    }
}

impl Propertied for SliderBehavior {
    fn properties(&self, obj: &Object) -> Vec<(String, String)> {
        vec![
            ("value".into(), format_value(obj.value)),
            ("range".into(), format!("0 {}", SLIDER_HEIGHT - 1)),
        ]
    }
}

impl Clickable for AtomBehavior {
    fn click(&self, _obj: &mut Object, _info: &ClickInfo, _host: &mut dyn Host) -> ClickOutcome {
        ClickOutcome::Grab
    }

    fn drag(&self, obj: &mut Object, _dx: i32, dy: i32, host: &mut dyn Host) {
        if dy != 0 {
            obj.value -= dy as f32;
            obj.text = format_value(obj.value);
            host.send(obj.id, &obj.text);
        }
    }

    fn key(&self, obj: &mut Object, key: &Key, host: &mut dyn Host) -> bool {
        let step = match key {
            Key::Up => 1.0,
            Key::Down => -1.0,
            _ => return false,
        };
        obj.value += step;
        obj.text = format_value(obj.value);
        host.send(obj.id, &obj.text);
        true
    }
}

impl Propertied for AtomBehavior {
    fn properties(&self, obj: &Object) -> Vec<(String, String)> {
        vec![
            ("value".into(), format_value(obj.value)),
            ("width".into(), obj.width.unwrap_or(5).to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BasicHost;
    use crate::model::{ObjectId, ObjectPorts, ObjectRecord};

    fn widget(kind: ObjectKind) -> Object {
        Object::from_record(
            ObjectId(1),
            &ObjectRecord::new(kind, 0, 0, ""),
            ObjectPorts::default(),
        )
    }

    fn info(commit: bool) -> ClickInfo {
        ClickInfo {
            x: 5,
            y: 5,
            shift: false,
            alt: false,
            double: false,
            commit,
        }
    }

    #[test]
    fn test_capability_queries() {
        assert!(clickable(ObjectKind::Box).is_none());
        assert!(clickable(ObjectKind::Toggle).is_some());
        assert!(propertied(ObjectKind::Message).is_none());
        assert!(propertied(ObjectKind::Slider).is_some());
    }

    #[test]
    fn test_toggle_flips_only_on_commit() {
        let mut host = BasicHost::new();
        let mut t = widget(ObjectKind::Toggle);
        let c = clickable(t.kind).unwrap();
        assert_eq!(c.click(&mut t, &info(false), &mut host), ClickOutcome::Clicked);
        assert_eq!(t.value, 0.0);
        c.click(&mut t, &info(true), &mut host);
        assert_eq!(t.value, 1.0);
        assert_eq!(host.log().borrow().sent.last().unwrap().1, "1");
    }

    #[test]
    fn test_slider_grabs_and_drags() {
        let mut host = BasicHost::new();
        let mut s = widget(ObjectKind::Slider);
        let c = clickable(s.kind).unwrap();
        let mut i = info(true);
        i.y = SLIDER_HEIGHT - 10;
        assert_eq!(c.click(&mut s, &i, &mut host), ClickOutcome::Grab);
        assert_eq!(s.value, 10.0);
        c.drag(&mut s, 0, -5, &mut host);
        assert_eq!(s.value, 15.0);
        c.drag(&mut s, 0, 500, &mut host);
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_atom_arrow_keys() {
        let mut host = BasicHost::new();
        let mut a = widget(ObjectKind::Atom);
        let c = clickable(a.kind).unwrap();
        assert!(c.key(&mut a, &Key::Up, &mut host));
        assert!(c.key(&mut a, &Key::Up, &mut host));
        assert!(!c.key(&mut a, &Key::Char('x'), &mut host));
        assert_eq!(a.text, "2");
    }
}
