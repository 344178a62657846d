use serde::{Deserialize, Serialize};

use crate::rtext::{RText, TextStyle};

// ────────────────────────────────────────────────────────────────────────────
// PatchDoc – binary serialization wrapper
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchDoc {
    pub patch: Fragment,
}

impl PatchDoc {
    /// Save the PatchDoc to a binary file with magic bytes and versioning.
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, b"PATCHEDIT")?;
        std::io::Write::write_all(&mut writer, &1u32.to_le_bytes())?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Load a PatchDoc from a binary file, checking magic bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 9];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if &magic != b"PATCHEDIT" {
            anyhow::bail!("Invalid magic bytes: expected 'PATCHEDIT'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != 1 {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let doc: PatchDoc =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(doc)
    }

    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Stable identity of an object within its canvas. Never reused, so a stale
/// id simply fails to resolve after the object is rebuilt or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanvasId(pub u32);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "o{}", self.0)
    }
}

impl std::fmt::Display for CanvasId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Serialized form
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Control,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Object box, instantiated from its text.
    Box,
    Message,
    Comment,
    /// Number box.
    Atom,
    Toggle,
    Slider,
}

impl ObjectKind {
    /// Kinds whose content is edited inline.
    pub fn has_text(self) -> bool {
        matches!(
            self,
            ObjectKind::Box | ObjectKind::Message | ObjectKind::Comment | ObjectKind::Atom
        )
    }

    pub fn text_style(self) -> TextStyle {
        match self {
            ObjectKind::Comment => TextStyle::Comment,
            _ => TextStyle::Box,
        }
    }
}

/// One object as stored in a patch file, clipboard or undo buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub kind: ObjectKind,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: f32,
}

impl ObjectRecord {
    pub fn new(kind: ObjectKind, x: i32, y: i32, text: &str) -> Self {
        Self {
            kind,
            x,
            y,
            width: None,
            text: text.to_string(),
            value: 0.0,
        }
    }
}

/// Edge between two objects, addressed by position in the object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectRecord {
    pub src: usize,
    pub outlet: usize,
    pub dst: usize,
    pub inlet: usize,
}

impl ConnectRecord {
    pub fn new(src: usize, outlet: usize, dst: usize, inlet: usize) -> Self {
        Self {
            src,
            outlet,
            dst,
            inlet,
        }
    }
}

/// A set of objects plus the edges among them. Edge indices are relative
/// to `objects`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectRecord>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Live objects
// ────────────────────────────────────────────────────────────────────────────

/// Port layout produced when an object is (re)instantiated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPorts {
    pub inlets: Vec<PortKind>,
    pub outlets: Vec<PortKind>,
    /// False when the object failed to build; ports are then grown on demand
    /// so connections from a saved file survive.
    pub materialized: bool,
}

impl ObjectPorts {
    pub fn new(inlets: Vec<PortKind>, outlets: Vec<PortKind>) -> Self {
        Self {
            inlets,
            outlets,
            materialized: true,
        }
    }

    pub fn broken() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cord {
    pub dst: ObjectId,
    pub inlet: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlet {
    pub kind: PortKind,
    /// Fan-out in connection order.
    pub cords: Vec<Cord>,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub x: i32,
    pub y: i32,
    pub width: Option<usize>,
    pub text: String,
    pub value: f32,
    pub inlets: Vec<PortKind>,
    pub outlets: Vec<Outlet>,
    pub materialized: bool,
    /// Present only while the text is open for inline editing.
    pub rtext: Option<RText>,
}

impl Object {
    pub fn from_record(id: ObjectId, rec: &ObjectRecord, ports: ObjectPorts) -> Self {
        Self {
            id,
            kind: rec.kind,
            x: rec.x,
            y: rec.y,
            width: rec.width,
            text: rec.text.clone(),
            value: rec.value,
            inlets: ports.inlets,
            outlets: ports
                .outlets
                .into_iter()
                .map(|kind| Outlet {
                    kind,
                    cords: Vec::new(),
                })
                .collect(),
            materialized: ports.materialized,
            rtext: None,
        }
    }

    pub fn to_record(&self) -> ObjectRecord {
        ObjectRecord {
            kind: self.kind,
            x: self.x,
            y: self.y,
            width: self.width,
            text: self.text.clone(),
            value: self.value,
        }
    }

    /// Text currently shown in the box, including uncommitted edits.
    pub fn display_text(&self) -> &str {
        match &self.rtext {
            Some(rt) => rt.text(),
            None => &self.text,
        }
    }

    pub fn displace(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Canvas arena
// ────────────────────────────────────────────────────────────────────────────

/// Ordered object list of one patch surface. Edges live in each object's
/// outlet fan-out; there is no separate edge table.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub id: CanvasId,
    pub parent: Option<CanvasId>,
    objects: Vec<Object>,
    next_id: u64,
}

impl Canvas {
    pub fn new(id: CanvasId, parent: Option<CanvasId>) -> Self {
        Self {
            id,
            parent,
            objects: Vec::new(),
            next_id: 1,
        }
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Object> {
        self.objects.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.objects.get_mut(index)
    }

    /// Append an object, returning its index.
    pub fn push(&mut self, obj: Object) -> usize {
        self.objects.push(obj);
        self.objects.len() - 1
    }

    /// Remove an object along with every cord into or out of it.
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        let index = self.index_of(id)?;
        let obj = self.objects.remove(index);
        for other in &mut self.objects {
            for outlet in &mut other.outlets {
                outlet.cords.retain(|c| c.dst != id);
            }
        }
        Some(obj)
    }

    /// Move the object at `from` so that it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.objects.len() || to >= self.objects.len() || from == to {
            return;
        }
        let obj = self.objects.remove(from);
        self.objects.insert(to, obj);
    }

    /// Serialize the objects at `indices` (in list order) plus the edges
    /// running between them.
    pub fn to_fragment(&self, indices: &[usize]) -> Fragment {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.objects.len())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();
        let objects = sorted.iter().map(|&i| self.objects[i].to_record()).collect();
        let mut connections = Vec::new();
        for (src_rel, &src) in sorted.iter().enumerate() {
            for (outlet_no, outlet) in self.objects[src].outlets.iter().enumerate() {
                for cord in &outlet.cords {
                    let dst_rel = self
                        .index_of(cord.dst)
                        .and_then(|d| sorted.iter().position(|&s| s == d));
                    if let Some(dst_rel) = dst_rel {
                        connections.push(ConnectRecord::new(src_rel, outlet_no, dst_rel, cord.inlet));
                    }
                }
            }
        }
        Fragment {
            objects,
            connections,
        }
    }

    /// Serialize the whole canvas.
    pub fn to_doc(&self) -> PatchDoc {
        let all: Vec<usize> = (0..self.objects.len()).collect();
        PatchDoc {
            patch: self.to_fragment(&all),
        }
    }
}
