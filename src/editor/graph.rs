//! Connection storage and traversal.
//!
//! Edges live in each object's outlet fan-out. [`edges`] walks them in
//! object-list order, then outlet order, then connection order, yielding
//! both the index tuple and the on-screen geometry of every cord.

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::geometry::{Point, cord_endpoints, segment_hit};
use crate::host::{Connectable, Host};
use crate::model::{Canvas, ConnectRecord, Cord, ObjectId, ObjectKind, Outlet, PortKind};
use crate::render::Tag;

/// One cord as seen by the traversal cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub src: usize,
    pub outlet: usize,
    pub dst: usize,
    pub inlet: usize,
    pub src_id: ObjectId,
    pub dst_id: ObjectId,
    pub signal: bool,
    pub from: Point,
    pub to: Point,
}

impl Edge {
    pub fn record(&self) -> ConnectRecord {
        ConnectRecord::new(self.src, self.outlet, self.dst, self.inlet)
    }

    pub fn tag(&self) -> Tag {
        Tag::Cord {
            src: self.src_id,
            outlet: self.outlet,
            dst: self.dst_id,
            inlet: self.inlet,
        }
    }

    pub fn touches(&self, id: ObjectId) -> bool {
        self.src_id == id || self.dst_id == id
    }
}

pub struct EdgeCursor<'a> {
    canvas: &'a Canvas,
    host: &'a dyn Host,
    cfg: &'a EditorConfig,
    obj: usize,
    outlet: usize,
    cord: usize,
}

impl Iterator for EdgeCursor<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        loop {
            let src = self.canvas.at(self.obj)?;
            let Some(outlet) = src.outlets.get(self.outlet) else {
                self.obj += 1;
                self.outlet = 0;
                self.cord = 0;
                continue;
            };
            let Some(cord) = outlet.cords.get(self.cord).copied() else {
                self.outlet += 1;
                self.cord = 0;
                continue;
            };
            self.cord += 1;
            let Some(dst_index) = self.canvas.index_of(cord.dst) else {
                continue;
            };
            let Some(dst) = self.canvas.at(dst_index) else {
                continue;
            };
            let src_rect = self.host.bounding_rect(src, self.cfg);
            let dst_rect = self.host.bounding_rect(dst, self.cfg);
            let (from, to) = cord_endpoints(
                &src_rect,
                src.outlet_count(),
                self.outlet,
                &dst_rect,
                dst.inlet_count(),
                cord.inlet,
                self.cfg,
            );
            return Some(Edge {
                src: self.obj,
                outlet: self.outlet,
                dst: dst_index,
                inlet: cord.inlet,
                src_id: src.id,
                dst_id: cord.dst,
                signal: outlet.kind == PortKind::Signal,
                from,
                to,
            });
        }
    }
}

/// Traverse every cord of `canvas`.
pub fn edges<'a>(canvas: &'a Canvas, host: &'a dyn Host, cfg: &'a EditorConfig) -> EdgeCursor<'a> {
    EdgeCursor {
        canvas,
        host,
        cfg,
        obj: 0,
        outlet: 0,
        cord: 0,
    }
}

pub fn is_connected(canvas: &Canvas, rec: ConnectRecord) -> bool {
    let (Some(src), Some(dst)) = (canvas.at(rec.src), canvas.at(rec.dst)) else {
        return false;
    };
    src.outlets.get(rec.outlet).is_some_and(|o| {
        o.cords
            .iter()
            .any(|c| c.dst == dst.id && c.inlet == rec.inlet)
    })
}

/// Validate a prospective edge without touching the graph.
pub fn can_connect(canvas: &Canvas, rec: ConnectRecord) -> EditorResult<()> {
    let (Some(src), Some(dst)) = (canvas.at(rec.src), canvas.at(rec.dst)) else {
        return Err(EditorError::rejected(format!(
            "connection failed: no object {} or {}",
            rec.src, rec.dst
        )));
    };
    if src.id == dst.id {
        return Err(EditorError::rejected("can't connect an object to itself"));
    }
    if rec.outlet >= src.outlet_count() || rec.inlet >= dst.inlet_count() {
        return Err(EditorError::rejected(format!(
            "connection failed: no outlet {} or inlet {}",
            rec.outlet, rec.inlet
        )));
    }
    if is_connected(canvas, rec) {
        return Err(EditorError::rejected("already connected"));
    }
    if src.is_signal_outlet(rec.outlet) && !dst.is_signal_inlet(rec.inlet) {
        return Err(EditorError::rejected(
            "can't connect signal outlet to control inlet",
        ));
    }
    Ok(())
}

/// Give broken object boxes the ports a saved connection refers to.
fn grow_ports(canvas: &mut Canvas, rec: ConnectRecord) {
    if let Some(src) = canvas.at_mut(rec.src) {
        if !src.materialized && src.kind == ObjectKind::Box {
            while src.outlets.len() <= rec.outlet {
                src.outlets.push(Outlet {
                    kind: PortKind::Control,
                    cords: Vec::new(),
                });
            }
        }
    }
    if let Some(dst) = canvas.at_mut(rec.dst) {
        if !dst.materialized && dst.kind == ObjectKind::Box {
            while dst.inlets.len() <= rec.inlet {
                dst.inlets.push(PortKind::Control);
            }
        }
    }
}

/// Add an edge by index. Indices must already account for any paste onset.
pub fn connect(canvas: &mut Canvas, rec: ConnectRecord) -> EditorResult<ConnectRecord> {
    grow_ports(canvas, rec);
    can_connect(canvas, rec)?;
    let dst_id = canvas
        .at(rec.dst)
        .map(|o| o.id)
        .ok_or_else(|| EditorError::not_found(format!("object {}", rec.dst)))?;
    let src = canvas
        .at_mut(rec.src)
        .ok_or_else(|| EditorError::not_found(format!("object {}", rec.src)))?;
    src.outlets[rec.outlet].cords.push(Cord {
        dst: dst_id,
        inlet: rec.inlet,
    });
    tracing::trace!(
        target: "patchedit::graph",
        "connect {} {} {} {}",
        rec.src,
        rec.outlet,
        rec.dst,
        rec.inlet
    );
    Ok(rec)
}

/// Remove the exact edge; missing edges are reported as not found.
pub fn disconnect(canvas: &mut Canvas, rec: ConnectRecord) -> EditorResult<()> {
    let dst_id = canvas.at(rec.dst).map(|o| o.id);
    let removed = match (dst_id, canvas.at_mut(rec.src)) {
        (Some(dst_id), Some(src)) => match src.outlets.get_mut(rec.outlet) {
            Some(outlet) => {
                let before = outlet.cords.len();
                outlet
                    .cords
                    .retain(|c| !(c.dst == dst_id && c.inlet == rec.inlet));
                outlet.cords.len() != before
            }
            None => false,
        },
        _ => false,
    };
    if !removed {
        return Err(EditorError::not_found(format!(
            "disconnect {} {} {} {}: no such connection",
            rec.src, rec.outlet, rec.dst, rec.inlet
        )));
    }
    Ok(())
}

/// First cord passing within the hit threshold of `(x, y)`.
pub fn hit_line(
    canvas: &Canvas,
    host: &dyn Host,
    cfg: &EditorConfig,
    x: i32,
    y: i32,
) -> Option<Edge> {
    let p = Point::new(x, y);
    edges(canvas, host, cfg).find(|e| segment_hit(p, e.from, e.to, cfg.line_hit_threshold))
}
