//! Box geometry, port hot-zones and cord hit-testing.
//!
//! All coordinates are integer canvas pixels. A [`Rect`] is inclusive of
//! its top-left corner and spans to `(x2, y2)`.

use crate::config::EditorConfig;
use crate::model::{Object, ObjectKind};
use crate::rtext::layout_text;

pub const TOGGLE_SIZE: i32 = 15;
pub const SLIDER_WIDTH: i32 = 15;
pub const SLIDER_HEIGHT: i32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// True when the two rectangles touch or overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x2 >= self.x1 && other.x1 <= self.x2 && other.y2 >= self.y1 && other.y1 <= self.y2
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

/// Bounding rectangle of an object as drawn.
pub fn object_rect(obj: &Object, cfg: &EditorConfig) -> Rect {
    let (w, h) = match obj.kind {
        ObjectKind::Toggle => (TOGGLE_SIZE, TOGGLE_SIZE),
        ObjectKind::Slider => (SLIDER_WIDTH, SLIDER_HEIGHT),
        kind => {
            let width = match kind {
                ObjectKind::Atom => Some(obj.width.unwrap_or(5)),
                _ => obj.width,
            };
            let layout = layout_text(
                obj.display_text(),
                width,
                kind.text_style(),
                (0, 0),
                &cfg.text_metrics(),
            );
            (layout.width_px, layout.height_px)
        }
    };
    Rect::new(obj.x, obj.y, obj.x + w, obj.y + h)
}

/// Nearest of `nports` ports evenly spread across `rect` for pointer x.
pub fn closest_port(rect: &Rect, nports: usize, x: i32) -> usize {
    if nports <= 1 {
        return 0;
    }
    let width = rect.width().max(1);
    let span = nports as i32 - 1;
    let closest = ((x - rect.x1) * span + width / 2).div_euclid(width);
    closest.clamp(0, span) as usize
}

/// Left edge of port `index` out of `nports` along `rect`.
pub fn port_left(rect: &Rect, nports: usize, index: usize, cfg: &EditorConfig) -> i32 {
    if nports > 1 {
        rect.x1 + (rect.width() - cfg.port_width) * index as i32 / (nports as i32 - 1)
    } else {
        rect.x1
    }
}

/// Outlet under the pointer, if the pointer is inside the outlet strip along
/// the bottom edge and within one pixel of a nub.
pub fn outlet_at(rect: &Rect, noutlets: usize, x: i32, y: i32, cfg: &EditorConfig) -> Option<usize> {
    if noutlets == 0 || y < rect.y2 - cfg.port_height + 1 {
        return None;
    }
    let width = rect.width().max(1);
    let nout1 = if noutlets > 1 { noutlets as i32 - 1 } else { 1 };
    let closest = ((x - rect.x1) * nout1 + width / 2).div_euclid(width);
    if closest < 0 || closest as usize >= noutlets {
        return None;
    }
    let hotspot = rect.x1 + (width - cfg.port_width) * closest / nout1;
    if x >= hotspot - 1 && x <= hotspot + cfg.port_width + 1 {
        Some(closest as usize)
    } else {
        None
    }
}

/// Endpoints of a cord from `outlet` of the source box to `inlet` of the sink.
pub fn cord_endpoints(
    src: &Rect,
    noutlets: usize,
    outlet: usize,
    dst: &Rect,
    ninlets: usize,
    inlet: usize,
    cfg: &EditorConfig,
) -> (Point, Point) {
    let mid = cfg.port_middle();
    let from = Point::new(port_left(src, noutlets, outlet, cfg) + mid, src.y2);
    let to = Point::new(port_left(dst, ninlets, inlet, cfg) + mid, dst.y1);
    (from, to)
}

/// Point-to-segment proximity without square roots: the squared signed area
/// of (a, b, p) must stay under `threshold` times the squared segment length,
/// and p must project between a and b.
pub fn segment_hit(p: Point, a: Point, b: Point, threshold: i64) -> bool {
    let (fx, fy) = (p.x as i64, p.y as i64);
    let (lx1, ly1, lx2, ly2) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);
    let area = (lx2 - lx1) * (fy - ly1) - (ly2 - ly1) * (fx - lx1);
    let dsquare = (lx2 - lx1) * (lx2 - lx1) + (ly2 - ly1) * (ly2 - ly1);
    if area * area >= threshold * dsquare {
        return false;
    }
    if (lx2 - lx1) * (fx - lx1) + (ly2 - ly1) * (fy - ly1) < 0 {
        return false;
    }
    if (lx2 - lx1) * (lx2 - fx) + (ly2 - ly1) * (ly2 - fy) < 0 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_hit_perpendicular_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(100, 0);
        assert!(segment_hit(Point::new(50, 0), a, b, 50));
        assert!(segment_hit(Point::new(50, 7), a, b, 50), "7² < 50");
        assert!(!segment_hit(Point::new(50, 8), a, b, 50), "8² >= 50");
    }

    #[test]
    fn test_segment_hit_projection_bounds() {
        let a = Point::new(0, 0);
        let b = Point::new(0, 100);
        assert!(!segment_hit(Point::new(0, -3), a, b, 50));
        assert!(!segment_hit(Point::new(0, 103), a, b, 50));
        assert!(segment_hit(Point::new(2, 100), a, b, 50));
    }

    #[test]
    fn test_degenerate_segment_never_hits() {
        let a = Point::new(5, 5);
        assert!(!segment_hit(Point::new(5, 5), a, a, 50));
    }

    #[test]
    fn test_outlet_hotspots() {
        let cfg = EditorConfig::default();
        let r = Rect::new(0, 0, 100, 20);
        assert_eq!(outlet_at(&r, 2, 3, 19, &cfg), Some(0));
        assert_eq!(outlet_at(&r, 2, 96, 19, &cfg), Some(1));
        assert_eq!(outlet_at(&r, 2, 50, 19, &cfg), None, "between nubs");
        assert_eq!(outlet_at(&r, 2, 3, 10, &cfg), None, "above the strip");
        assert_eq!(outlet_at(&r, 1, 4, 20, &cfg), Some(0));
        assert_eq!(outlet_at(&r, 0, 4, 20, &cfg), None);
    }

    #[test]
    fn test_cord_endpoints_center_on_nubs() {
        let cfg = EditorConfig::default();
        let src = Rect::new(10, 10, 60, 30);
        let dst = Rect::new(10, 80, 110, 100);
        let (from, to) = cord_endpoints(&src, 1, 0, &dst, 2, 1, &cfg);
        assert_eq!(from, Point::new(13, 30));
        assert_eq!(to, Point::new(10 + 93 + 3, 80));
    }

    #[test]
    fn test_closest_port() {
        let r = Rect::new(0, 0, 100, 20);
        assert_eq!(closest_port(&r, 1, 80), 0);
        assert_eq!(closest_port(&r, 3, 0), 0);
        assert_eq!(closest_port(&r, 3, 49), 1);
        assert_eq!(closest_port(&r, 3, 99), 2);
        assert_eq!(closest_port(&r, 3, 500), 2);
    }

    #[test]
    fn test_rect_intersects_touching() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersects(&Rect::new(10, 10, 20, 20)));
        assert!(!a.intersects(&Rect::new(11, 0, 20, 10)));
    }
}
