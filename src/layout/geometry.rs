// Pure geometry used by vertex selection and the force solver. Points are
// (x, y) = (lon, lat) tuples in degrees.

use crate::ir::{Bounds, Vertex};

type Point = (f64, f64);

const PARALLEL_EPS: f64 = 1e-12;

/// Axis-aligned box; `bottom < top` in latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl LabelBox {
    pub fn around(center: Point, half_w: f64, half_h: f64) -> Self {
        Self {
            left: center.0 - half_w,
            right: center.0 + half_w,
            bottom: center.1 - half_h,
            top: center.1 + half_h,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.0 >= self.left && point.0 <= self.right && point.1 >= self.bottom && point.1 <= self.top
    }
}

/// Interior angle in degrees at `ring[index]`, formed with its wrapped ring
/// neighbours. A zero-length adjacent edge yields 180.
pub fn vertex_angle(ring: &[Vertex], index: usize) -> f64 {
    let n = ring.len();
    if n < 3 || index >= n {
        return 180.0;
    }
    let prev = ring[(index + n - 1) % n].xy();
    let curr = ring[index].xy();
    let next = ring[(index + 1) % n].xy();
    let v1 = (prev.0 - curr.0, prev.1 - curr.1);
    let v2 = (next.0 - curr.0, next.1 - curr.1);
    let len1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let len2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if len1 <= f64::EPSILON || len2 <= f64::EPSILON {
        return 180.0;
    }
    let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / (len1 * len2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Liang-Barsky test of segment `p1`-`p2` against `rect`.
pub fn segment_intersects_box(p1: Point, p2: Point, rect: &LabelBox) -> bool {
    if (p1.0 < rect.left && p2.0 < rect.left)
        || (p1.0 > rect.right && p2.0 > rect.right)
        || (p1.1 < rect.bottom && p2.1 < rect.bottom)
        || (p1.1 > rect.top && p2.1 > rect.top)
    {
        return false;
    }
    if rect.contains(p1) || rect.contains(p2) {
        return true;
    }

    let dx = p2.0 - p1.0;
    let dy = p2.1 - p1.1;
    let p = [-dx, dx, -dy, dy];
    let q = [
        p1.0 - rect.left,
        rect.right - p1.0,
        p1.1 - rect.bottom,
        rect.top - p1.1,
    ];
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (pi, qi) in p.iter().zip(q.iter()) {
        if pi.abs() <= PARALLEL_EPS {
            // Parallel to this edge: must lie inside its slab.
            if *qi < 0.0 {
                return false;
            }
            continue;
        }
        let t = qi / pi;
        if *pi < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
    }
    t0 <= t1
}

pub fn boxes_overlap(a: &LabelBox, b: &LabelBox) -> bool {
    a.left < b.right && a.right > b.left && a.bottom < b.top && a.top > b.bottom
}

/// Penetration depth along each axis; zero when the boxes are apart.
pub fn overlap_depth(a: &LabelBox, b: &LabelBox) -> (f64, f64) {
    let x = (a.right.min(b.right) - a.left.max(b.left)).max(0.0);
    let y = (a.top.min(b.top) - a.bottom.max(b.bottom)).max(0.0);
    (x, y)
}

/// Mean of the ring's vertices.
pub fn ring_centroid(ring: &[Vertex]) -> Option<Vertex> {
    if ring.is_empty() {
        return None;
    }
    let n = ring.len() as f64;
    let (sum_lat, sum_lon) = ring
        .iter()
        .fold((0.0, 0.0), |acc, v| (acc.0 + v.lat, acc.1 + v.lon));
    Some(Vertex::new(sum_lat / n, sum_lon / n))
}

/// Clamp a label center so that its box, grown by padding, stays inside
/// `bounds`. Collapses to the bounds' center on an axis that is too small.
pub fn clamp_center_to_bounds(center: Point, half_w: f64, half_h: f64, bounds: &Bounds) -> Point {
    let min_x = bounds.west + half_w;
    let max_x = bounds.east - half_w;
    let min_y = bounds.south + half_h;
    let max_y = bounds.north - half_h;

    let x = if max_x < min_x {
        (bounds.west + bounds.east) * 0.5
    } else {
        center.0.clamp(min_x, max_x)
    };
    let y = if max_y < min_y {
        (bounds.south + bounds.north) * 0.5
    } else {
        center.1.clamp(min_y, max_y)
    };
    (x, y)
}
