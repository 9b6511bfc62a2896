//! Planar geometry helpers for segment tests and polyline projection.
//!
//! Everything here works on raw lng/lat coordinates as if they were planar.
//! Callers accept the approximation over the small regions a walking edge or
//! a shape slice spans.

use geo::Coord;

/// Orientation cross products below this magnitude are treated as collinear.
const COLLINEAR_EPSILON: f64 = 1e-16;

fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Whether `q` lies within the bounding box of segment `[a, b]`.
fn on_segment(a: Coord<f64>, b: Coord<f64>, q: Coord<f64>) -> bool {
    q.x >= a.x.min(b.x) && q.x <= a.x.max(b.x) && q.y >= a.y.min(b.y) && q.y <= a.y.max(b.y)
}

/// True iff segments `[p1, p2]` and `[p3, p4]` share a point.
///
/// Orientation-sign test with collinear overlap handled explicitly.
pub fn segments_intersect(
    p1: Coord<f64>,
    p2: Coord<f64>,
    p3: Coord<f64>,
    p4: Coord<f64>,
) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > COLLINEAR_EPSILON && d2 < -COLLINEAR_EPSILON)
        || (d1 < -COLLINEAR_EPSILON && d2 > COLLINEAR_EPSILON))
        && ((d3 > COLLINEAR_EPSILON && d4 < -COLLINEAR_EPSILON)
            || (d3 < -COLLINEAR_EPSILON && d4 > COLLINEAR_EPSILON))
    {
        return true;
    }

    (d1.abs() <= COLLINEAR_EPSILON && on_segment(p3, p4, p1))
        || (d2.abs() <= COLLINEAR_EPSILON && on_segment(p3, p4, p2))
        || (d3.abs() <= COLLINEAR_EPSILON && on_segment(p1, p2, p3))
        || (d4.abs() <= COLLINEAR_EPSILON && on_segment(p1, p2, p4))
}

/// Result of projecting a point onto a polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosestPoint {
    pub point: Coord<f64>,
    /// Planar distance from the query point to `point`.
    pub distance: f64,
    /// Index of the polyline vertex before the winning segment.
    pub before_index: usize,
    /// Index of the polyline vertex after the winning segment.
    pub after_index: usize,
}

/// Projects `p` onto every segment of `line` (clamped to the segment) and
/// returns the nearest projection. `None` for an empty polyline.
pub fn closest_point_on_line_string(p: Coord<f64>, line: &[Coord<f64>]) -> Option<ClosestPoint> {
    if line.is_empty() {
        return None;
    }
    if line.len() == 1 {
        let d2 = squared_distance(p, line[0]);
        return Some(ClosestPoint {
            point: line[0],
            distance: d2.sqrt(),
            before_index: 0,
            after_index: 0,
        });
    }

    let mut best: Option<ClosestPoint> = None;
    let mut best_d2 = f64::INFINITY;
    for (i, window) in line.windows(2).enumerate() {
        let (a, b) = (window[0], window[1]);
        let candidate = project_onto_segment(p, a, b);
        let d2 = squared_distance(p, candidate);
        if d2 < best_d2 {
            best_d2 = d2;
            best = Some(ClosestPoint {
                point: candidate,
                distance: d2.sqrt(),
                before_index: i,
                after_index: i + 1,
            });
        }
    }
    best
}

fn project_onto_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    Coord {
        x: a.x + t * dx,
        y: a.y + t * dy,
    }
}

fn squared_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dx * dx + dy * dy
}
