//! Pure geometry over board objects.
//!
//! Nothing here owns state: anchors, connector endpoints and curves are
//! recomputed from live object positions every time they are asked for.

mod anchors;
mod connector;

pub use anchors::{
    DIAMOND_ANCHORS, HEXAGON_ANCHORS, RECT_ANCHORS, STAR_ANCHORS, TRIANGLE_ANCHORS, anchor_names,
    anchor_point, nearest_anchor,
};
pub use connector::{
    ConnectorEndpoints, CURVE_FACTOR, MAX_CURVE_OFFSET, connector_curve, connector_endpoints,
    curved_connector_path,
};

use kurbo::{Affine, Point, Rect};

/// Rotate `point` by `degrees` around `center` (clockwise on screen).
pub fn rotate_point(point: Point, center: Point, degrees: f64) -> Point {
    if degrees == 0.0 {
        return point;
    }
    Affine::rotate_about(degrees.to_radians(), center) * point
}

/// Axis-aligned overlap test. Boxes that only share an edge do not intersect.
pub fn boxes_intersect(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Cut every segment within `radius` of `center` out of a polyline.
///
/// Returns `None` when nothing was erased. Otherwise returns the surviving
/// runs; runs shorter than two points are dropped, so the result may be empty.
pub fn erase_path(points: &[Point], center: Point, radius: f64) -> Option<Vec<Vec<Point>>> {
    let first = *points.first()?;
    let mut erased_any = false;
    let mut pieces = Vec::new();
    let mut run = vec![first];

    for w in points.windows(2) {
        if point_to_segment_dist(center, w[0], w[1]) <= radius {
            erased_any = true;
            if run.len() >= 2 {
                pieces.push(std::mem::take(&mut run));
            }
            run = vec![w[1]];
        } else {
            run.push(w[1]);
        }
    }

    if !erased_any {
        return None;
    }
    if run.len() >= 2 {
        pieces.push(run);
    }
    Some(pieces)
}

/// Point at `t = 0.5` on the quadratic curve `start`-`control`-`end`.
pub fn curve_midpoint(start: Point, control: Point, end: Point) -> Point {
    Point::new(
        0.25 * start.x + 0.5 * control.x + 0.25 * end.x,
        0.25 * start.y + 0.5 * control.y + 0.25 * end.y,
    )
}

/// Control point that makes the quadratic curve pass through `midpoint`.
///
/// The user drags the handle drawn on the curve; the stored control point
/// sits twice as far from the chord.
pub fn control_from_midpoint(start: Point, end: Point, midpoint: Point) -> Point {
    Point::new(
        2.0 * midpoint.x - (start.x + end.x) / 2.0,
        2.0 * midpoint.y - (start.y + end.y) / 2.0,
    )
}
