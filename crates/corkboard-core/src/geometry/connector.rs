//! Connector endpoint resolution and curve construction.

use super::anchors::{anchor_names, anchor_point, nearest_anchor};
use crate::object::{BoardObject, ShapeKind};
use kurbo::{CubicBez, Point, Rect, Vec2};

/// Fraction of the endpoint distance used as control-point offset.
pub const CURVE_FACTOR: f64 = 0.4;

/// Upper bound on the control-point offset, in board units.
pub const MAX_CURVE_OFFSET: f64 = 200.0;

/// Resolved geometry of a connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorEndpoints {
    pub start: Point,
    pub end: Point,
    /// Anchor the start point was taken from.
    pub from_anchor: String,
    /// Anchor the end point was taken from.
    pub to_anchor: String,
}

/// Pick an anchor on `object` facing an object centered at `toward`.
///
/// `side` is the edge chosen from the dominant displacement axis. Stars, and
/// shapes that do not expose that edge, use the anchor nearest `toward`.
fn auto_anchor(object: &BoardObject, side: &'static str, toward: Point) -> String {
    let is_star = object.shape_kind() == Some(ShapeKind::Star);
    if !is_star && anchor_names(object).contains(&side) {
        return side.to_string();
    }
    nearest_anchor(object, toward).unwrap_or(side).to_string()
}

/// Endpoints of a connector from `from` to `to`.
///
/// Explicit anchors are used as given. Missing anchors are picked from the
/// displacement between the two centers: a mostly horizontal displacement
/// pairs `right`/`left`, a mostly vertical one `bottom`/`top`.
pub fn connector_endpoints(
    from: &BoardObject,
    to: &BoardObject,
    from_anchor: Option<&str>,
    to_anchor: Option<&str>,
) -> ConnectorEndpoints {
    let from_center = from.bounds().center();
    let to_center = to.bounds().center();
    let d = to_center - from_center;

    let (from_side, to_side) = if d.x.abs() >= d.y.abs() {
        if d.x >= 0.0 { ("right", "left") } else { ("left", "right") }
    } else if d.y >= 0.0 {
        ("bottom", "top")
    } else {
        ("top", "bottom")
    };

    let from_anchor = from_anchor
        .map(str::to_string)
        .unwrap_or_else(|| auto_anchor(from, from_side, to_center));
    let to_anchor = to_anchor
        .map(str::to_string)
        .unwrap_or_else(|| auto_anchor(to, to_side, from_center));

    ConnectorEndpoints {
        start: anchor_point(from, &from_anchor),
        end: anchor_point(to, &to_anchor),
        from_anchor,
        to_anchor,
    }
}

/// Direction a curve should leave an anchor in.
///
/// With the owning object's bounds this is the direction from its center to
/// the anchor point, which follows rotation. Without bounds, the four side
/// names map to their fixed normals.
fn outward(anchor: &str, point: Point, bounds: Option<Rect>) -> Option<Vec2> {
    if let Some(bounds) = bounds {
        let v = point - bounds.center();
        if v.hypot2() > f64::EPSILON {
            return Some(v.normalize());
        }
    }
    match anchor {
        "top" => Some(Vec2::new(0.0, -1.0)),
        "right" => Some(Vec2::new(1.0, 0.0)),
        "bottom" => Some(Vec2::new(0.0, 1.0)),
        "left" => Some(Vec2::new(-1.0, 0.0)),
        _ => None,
    }
}

/// Cubic curve from `start` to `end` that leaves and enters along the
/// anchors' outward normals.
///
/// The control points sit `distance * CURVE_FACTOR` (capped) away from each
/// endpoint, so longer connectors bow more. Identical endpoints collapse to
/// a zero-length curve.
pub fn connector_curve(
    start: Point,
    end: Point,
    from_anchor: &str,
    to_anchor: &str,
    from_bounds: Option<Rect>,
    to_bounds: Option<Rect>,
) -> CubicBez {
    let chord = end - start;
    let distance = chord.hypot();
    let offset = (distance * CURVE_FACTOR).min(MAX_CURVE_OFFSET);
    if offset <= f64::EPSILON {
        return CubicBez::new(start, start, end, end);
    }

    let toward_end = chord / distance;
    let out_from = outward(from_anchor, start, from_bounds).unwrap_or(toward_end);
    let out_to = outward(to_anchor, end, to_bounds).unwrap_or(-toward_end);

    CubicBez::new(start, start + out_from * offset, end + out_to * offset, end)
}

/// SVG path data for a connector curve: `M x1 y1 C c1x c1y, c2x c2y, x2 y2`.
pub fn curved_connector_path(
    start: Point,
    end: Point,
    from_anchor: &str,
    to_anchor: &str,
    from_bounds: Option<Rect>,
    to_bounds: Option<Rect>,
) -> String {
    let c = connector_curve(start, end, from_anchor, to_anchor, from_bounds, to_bounds);
    format!(
        "M {} {} C {} {}, {} {}, {} {}",
        c.p0.x, c.p0.y, c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ShapeObject, StickyNote};

    fn note_at(x: f64, y: f64) -> BoardObject {
        BoardObject::StickyNote(StickyNote::new(Point::new(x, y), ""))
    }

    fn shape_at(kind: ShapeKind, x: f64, y: f64) -> BoardObject {
        BoardObject::Shape(ShapeObject::new(kind, Point::new(x, y), 100.0, 100.0))
    }

    #[test]
    fn test_path_starts_and_ends_at_endpoints() {
        let d = curved_connector_path(
            Point::new(0.0, 0.0),
            Point::new(100.0, 100.0),
            "right",
            "left",
            None,
            None,
        );
        assert!(d.starts_with("M 0 0 C "), "{d}");
        assert!(d.ends_with(", 100 100"), "{d}");
    }

    #[test]
    fn test_control_points_follow_anchor_normals() {
        let c = connector_curve(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            "right",
            "left",
            None,
            None,
        );
        assert!(c.p1.x > 0.0 && c.p1.y.abs() < 1e-9);
        assert!(c.p2.x < 100.0 && c.p2.y.abs() < 1e-9);
        // "bottom" bows downward
        let c = connector_curve(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            "bottom",
            "bottom",
            None,
            None,
        );
        assert!(c.p1.y > 0.0 && c.p2.y > 0.0);
    }

    #[test]
    fn test_longer_connectors_bow_more() {
        let short = connector_curve(Point::ZERO, Point::new(50.0, 0.0), "top", "top", None, None);
        let long = connector_curve(Point::ZERO, Point::new(300.0, 0.0), "top", "top", None, None);
        assert!(long.p1.y.abs() > short.p1.y.abs());
    }

    #[test]
    fn test_degenerate_curve() {
        let p = Point::new(7.0, 7.0);
        let c = connector_curve(p, p, "right", "left", None, None);
        assert_eq!(c.p0, p);
        assert_eq!(c.p1, p);
        assert_eq!(c.p2, p);
        assert_eq!(c.p3, p);
        let d = curved_connector_path(p, p, "right", "left", None, None);
        assert_eq!(d, "M 7 7 C 7 7, 7 7, 7 7");
    }

    #[test]
    fn test_outward_uses_bounds_when_given() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        // Anchor point at the bottom-right vertex: normal is diagonal.
        let c = connector_curve(
            Point::new(100.0, 100.0),
            Point::new(400.0, 100.0),
            "bottomRight",
            "left",
            Some(bounds),
            None,
        );
        assert!(c.p1.x > 100.0 && c.p1.y > 100.0);
    }

    #[test]
    fn test_auto_anchors_horizontal() {
        let a = note_at(0.0, 0.0);
        let b = note_at(300.0, 20.0);
        let ends = connector_endpoints(&a, &b, None, None);
        assert_eq!(ends.from_anchor, "right");
        assert_eq!(ends.to_anchor, "left");
        assert_eq!(ends.start, Point::new(100.0, 50.0));
        assert_eq!(ends.end, Point::new(300.0, 70.0));

        let back = connector_endpoints(&b, &a, None, None);
        assert_eq!(back.from_anchor, "left");
        assert_eq!(back.to_anchor, "right");
    }

    #[test]
    fn test_auto_anchors_vertical() {
        let a = note_at(0.0, 0.0);
        let b = note_at(10.0, 400.0);
        let ends = connector_endpoints(&a, &b, None, None);
        assert_eq!(ends.from_anchor, "bottom");
        assert_eq!(ends.to_anchor, "top");
        let up = connector_endpoints(&b, &a, None, None);
        assert_eq!(up.from_anchor, "top");
        assert_eq!(up.to_anchor, "bottom");
    }

    #[test]
    fn test_explicit_anchors_win() {
        let a = note_at(0.0, 0.0);
        let b = note_at(300.0, 0.0);
        let ends = connector_endpoints(&a, &b, Some("top"), Some("bottom"));
        assert_eq!(ends.from_anchor, "top");
        assert_eq!(ends.to_anchor, "bottom");
        assert_eq!(ends.start, Point::new(50.0, 0.0));
        assert_eq!(ends.end, Point::new(350.0, 100.0));
    }

    #[test]
    fn test_star_uses_nearest_tip() {
        let star = shape_at(ShapeKind::Star, 0.0, 0.0);
        let above = note_at(0.0, -400.0);
        let ends = connector_endpoints(&star, &above, None, None);
        assert_eq!(ends.from_anchor, "star0");
        assert_eq!(ends.to_anchor, "bottom");
    }

    #[test]
    fn test_triangle_without_side_uses_nearest_vertex() {
        let tri = shape_at(ShapeKind::Triangle, 0.0, 0.0);
        let right = note_at(400.0, 60.0);
        let ends = connector_endpoints(&tri, &right, None, None);
        assert_eq!(ends.from_anchor, "bottomRight");
        assert_eq!(ends.to_anchor, "left");
    }
}
