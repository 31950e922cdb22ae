//! Named attachment points on object outlines.

use super::rotate_point;
use crate::object::{BoardObject, ShapeKind};
use kurbo::{Point, Rect};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Edge midpoints of rectangle-like objects.
pub const RECT_ANCHORS: &[&str] = &["top", "right", "bottom", "left"];
/// Vertices of an isosceles triangle with its apex at the top.
pub const TRIANGLE_ANCHORS: &[&str] = &["top", "bottomRight", "bottomLeft"];
/// Vertices of a diamond (edge midpoints of its box).
pub const DIAMOND_ANCHORS: &[&str] = &["top", "right", "bottom", "left"];
/// Vertices of a flat-topped hexagon, clockwise from the left point.
pub const HEXAGON_ANCHORS: &[&str] = &[
    "left",
    "topLeft",
    "topRight",
    "right",
    "bottomRight",
    "bottomLeft",
];
/// Outer tips of a five-pointed star, clockwise from the top tip.
pub const STAR_ANCHORS: &[&str] = &["star0", "star1", "star2", "star3", "star4"];

/// Ordered anchor names an object exposes.
pub fn anchor_names(object: &BoardObject) -> &'static [&'static str] {
    match object {
        BoardObject::Connector(_) => &[],
        BoardObject::Shape(shape) => match shape.shape_type {
            ShapeKind::Rectangle | ShapeKind::Circle => RECT_ANCHORS,
            ShapeKind::Triangle => TRIANGLE_ANCHORS,
            ShapeKind::Diamond => DIAMOND_ANCHORS,
            ShapeKind::Hexagon => HEXAGON_ANCHORS,
            ShapeKind::Star => STAR_ANCHORS,
        },
        _ => RECT_ANCHORS,
    }
}

/// Anchor location in unrotated space, or `None` if the name is not one of
/// the anchors the object exposes.
fn local_anchor(object: &BoardObject, bounds: Rect, name: &str) -> Option<Point> {
    if !anchor_names(object).contains(&name) {
        return None;
    }
    let c = bounds.center();
    let (x0, y0, x1, y1) = (bounds.x0, bounds.y0, bounds.x1, bounds.y1);
    let w = bounds.width();

    let point = match (object.shape_kind(), name) {
        (Some(ShapeKind::Star), tip) => {
            let index: f64 = tip.strip_prefix("star")?.parse::<u8>().ok()?.into();
            let angle = -FRAC_PI_2 + index * TAU / 5.0;
            Point::new(
                c.x + bounds.width() / 2.0 * angle.cos(),
                c.y + bounds.height() / 2.0 * angle.sin(),
            )
        }
        (Some(ShapeKind::Hexagon), "topLeft") => Point::new(x0 + w / 4.0, y0),
        (Some(ShapeKind::Hexagon), "topRight") => Point::new(x0 + 3.0 * w / 4.0, y0),
        (Some(ShapeKind::Hexagon), "bottomRight") => Point::new(x0 + 3.0 * w / 4.0, y1),
        (Some(ShapeKind::Hexagon), "bottomLeft") => Point::new(x0 + w / 4.0, y1),
        (Some(ShapeKind::Triangle), "bottomRight") => Point::new(x1, y1),
        (Some(ShapeKind::Triangle), "bottomLeft") => Point::new(x0, y1),
        (_, "top") => Point::new(c.x, y0),
        (_, "right") => Point::new(x1, c.y),
        (_, "bottom") => Point::new(c.x, y1),
        (_, "left") => Point::new(x0, c.y),
        _ => return None,
    };
    Some(point)
}

/// Board position of a named anchor.
///
/// The anchor is located on the unrotated outline, then rotated about the
/// object's center by its rotation. Unknown names resolve to the center.
pub fn anchor_point(object: &BoardObject, name: &str) -> Point {
    let bounds = object.bounds();
    let center = bounds.center();
    match local_anchor(object, bounds, name) {
        Some(p) => rotate_point(p, center, object.rotation()),
        None => center,
    }
}

/// Anchor closest to `point`. Ties go to the anchor declared first.
pub fn nearest_anchor(object: &BoardObject, point: Point) -> Option<&'static str> {
    let mut best: Option<(&'static str, f64)> = None;
    for &name in anchor_names(object) {
        let d = anchor_point(object, name).distance_squared(point);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((name, d));
        }
    }
    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Connector, ShapeObject, StickyNote};

    fn shape(kind: ShapeKind, rotation: f64) -> BoardObject {
        let mut s = ShapeObject::new(kind, Point::new(0.0, 0.0), 100.0, 100.0);
        s.rotation = rotation;
        BoardObject::Shape(s)
    }

    fn assert_near(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_anchor_names_per_shape() {
        assert_eq!(anchor_names(&shape(ShapeKind::Rectangle, 0.0)).len(), 4);
        assert_eq!(anchor_names(&shape(ShapeKind::Triangle, 0.0)).len(), 3);
        assert_eq!(anchor_names(&shape(ShapeKind::Diamond, 0.0)).len(), 4);
        assert_eq!(anchor_names(&shape(ShapeKind::Hexagon, 0.0)).len(), 6);
        assert_eq!(anchor_names(&shape(ShapeKind::Star, 0.0)), STAR_ANCHORS);
        let note = BoardObject::StickyNote(StickyNote::new(Point::ZERO, ""));
        assert_eq!(anchor_names(&note), RECT_ANCHORS);
        assert!(anchor_names(&BoardObject::Connector(Connector::new(1, 2))).is_empty());
    }

    #[test]
    fn test_rect_anchor_points() {
        let obj = shape(ShapeKind::Rectangle, 0.0);
        assert_near(anchor_point(&obj, "top"), Point::new(50.0, 0.0));
        assert_near(anchor_point(&obj, "right"), Point::new(100.0, 50.0));
        assert_near(anchor_point(&obj, "bottom"), Point::new(50.0, 100.0));
        assert_near(anchor_point(&obj, "left"), Point::new(0.0, 50.0));
    }

    #[test]
    fn test_rotation_maps_top_to_right() {
        let unrotated = shape(ShapeKind::Rectangle, 0.0);
        let rotated = shape(ShapeKind::Rectangle, 90.0);
        assert_near(anchor_point(&rotated, "top"), anchor_point(&unrotated, "right"));
    }

    #[test]
    fn test_unknown_anchor_falls_back_to_center() {
        let obj = shape(ShapeKind::Triangle, 0.0);
        assert_near(anchor_point(&obj, "left"), Point::new(50.0, 50.0));
        assert_near(anchor_point(&obj, "nonsense"), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_triangle_vertices() {
        let obj = shape(ShapeKind::Triangle, 0.0);
        assert_near(anchor_point(&obj, "top"), Point::new(50.0, 0.0));
        assert_near(anchor_point(&obj, "bottomRight"), Point::new(100.0, 100.0));
        assert_near(anchor_point(&obj, "bottomLeft"), Point::new(0.0, 100.0));
    }

    #[test]
    fn test_hexagon_vertices() {
        let obj = shape(ShapeKind::Hexagon, 0.0);
        assert_near(anchor_point(&obj, "left"), Point::new(0.0, 50.0));
        assert_near(anchor_point(&obj, "topRight"), Point::new(75.0, 0.0));
        assert_near(anchor_point(&obj, "bottomLeft"), Point::new(25.0, 100.0));
    }

    #[test]
    fn test_star_tips() {
        let obj = shape(ShapeKind::Star, 0.0);
        assert_near(anchor_point(&obj, "star0"), Point::new(50.0, 0.0));
        let tip = anchor_point(&obj, "star1");
        assert!(tip.x > 95.0 && tip.y < 50.0);
        assert_near(anchor_point(&obj, "star5"), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_nearest_anchor() {
        let obj = shape(ShapeKind::Rectangle, 0.0);
        assert_eq!(nearest_anchor(&obj, Point::new(200.0, 40.0)), Some("right"));
        assert_eq!(nearest_anchor(&obj, Point::new(50.0, -30.0)), Some("top"));
        // Equidistant from top and left: declaration order wins.
        assert_eq!(nearest_anchor(&obj, Point::new(0.0, 0.0)), Some("top"));
        assert_eq!(nearest_anchor(&BoardObject::Connector(Connector::new(1, 2)), Point::ZERO), None);
    }
}
