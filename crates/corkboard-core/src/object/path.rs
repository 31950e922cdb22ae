//! Freehand drawing path.

use super::{ObjectId, ObjectTrait, default_opacity};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A freehand stroke (series of points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreehandPath {
    #[serde(default)]
    pub id: ObjectId,
    /// Points in drawing order. A committed path has at least two.
    pub points: Vec<Point>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_path_color")]
    pub color: String,
    #[serde(default = "default_path_width")]
    pub stroke_width: f64,
}

fn default_path_color() -> String {
    "#1A1A1A".to_string()
}

fn default_path_width() -> f64 {
    3.0
}

impl FreehandPath {
    /// Create from existing points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: 0,
            points,
            rotation: 0.0,
            opacity: 1.0,
            color: default_path_color(),
            stroke_width: default_path_width(),
        }
    }

    /// Copy the styling of this path onto a new set of points.
    ///
    /// Used when erasing splits one stroke into several.
    pub fn with_points(&self, points: Vec<Point>) -> Self {
        Self {
            id: 0,
            points,
            ..self.clone()
        }
    }

    /// Add a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline through the points, for rendering.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
        }
        path
    }
}

impl ObjectTrait for FreehandPath {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |r, p| {
                r.union_pt(*p)
            })
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_bounds() {
        let path = FreehandPath::from_points(Vec::new());
        assert!(path.is_empty());
        assert_eq!(path.bounds(), Rect::ZERO);
    }

    #[test]
    fn test_with_points_keeps_style() {
        let mut path = FreehandPath::from_points(vec![Point::ZERO, Point::new(1.0, 1.0)]);
        path.id = 9;
        path.color = "#FF0000".to_string();
        let piece = path.with_points(vec![Point::new(2.0, 2.0), Point::new(3.0, 3.0)]);
        assert_eq!(piece.id, 0);
        assert_eq!(piece.color, "#FF0000");
        assert_eq!(piece.len(), 2);
    }
}
