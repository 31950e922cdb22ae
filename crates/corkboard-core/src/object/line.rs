//! Straight or bent lines and arrows.
//!
//! Both `line` and `arrow` objects use [`LineSegment`]; the variant of
//! [`super::BoardObject`] decides whether an arrowhead is drawn. A segment may
//! carry a control point that bends it into a quadratic curve.

use super::{LINE_MIN_THICKNESS, ObjectId, ObjectTrait, default_opacity};
use crate::geometry::curve_midpoint;
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSegment {
    #[serde(default)]
    pub id: ObjectId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// Bend control point, x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    /// Bend control point, y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_line_color")]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub stroke_width: f64,
}

fn default_line_color() -> String {
    "#1A1A1A".to_string()
}

fn default_line_width() -> f64 {
    2.0
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: 0,
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            cx: None,
            cy: None,
            rotation: 0.0,
            opacity: 1.0,
            color: default_line_color(),
            stroke_width: default_line_width(),
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Bend control point, if both coordinates are present.
    pub fn control(&self) -> Option<Point> {
        Some(Point::new(self.cx?, self.cy?))
    }

    pub fn set_control(&mut self, control: Option<Point>) {
        self.cx = control.map(|p| p.x);
        self.cy = control.map(|p| p.y);
    }

    /// Point on the rendered line halfway between the endpoints.
    ///
    /// This is where the bend handle is drawn.
    pub fn midpoint(&self) -> Point {
        match self.control() {
            Some(ctrl) => curve_midpoint(self.start(), ctrl, self.end()),
            None => self.start().midpoint(self.end()),
        }
    }

    /// Points along the rendered line. A bent line is sampled with
    /// `segments` straight pieces; a straight one is just its endpoints.
    pub fn polyline(&self, segments: usize) -> Vec<Point> {
        let (start, end) = (self.start(), self.end());
        let Some(ctrl) = self.control() else {
            return vec![start, end];
        };
        let n = segments.max(1);
        (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                start.lerp(ctrl, t).lerp(ctrl.lerp(end, t), t)
            })
            .collect()
    }

    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start());
        match self.control() {
            Some(ctrl) => path.quad_to(ctrl, self.end()),
            None => path.line_to(self.end()),
        }
        path
    }
}

impl ObjectTrait for LineSegment {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    /// Envelope of the two endpoints, padded so each side is at least
    /// [`LINE_MIN_THICKNESS`] wide.
    fn bounds(&self) -> Rect {
        let r = Rect::from_points(self.start(), self.end());
        let pad_x = ((LINE_MIN_THICKNESS - r.width()) / 2.0).max(0.0);
        let pad_y = ((LINE_MIN_THICKNESS - r.height()) / 2.0).max(0.0);
        r.inflate(pad_x, pad_y)
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn translate(&mut self, delta: Vec2) {
        self.x1 += delta.x;
        self.y1 += delta.y;
        self.x2 += delta.x;
        self.y2 += delta.y;
        if let Some(ctrl) = self.control() {
            self.set_control(Some(ctrl + delta));
        }
    }
}
