//! Geometric shapes.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_extent, default_opacity};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Outline class of a [`ShapeObject`]. Decides which anchors it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Diamond,
    Hexagon,
    Star,
}

/// A filled shape inscribed in its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeObject {
    #[serde(default)]
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub shape_type: ShapeKind,
    /// Fill color (CSS).
    #[serde(default = "default_fill")]
    pub fill: String,
    /// Outline color (CSS), `None` for no outline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_fill() -> String {
    "#4A90D9".to_string()
}

fn default_stroke_width() -> f64 {
    2.0
}

impl ShapeObject {
    /// Create an unassigned shape of the given class.
    pub fn new(shape_type: ShapeKind, position: Point, width: f64, height: f64) -> Self {
        Self {
            id: 0,
            x: position.x,
            y: position.y,
            width,
            height,
            rotation: 0.0,
            opacity: 1.0,
            shape_type,
            fill: default_fill(),
            stroke: None,
            stroke_width: default_stroke_width(),
        }
    }
}

impl ObjectTrait for ShapeObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn bounds(&self) -> Rect {
        boxed_bounds(self.x, self.y, self.width, self.height)
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}
