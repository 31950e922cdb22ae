//! Titled frames used to group an area of the board.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_extent, default_opacity};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A titled rectangular region drawn behind other objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
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
    pub title: String,
}

impl Frame {
    pub fn new(bounds: Rect, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            x: bounds.x0,
            y: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            rotation: 0.0,
            opacity: 1.0,
            title: title.into(),
        }
    }
}

impl ObjectTrait for Frame {
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
