//! Comment pins.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_extent, default_opacity};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A comment attached to a spot on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
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
    pub text: String,
    /// Display name of the author.
    #[serde(default)]
    pub author: String,
}

impl Comment {
    pub fn new(position: Point, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            x: position.x,
            y: position.y,
            width: default_extent(),
            height: default_extent(),
            rotation: 0.0,
            opacity: 1.0,
            text: text.into(),
            author: author.into(),
        }
    }
}

impl ObjectTrait for Comment {
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
