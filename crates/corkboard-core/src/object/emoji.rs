//! Emoji stamps.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_opacity};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    #[serde(default)]
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_emoji_extent")]
    pub width: f64,
    #[serde(default = "default_emoji_extent")]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    pub emoji: String,
}

fn default_emoji_extent() -> f64 {
    Emoji::DEFAULT_SIZE
}

impl Emoji {
    pub const DEFAULT_SIZE: f64 = 48.0;

    pub fn new(position: Point, emoji: impl Into<String>) -> Self {
        Self {
            id: 0,
            x: position.x,
            y: position.y,
            width: Self::DEFAULT_SIZE,
            height: Self::DEFAULT_SIZE,
            rotation: 0.0,
            opacity: 1.0,
            emoji: emoji.into(),
        }
    }
}

impl ObjectTrait for Emoji {
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
