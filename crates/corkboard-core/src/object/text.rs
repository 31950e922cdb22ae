//! Free-standing text.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_extent, default_opacity};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A text block without background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
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
    /// Font size in board units.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: String,
}

fn default_font_size() -> f64 {
    TextBox::DEFAULT_FONT_SIZE
}

fn default_text_color() -> String {
    "#1A1A1A".to_string()
}

impl TextBox {
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;

    pub fn new(position: Point, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            x: position.x,
            y: position.y,
            width: default_extent(),
            height: default_extent(),
            rotation: 0.0,
            opacity: 1.0,
            text: text.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            color: default_text_color(),
        }
    }
}

impl ObjectTrait for TextBox {
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
