//! Sticky note.

use super::{ObjectId, ObjectTrait, boxed_bounds, default_extent, default_opacity};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A square note with free text on a colored background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyNote {
    #[serde(default)]
    pub id: ObjectId,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
    /// Rotation in degrees around the center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Note body.
    #[serde(default)]
    pub text: String,
    /// Background color as a CSS color string.
    #[serde(default = "default_note_color")]
    pub color: String,
}

fn default_note_color() -> String {
    StickyNote::DEFAULT_COLOR.to_string()
}

impl StickyNote {
    pub const DEFAULT_COLOR: &'static str = "#FFEB3B";

    /// Create an unassigned note at `position`.
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
            color: default_note_color(),
        }
    }
}

impl ObjectTrait for StickyNote {
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
