//! Connectors between two objects.

use super::{ObjectId, ObjectTrait, default_opacity};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A curved link from one object to another.
///
/// A connector has no position of its own. Its endpoints are derived from
/// the current bounds and rotation of the objects named by `from_id` and
/// `to_id` each time they are needed. A connector whose endpoint object is
/// gone is invalid and is removed together with that object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    #[serde(default)]
    pub id: ObjectId,
    pub from_id: ObjectId,
    pub to_id: ObjectId,
    /// Anchor on the source object; `None` picks one automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_anchor: Option<String>,
    /// Anchor on the target object; `None` picks one automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_anchor: Option<String>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_connector_color")]
    pub color: String,
}

fn default_connector_color() -> String {
    "#5F6B7A".to_string()
}

impl Connector {
    pub fn new(from_id: ObjectId, to_id: ObjectId) -> Self {
        Self {
            id: 0,
            from_id,
            to_id,
            from_anchor: None,
            to_anchor: None,
            rotation: 0.0,
            opacity: 1.0,
            color: default_connector_color(),
        }
    }

    /// Pin both ends to named anchors.
    pub fn with_anchors(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_anchor = Some(from.into());
        self.to_anchor = Some(to.into());
        self
    }
}

impl ObjectTrait for Connector {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn bounds(&self) -> Rect {
        Rect::ZERO
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Connectors follow their endpoints and ignore direct moves.
    fn translate(&mut self, _delta: Vec2) {}
}
