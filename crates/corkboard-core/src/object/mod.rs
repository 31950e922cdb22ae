//! Board object definitions.
//!
//! Every entity on a board is a [`BoardObject`], a tagged union keyed by the
//! `type` field on the wire. Objects are replaced wholesale on any change and
//! shared between collection revisions behind `Arc`, so identity comparison is
//! enough to tell whether an object changed.

mod comment;
mod connector;
mod emoji;
mod frame;
mod line;
mod note;
mod path;
mod shape;
mod text;

pub use comment::Comment;
pub use connector::Connector;
pub use emoji::Emoji;
pub use frame::Frame;
pub use line::LineSegment;
pub use note::StickyNote;
pub use path::FreehandPath;
pub use shape::{ShapeKind, ShapeObject};
pub use text::TextBox;

use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Unique identifier for board objects. `0` means "not yet assigned".
pub type ObjectId = u64;

/// Width and height used when a boxed object carries no usable extent.
pub const DEFAULT_EXTENT: f64 = 100.0;

/// Minimum thickness of a line or arrow bounding box.
///
/// A perfectly horizontal or vertical segment would otherwise have a
/// zero-area box and could never be hit or marquee-selected.
pub const LINE_MIN_THICKNESS: f64 = 10.0;

pub(crate) fn default_extent() -> f64 {
    DEFAULT_EXTENT
}

pub(crate) fn default_opacity() -> f64 {
    1.0
}

fn usable_extent(extent: f64) -> f64 {
    if extent == 0.0 || !extent.is_finite() {
        DEFAULT_EXTENT
    } else {
        extent
    }
}

/// Bounds of an object positioned by an anchor corner and extent.
///
/// Only a zero or non-finite extent falls back to the default; a negative
/// one extends left or up from the anchor.
pub(crate) fn boxed_bounds(x: f64, y: f64, width: f64, height: f64) -> Rect {
    let w = usable_extent(width);
    let h = usable_extent(height);
    Rect::new(x, y, x + w, y + h).abs()
}

/// Common behaviour of every object variant.
pub trait ObjectTrait {
    /// Get the identifier.
    fn id(&self) -> ObjectId;

    /// Overwrite the identifier (used when the session assigns one).
    fn set_id(&mut self, id: ObjectId);

    /// Axis-aligned bounds in board coordinates, ignoring rotation.
    fn bounds(&self) -> Rect;

    /// Rotation in degrees around the bounds center.
    fn rotation(&self) -> f64;

    /// Opacity in `0.0..=1.0`.
    fn opacity(&self) -> f64;

    /// Move the object by a delta.
    fn translate(&mut self, delta: Vec2);
}

/// Enum wrapper for all object variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoardObject {
    StickyNote(StickyNote),
    Shape(ShapeObject),
    Text(TextBox),
    Frame(Frame),
    Comment(Comment),
    Emoji(Emoji),
    Path(FreehandPath),
    Line(LineSegment),
    Arrow(LineSegment),
    Connector(Connector),
}

impl BoardObject {
    fn as_trait(&self) -> &dyn ObjectTrait {
        match self {
            BoardObject::StickyNote(o) => o,
            BoardObject::Shape(o) => o,
            BoardObject::Text(o) => o,
            BoardObject::Frame(o) => o,
            BoardObject::Comment(o) => o,
            BoardObject::Emoji(o) => o,
            BoardObject::Path(o) => o,
            BoardObject::Line(o) | BoardObject::Arrow(o) => o,
            BoardObject::Connector(o) => o,
        }
    }

    fn as_trait_mut(&mut self) -> &mut dyn ObjectTrait {
        match self {
            BoardObject::StickyNote(o) => o,
            BoardObject::Shape(o) => o,
            BoardObject::Text(o) => o,
            BoardObject::Frame(o) => o,
            BoardObject::Comment(o) => o,
            BoardObject::Emoji(o) => o,
            BoardObject::Path(o) => o,
            BoardObject::Line(o) | BoardObject::Arrow(o) => o,
            BoardObject::Connector(o) => o,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.as_trait().id()
    }

    pub fn set_id(&mut self, id: ObjectId) {
        self.as_trait_mut().set_id(id);
    }

    /// Bounds of the object on its own.
    ///
    /// Connectors have no position of their own and report an empty rect
    /// here; use [`crate::ObjectCollection::resolved_bounds`] to get bounds
    /// derived from the objects they join.
    pub fn bounds(&self) -> Rect {
        self.as_trait().bounds()
    }

    pub fn rotation(&self) -> f64 {
        self.as_trait().rotation()
    }

    pub fn opacity(&self) -> f64 {
        self.as_trait().opacity()
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.as_trait_mut().translate(delta);
    }

    /// Wire name of the variant, as carried in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            BoardObject::StickyNote(_) => "stickyNote",
            BoardObject::Shape(_) => "shape",
            BoardObject::Text(_) => "text",
            BoardObject::Frame(_) => "frame",
            BoardObject::Comment(_) => "comment",
            BoardObject::Emoji(_) => "emoji",
            BoardObject::Path(_) => "path",
            BoardObject::Line(_) => "line",
            BoardObject::Arrow(_) => "arrow",
            BoardObject::Connector(_) => "connector",
        }
    }

    /// Shape class of a `shape` object, `None` for every other variant.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            BoardObject::Shape(s) => Some(s.shape_type),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match self {
            BoardObject::Connector(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&FreehandPath> {
        match self {
            BoardObject::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineSegment> {
        match self {
            BoardObject::Line(l) | BoardObject::Arrow(l) => Some(l),
            _ => None,
        }
    }

    /// Check if this object is a connector referencing `id` at either end.
    pub fn references(&self, id: ObjectId) -> bool {
        self.as_connector()
            .is_some_and(|c| c.from_id == id || c.to_id == id)
    }
}

/// Hands out object ids for one session.
///
/// Ids are positive, strictly increasing and never reused within a session,
/// even after the object they named is deleted.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: ObjectId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// Seed from a persisted counter and the ids already on the board.
    pub fn seeded(next_id: ObjectId, max_existing: Option<ObjectId>) -> Self {
        let floor = max_existing.map_or(1, |max| max + 1);
        Self {
            next: next_id.max(floor).max(1),
        }
    }

    /// Allocate a fresh id.
    pub fn allocate(&mut self) -> ObjectId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Make sure ids seen elsewhere (remote peers, snapshots) are never handed out.
    pub fn observe(&mut self, id: ObjectId) {
        if id >= self.next {
            self.next = id + 1;
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> ObjectId {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn note(id: ObjectId) -> BoardObject {
        let mut n = StickyNote::new(Point::new(10.0, 20.0), "Hello");
        n.id = id;
        BoardObject::StickyNote(n)
    }

    #[test]
    fn test_sticky_note_wire_format() {
        let json = serde_json::to_value(note(1)).unwrap();
        assert_eq!(json["type"], "stickyNote");
        assert_eq!(json["id"], 1);
        assert_eq!(json["text"], "Hello");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"type":"shape","id":4,"x":5,"y":6,"shapeType":"star"}"#;
        let obj: BoardObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.id(), 4);
        assert_eq!(obj.shape_kind(), Some(ShapeKind::Star));
        assert!((obj.rotation() - 0.0).abs() < f64::EPSILON);
        assert!((obj.opacity() - 1.0).abs() < f64::EPSILON);
        let b = obj.bounds();
        assert!((b.width() - DEFAULT_EXTENT).abs() < f64::EPSILON);
        assert!((b.height() - DEFAULT_EXTENT).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_extent_falls_back_to_default() {
        let json = r#"{"type":"frame","id":2,"x":0,"y":0,"width":0,"height":40}"#;
        let obj: BoardObject = serde_json::from_str(json).unwrap();
        let b = obj.bounds();
        assert!((b.width() - 100.0).abs() < f64::EPSILON);
        assert!((b.height() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_extent_is_normalized() {
        let json = r#"{"type":"stickyNote","id":3,"x":50,"y":50,"width":-20,"height":-30}"#;
        let obj: BoardObject = serde_json::from_str(json).unwrap();
        let b = obj.bounds();
        assert!((b.x0 - 30.0).abs() < f64::EPSILON);
        assert!((b.y0 - 20.0).abs() < f64::EPSILON);
        assert!((b.width() - 20.0).abs() < f64::EPSILON);
        assert!((b.height() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_bounds_envelope() {
        let path = FreehandPath::from_points(vec![
            Point::new(10.0, 50.0),
            Point::new(-5.0, 20.0),
            Point::new(30.0, 70.0),
        ]);
        let b = BoardObject::Path(path).bounds();
        assert!((b.x0 + 5.0).abs() < f64::EPSILON);
        assert!((b.y0 - 20.0).abs() < f64::EPSILON);
        assert!((b.x1 - 30.0).abs() < f64::EPSILON);
        assert!((b.y1 - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_horizontal_line_has_thickness() {
        let line = LineSegment::new(Point::new(0.0, 10.0), Point::new(100.0, 10.0));
        let b = BoardObject::Line(line).bounds();
        assert!(b.area() > 0.0);
        assert!((b.height() - LINE_MIN_THICKNESS).abs() < 1e-9);
        assert!((b.center().y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_connector_references() {
        let c = BoardObject::Connector(Connector::new(1, 2));
        assert!(c.references(1));
        assert!(c.references(2));
        assert!(!c.references(3));
        assert!(!note(1).references(1));
    }

    #[test]
    fn test_translate() {
        let mut obj = note(1);
        obj.translate(Vec2::new(5.0, -5.0));
        let b = obj.bounds();
        assert!((b.x0 - 15.0).abs() < f64::EPSILON);
        assert!((b.y0 - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_id_allocator_monotonic() {
        let mut ids = IdAllocator::seeded(0, Some(7));
        assert_eq!(ids.allocate(), 8);
        assert_eq!(ids.allocate(), 9);
        ids.observe(20);
        assert_eq!(ids.allocate(), 21);
        ids.observe(3);
        assert_eq!(ids.allocate(), 22);
    }

    #[test]
    fn test_id_allocator_empty_board() {
        let mut ids = IdAllocator::seeded(0, None);
        assert_eq!(ids.allocate(), 1);
        let mut ids = IdAllocator::seeded(12, Some(4));
        assert_eq!(ids.allocate(), 12);
    }
}
