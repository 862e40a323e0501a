//! Shape definitions for diagram nodes.
//!
//! Every shape keeps its geometry in local, unscaled units and carries a
//! [`NodeTransform`] (position, scale, rotation) plus a [`ShapeStyle`].
//! World-space bounds are derived from the transformed outline, so a resize
//! is expressed as a scale change rather than a geometry rewrite.

mod arrow;
mod ellipse;
mod line;
mod polygon;
mod rectangle;
mod text;

pub use arrow::{Arrow, DEFAULT_POINTER_LENGTH, DEFAULT_POINTER_WIDTH};
pub use ellipse::Ellipse;
pub use line::Line;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use text::Text;

use crate::scene::SceneError;
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8).
///
/// Persisted as a `#rrggbb` / `#rrggbbaa` hex string so snapshots stay a flat
/// attribute bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Also accepts `transparent`.
    pub fn from_hex(color: &str) -> Option<Self> {
        let color = color.trim();
        if color == "transparent" {
            return Some(Self::transparent());
        }
        let hex = color.strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(hex.get(0..1)?, 16).ok()? * 17;
                let g = u8::from_str_radix(hex.get(1..2)?, 16).ok()? * 17;
                let b = u8::from_str_radix(hex.get(2..3)?, 16).ok()? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?)),
            _ => None,
        }
    }

    /// Format as a hex string, omitting alpha when fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for SerializableColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SerializableColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {raw}")))
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    /// Stroke color.
    pub stroke: SerializableColor,
    /// Stroke width.
    pub stroke_width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Dash pattern (empty = solid).
    #[serde(default)]
    pub dash: Vec<f64>,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeStyle {
    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        let alpha = (self.stroke.a as f64 * self.opacity) as u8;
        Color::from_rgba8(self.stroke.r, self.stroke.g, self.stroke.b, alpha)
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill.map(|c| {
            let alpha = (c.a as f64 * self.opacity) as u8;
            Color::from_rgba8(c.r, c.g, c.b, alpha)
        })
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: Some(SerializableColor::white()),
            stroke: SerializableColor::black(),
            stroke_width: 2.0,
            opacity: 1.0,
            dash: Vec::new(),
        }
    }
}

/// Position, scale and rotation of a node.
///
/// Rotation is in degrees, clockwise, around the node origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTransform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }
}

impl NodeTransform {
    /// Create a transform placed at `position`.
    pub fn at(position: Point) -> Self {
        Self {
            x: position.x,
            y: position.y,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Local-to-world transform.
    pub fn affine(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Read a numeric attribute value.
pub(crate) fn number(key: &str, value: &Value) -> Result<f64, SceneError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SceneError::invalid(key, value))
}

/// Read a flat `[x0, y0, x1, y1, ...]` point list.
pub(crate) fn flat_points(key: &str, value: &Value) -> Result<Vec<Point>, SceneError> {
    let coords = value
        .as_array()
        .ok_or_else(|| SceneError::invalid(key, value))?
        .iter()
        .map(|v| number(key, v))
        .collect::<Result<Vec<_>, _>>()?;
    if coords.len() % 2 != 0 {
        return Err(SceneError::invalid(key, value));
    }
    Ok(coords.chunks(2).map(|c| Point::new(c[0], c[1])).collect())
}

pub(crate) fn points_to_value(points: &[Point]) -> Value {
    Value::from(points.iter().flat_map(|p| [p.x, p.y]).collect::<Vec<_>>())
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Outline in local, unscaled coordinates.
    fn local_path(&self) -> BezPath;

    /// Bounding box in local, unscaled coordinates.
    fn local_bounds(&self) -> Rect {
        self.local_path().bounding_box()
    }

    fn node_transform(&self) -> &NodeTransform;

    fn node_transform_mut(&mut self) -> &mut NodeTransform;

    fn style(&self) -> &ShapeStyle;

    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Set a geometry attribute specific to this shape type.
    /// Returns `Ok(false)` when the key is not one of this shape's attributes.
    fn set_geometry_attr(&mut self, key: &str, value: &Value) -> Result<bool, SceneError>;

    /// Read a geometry attribute specific to this shape type.
    fn geometry_attr(&self, key: &str) -> Option<Value>;

    /// Check if a point given in local coordinates hits this shape.
    fn hit_test_local(&self, point: Point, tolerance: f64) -> bool {
        self.local_bounds().inflate(tolerance, tolerance).contains(point)
    }
}

/// Enum wrapper for all shape types (for serialization).
///
/// Serialized with an internal `type` discriminator and a flat attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Polygon(Polygon),
    Line(Line),
    Arrow(Arrow),
    Text(Text),
}

impl Shape {
    fn as_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Rectangle(s) => s,
            Shape::Ellipse(s) => s,
            Shape::Polygon(s) => s,
            Shape::Line(s) => s,
            Shape::Arrow(s) => s,
            Shape::Text(s) => s,
        }
    }

    fn as_trait_mut(&mut self) -> &mut dyn ShapeTrait {
        match self {
            Shape::Rectangle(s) => s,
            Shape::Ellipse(s) => s,
            Shape::Polygon(s) => s,
            Shape::Line(s) => s,
            Shape::Arrow(s) => s,
            Shape::Text(s) => s,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.as_trait().id()
    }

    /// Type discriminator as written to snapshots.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Shape::Rectangle(_) => "rectangle",
            Shape::Ellipse(_) => "ellipse",
            Shape::Polygon(_) => "polygon",
            Shape::Line(_) => "line",
            Shape::Arrow(_) => "arrow",
            Shape::Text(_) => "text",
        }
    }

    pub fn transform(&self) -> &NodeTransform {
        self.as_trait().node_transform()
    }

    pub fn transform_mut(&mut self) -> &mut NodeTransform {
        self.as_trait_mut().node_transform_mut()
    }

    pub fn style(&self) -> &ShapeStyle {
        self.as_trait().style()
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        self.as_trait_mut().style_mut()
    }

    pub fn position(&self) -> Point {
        self.transform().position()
    }

    pub fn set_position(&mut self, position: Point) {
        self.transform_mut().set_position(position);
    }

    /// Size of the local outline before scaling.
    pub fn unscaled_size(&self) -> kurbo::Size {
        self.as_trait().local_bounds().size()
    }

    /// Outline in world coordinates.
    pub fn to_path(&self) -> BezPath {
        let mut path = self.as_trait().local_path();
        path.apply_affine(self.transform().affine());
        path
    }

    /// Axis-aligned bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        self.to_path().bounding_box()
    }

    /// Check if a world-space point hits this shape.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let transform = self.transform();
        let scale = transform.scale_x.abs().min(transform.scale_y.abs());
        if scale < f64::EPSILON {
            return false;
        }
        let local = transform.affine().inverse() * point;
        self.as_trait().hit_test_local(local, tolerance / scale)
    }

    /// Set an attribute by key (camelCase names).
    pub fn set_attr(&mut self, key: &str, value: &Value) -> Result<(), SceneError> {
        match key {
            "x" => self.transform_mut().x = number(key, value)?,
            "y" => self.transform_mut().y = number(key, value)?,
            "scaleX" => self.transform_mut().scale_x = number(key, value)?,
            "scaleY" => self.transform_mut().scale_y = number(key, value)?,
            "rotation" => self.transform_mut().rotation = number(key, value)?,
            "fill" => {
                self.style_mut().fill = match value {
                    Value::Null => None,
                    Value::String(s) => {
                        Some(SerializableColor::from_hex(s).ok_or_else(|| SceneError::invalid(key, value))?)
                    }
                    _ => return Err(SceneError::invalid(key, value)),
                }
            }
            "stroke" => {
                self.style_mut().stroke = value
                    .as_str()
                    .and_then(SerializableColor::from_hex)
                    .ok_or_else(|| SceneError::invalid(key, value))?
            }
            "strokeWidth" => {
                let width = number(key, value)?;
                if width < 0.0 {
                    return Err(SceneError::invalid(key, value));
                }
                self.style_mut().stroke_width = width;
            }
            "opacity" => self.style_mut().opacity = number(key, value)?.clamp(0.0, 1.0),
            "dash" => {
                self.style_mut().dash = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items
                        .iter()
                        .map(|v| number(key, v))
                        .collect::<Result<_, _>>()?,
                    _ => return Err(SceneError::invalid(key, value)),
                }
            }
            _ => {
                if !self.as_trait_mut().set_geometry_attr(key, value)? {
                    return Err(SceneError::UnknownAttribute(key.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Read an attribute by key.
    pub fn attr(&self, key: &str) -> Option<Value> {
        let transform = self.transform();
        let style = self.style();
        match key {
            "x" => Some(transform.x.into()),
            "y" => Some(transform.y.into()),
            "scaleX" => Some(transform.scale_x.into()),
            "scaleY" => Some(transform.scale_y.into()),
            "rotation" => Some(transform.rotation.into()),
            "fill" => Some(style.fill.map_or(Value::Null, |c| c.to_hex().into())),
            "stroke" => Some(style.stroke.to_hex().into()),
            "strokeWidth" => Some(style.stroke_width.into()),
            "opacity" => Some(style.opacity.into()),
            "dash" => Some(style.dash.clone().into()),
            _ => self.as_trait().geometry_attr(key),
        }
    }

    /// Regenerate the shape's ID with a new unique identifier.
    /// This is used when duplicating or pasting shapes to ensure they have unique IDs.
    pub fn regenerate_id(&mut self) {
        let new_id = Uuid::new_v4();
        match self {
            Shape::Rectangle(s) => s.id = new_id,
            Shape::Ellipse(s) => s.id = new_id,
            Shape::Polygon(s) => s.id = new_id,
            Shape::Line(s) => s.id = new_id,
            Shape::Arrow(s) => s.id = new_id,
            Shape::Text(s) => s.id = new_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_color_hex_parsing() {
        assert_eq!(SerializableColor::from_hex("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            SerializableColor::from_hex("#ff000080"),
            Some(SerializableColor::new(255, 0, 0, 128))
        );
        assert_eq!(SerializableColor::from_hex("red"), None);
        assert_eq!(SerializableColor::new(18, 52, 86, 255).to_hex(), "#123456");
    }

    #[test]
    fn test_color_peniko_conversion() {
        let color: Color = SerializableColor::new(10, 20, 30, 40).into();
        assert_eq!(SerializableColor::from(color), SerializableColor::new(10, 20, 30, 40));
    }

    #[test]
    fn test_shape_serializes_flat_with_type_tag() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        let value = serde_json::to_value(Shape::Rectangle(rect)).unwrap();
        assert_eq!(value["type"], "rectangle");
        assert_eq!(value["x"], 10.0);
        assert_eq!(value["width"], 100.0);
        assert_eq!(value["strokeWidth"], 2.0);
        assert_eq!(value["stroke"], "#000000");
    }

    #[test]
    fn test_bounds_follow_scale_and_position() {
        let mut shape = Shape::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 100.0, 50.0));
        shape.transform_mut().scale_x = 2.0;
        let bounds = shape.bounds();
        assert!((bounds.x0 - 10.0).abs() < 1e-9);
        assert!((bounds.width() - 200.0).abs() < 1e-9);
        assert!((bounds.height() - 50.0).abs() < 1e-9);
        assert!((shape.unscaled_size().width - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut shape = Shape::Rectangle(Rectangle::new(Point::ZERO, 100.0, 100.0));
        shape.transform_mut().rotation = 45.0;
        let bounds = shape.bounds();
        let diagonal = 100.0 * std::f64::consts::SQRT_2;
        assert!((bounds.width() - diagonal).abs() < 1e-6);
    }

    #[test]
    fn test_set_attr_common_and_geometry() {
        let mut shape = Shape::Rectangle(Rectangle::new(Point::ZERO, 100.0, 50.0));
        shape.set_attr("fill", &json!("#ff0000")).unwrap();
        shape.set_attr("width", &json!(80)).unwrap();
        shape.set_attr("dash", &json!([4, 2])).unwrap();
        assert_eq!(shape.attr("fill"), Some(json!("#ff0000")));
        assert_eq!(shape.attr("width"), Some(json!(80.0)));
        assert_eq!(shape.style().dash, vec![4.0, 2.0]);
    }

    #[test]
    fn test_set_attr_rejects_bad_input() {
        let mut shape = Shape::Ellipse(Ellipse::new(Point::ZERO, 10.0, 10.0));
        assert!(matches!(
            shape.set_attr("nope", &json!(1)),
            Err(SceneError::UnknownAttribute(_))
        ));
        assert!(matches!(
            shape.set_attr("stroke", &json!(3)),
            Err(SceneError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_hit_test_in_world_space() {
        let mut shape = Shape::Rectangle(Rectangle::new(Point::new(100.0, 100.0), 50.0, 50.0));
        shape.transform_mut().scale_x = 2.0;
        assert!(shape.hit_test(Point::new(190.0, 120.0), 0.0));
        assert!(!shape.hit_test(Point::new(210.0, 120.0), 0.0));
    }

    #[test]
    fn test_regenerate_id() {
        let mut shape = Shape::Text(Text::new(Point::ZERO, "hi"));
        let before = shape.id();
        shape.regenerate_id();
        assert_ne!(before, shape.id());
    }
}
