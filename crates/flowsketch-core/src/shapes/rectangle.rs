//! Rectangle shape.

use super::{NodeTransform, ShapeId, ShapeStyle, ShapeTrait, number};
use crate::scene::SceneError;
use kurbo::{BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A rectangle anchored at its top-left corner, with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Unscaled width.
    pub width: f64,
    /// Unscaled height.
    pub height: f64,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl Rectangle {
    /// Create a new rectangle with its top-left corner at `position`.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            corner_radius: 0.0,
            transform: NodeTransform::at(position),
            style: ShapeStyle::default(),
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let min_x = p1.x.min(p2.x);
        let min_y = p1.y.min(p2.y);
        let width = (p2.x - p1.x).abs();
        let height = (p2.y - p1.y).abs();

        Self::new(Point::new(min_x, min_y), width, height)
    }

    fn local_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        if self.corner_radius > 0.0 {
            RoundedRect::from_rect(self.local_rect(), self.corner_radius).to_path(0.1)
        } else {
            self.local_rect().to_path(0.1)
        }
    }

    fn local_bounds(&self) -> Rect {
        self.local_rect()
    }

    fn node_transform(&self) -> &NodeTransform {
        &self.transform
    }

    fn node_transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn set_geometry_attr(&mut self, key: &str, value: &Value) -> Result<bool, SceneError> {
        match key {
            "width" => self.width = number(key, value)?.max(0.0),
            "height" => self.height = number(key, value)?.max(0.0),
            "cornerRadius" => self.corner_radius = number(key, value)?.max(0.0),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "width" => Some(self.width.into()),
            "height" => Some(self.height.into()),
            "cornerRadius" => Some(self.corner_radius.into()),
            _ => None,
        }
    }
}
