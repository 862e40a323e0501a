//! Ellipse shape.

use super::{NodeTransform, ShapeId, ShapeStyle, ShapeTrait, number};
use crate::scene::SceneError;
use kurbo::{BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An ellipse positioned by its center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ellipse {
    pub(crate) id: ShapeId,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl Ellipse {
    /// Create a new ellipse centered at `center`.
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            radius_x,
            radius_y,
            transform: NodeTransform::at(center),
            style: ShapeStyle::default(),
        }
    }

    /// Create a circle.
    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(center, radius, radius)
    }

    /// Create an ellipse from a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }
}

impl ShapeTrait for Ellipse {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        KurboEllipse::new(Point::ZERO, (self.radius_x, self.radius_y), 0.0).to_path(0.1)
    }

    fn local_bounds(&self) -> Rect {
        Rect::new(-self.radius_x, -self.radius_y, self.radius_x, self.radius_y)
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
            "radiusX" => self.radius_x = number(key, value)?.max(0.0),
            "radiusY" => self.radius_y = number(key, value)?.max(0.0),
            "radius" => {
                let radius = number(key, value)?.max(0.0);
                self.radius_x = radius;
                self.radius_y = radius;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "radiusX" => Some(self.radius_x.into()),
            "radiusY" => Some(self.radius_y.into()),
            "radius" => Some(self.radius_x.max(self.radius_y).into()),
            _ => None,
        }
    }

    fn hit_test_local(&self, point: Point, tolerance: f64) -> bool {
        let rx = self.radius_x + tolerance;
        let ry = self.radius_y + tolerance;
        if rx <= 0.0 || ry <= 0.0 {
            return false;
        }
        (point.x / rx).powi(2) + (point.y / ry).powi(2) <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_bounds_are_centered() {
        let circle = Ellipse::circle(Point::new(50.0, 50.0), 10.0);
        let bounds = circle.local_bounds();
        assert_eq!(bounds, Rect::new(-10.0, -10.0, 10.0, 10.0));
    }

    #[test]
    fn test_hit_test_excludes_corners() {
        let ellipse = Ellipse::new(Point::ZERO, 20.0, 10.0);
        assert!(ellipse.hit_test_local(Point::new(19.0, 0.0), 0.0));
        assert!(!ellipse.hit_test_local(Point::new(19.0, 9.0), 0.0));
    }

    #[test]
    fn test_radius_sets_both_axes() {
        let mut ellipse = Ellipse::new(Point::ZERO, 20.0, 10.0);
        ellipse.set_geometry_attr("radius", &Value::from(5.0)).unwrap();
        assert_eq!((ellipse.radius_x, ellipse.radius_y), (5.0, 5.0));
    }
}
