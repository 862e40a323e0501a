//! Arrow shape.

use super::line::{end_direction, polyline_path};
use super::{
    NodeTransform, ShapeId, ShapeStyle, ShapeTrait, flat_points, number, point_to_polyline_dist,
    points_to_value,
};
use crate::scene::SceneError;
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default arrowhead length.
pub const DEFAULT_POINTER_LENGTH: f64 = 10.0;
/// Default arrowhead width.
pub const DEFAULT_POINTER_WIDTH: f64 = 10.0;

/// A polyline terminated by an arrowhead at its last point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub(crate) id: ShapeId,
    /// Points relative to the node position. The head points at the last one.
    pub points: Vec<Point>,
    #[serde(default)]
    pub tension: f64,
    /// Length of the arrowhead along the shaft.
    #[serde(default = "default_pointer_length")]
    pub pointer_length: f64,
    /// Width of the arrowhead across the shaft.
    #[serde(default = "default_pointer_width")]
    pub pointer_width: f64,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

fn default_pointer_length() -> f64 {
    DEFAULT_POINTER_LENGTH
}

fn default_pointer_width() -> f64 {
    DEFAULT_POINTER_WIDTH
}

impl Arrow {
    /// Create an arrow between two world points.
    pub fn new(start: Point, end: Point) -> Self {
        Self::from_points(vec![start, end])
    }

    /// Create an arrow from world points. The node is positioned at the origin.
    pub fn from_points(points: Vec<Point>) -> Self {
        let style = ShapeStyle {
            fill: Some(ShapeStyle::default().stroke),
            ..ShapeStyle::default()
        };
        Self {
            id: Uuid::new_v4(),
            points,
            tension: 0.0,
            pointer_length: DEFAULT_POINTER_LENGTH,
            pointer_width: DEFAULT_POINTER_WIDTH,
            transform: NodeTransform::default(),
            style,
        }
    }

    /// Tip, left and right corners of the arrowhead in local coordinates.
    pub fn head(&self) -> Option<[Point; 3]> {
        let tip = *self.points.last()?;
        if self.points.len() < 2 {
            return None;
        }
        let dir = end_direction(&self.points);
        let perp = Vec2::new(-dir.y, dir.x);
        let back = tip - dir * self.pointer_length;
        let half = self.pointer_width / 2.0;
        Some([tip, back + perp * half, back - perp * half])
    }
}

impl ShapeTrait for Arrow {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        let mut path = polyline_path(&self.points, self.tension, false);
        if let Some([tip, left, right]) = self.head() {
            path.move_to(left);
            path.line_to(tip);
            path.line_to(right);
            path.close_path();
        }
        path
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
            "points" => self.points = flat_points(key, value)?,
            "tension" => self.tension = number(key, value)?.max(0.0),
            "pointerLength" => self.pointer_length = number(key, value)?.max(0.0),
            "pointerWidth" => self.pointer_width = number(key, value)?.max(0.0),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "points" => Some(points_to_value(&self.points)),
            "tension" => Some(self.tension.into()),
            "pointerLength" => Some(self.pointer_length.into()),
            "pointerWidth" => Some(self.pointer_width.into()),
            _ => None,
        }
    }

    fn hit_test_local(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= tolerance + self.style.stroke_width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as KurboShape;

    #[test]
    fn test_head_points_along_last_segment() {
        let arrow = Arrow::new(Point::ZERO, Point::new(100.0, 0.0));
        let [tip, left, right] = arrow.head().unwrap();
        assert_eq!(tip, Point::new(100.0, 0.0));
        assert!((left.x - 90.0).abs() < 1e-9);
        assert!(((left.y - right.y).abs() - DEFAULT_POINTER_WIDTH).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_include_head() {
        let arrow = Arrow::new(Point::ZERO, Point::new(100.0, 0.0));
        let bounds = arrow.local_path().bounding_box();
        assert!((bounds.height() - DEFAULT_POINTER_WIDTH).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_has_no_head() {
        let arrow = Arrow::from_points(vec![Point::ZERO]);
        assert!(arrow.head().is_none());
    }
}
