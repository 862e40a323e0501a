//! Regular polygon shape (triangle, diamond, hexagon, ...).

use super::{NodeTransform, ShapeId, ShapeStyle, ShapeTrait, number};
use crate::scene::SceneError;
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::f64::consts::{FRAC_PI_2, TAU};
use uuid::Uuid;

/// Fewest sides a polygon may have.
pub const MIN_SIDES: u32 = 3;

/// A regular polygon positioned by its center, first vertex pointing up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    pub(crate) id: ShapeId,
    /// Number of sides.
    pub sides: u32,
    /// Distance from center to each vertex.
    pub radius: f64,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl Polygon {
    pub fn new(center: Point, sides: u32, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sides: sides.max(MIN_SIDES),
            radius,
            transform: NodeTransform::at(center),
            style: ShapeStyle::default(),
        }
    }

    /// Vertices in local coordinates.
    pub fn vertices(&self) -> Vec<Point> {
        let sides = self.sides.max(MIN_SIDES);
        (0..sides)
            .map(|i| {
                let angle = TAU * i as f64 / sides as f64 - FRAC_PI_2;
                Point::new(self.radius * angle.cos(), self.radius * angle.sin())
            })
            .collect()
    }
}

impl ShapeTrait for Polygon {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let vertices = self.vertices();
        if let Some((first, rest)) = vertices.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
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
            "sides" => {
                let sides = value
                    .as_u64()
                    .filter(|s| *s >= MIN_SIDES as u64 && *s <= u32::MAX as u64)
                    .ok_or_else(|| SceneError::invalid(key, value))?;
                self.sides = sides as u32;
            }
            "radius" => self.radius = number(key, value)?.max(0.0),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "sides" => Some(self.sides.into()),
            "radius" => Some(self.radius.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_vertex_points_up() {
        let triangle = Polygon::new(Point::ZERO, 3, 10.0);
        let top = triangle.vertices()[0];
        assert!(top.x.abs() < 1e-9);
        assert!((top.y + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sides_are_clamped() {
        assert_eq!(Polygon::new(Point::ZERO, 1, 10.0).sides, MIN_SIDES);
        let mut poly = Polygon::new(Point::ZERO, 4, 10.0);
        assert!(poly.set_geometry_attr("sides", &Value::from(2)).is_err());
        assert!(poly.set_geometry_attr("sides", &Value::from(6)).unwrap());
        assert_eq!(poly.vertices().len(), 6);
    }
}
