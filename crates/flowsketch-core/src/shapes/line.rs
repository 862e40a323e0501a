//! Line (polyline) shape.

use super::{
    NodeTransform, ShapeId, ShapeStyle, ShapeTrait, flat_points, number, point_to_polyline_dist,
    points_to_value,
};
use crate::scene::SceneError;
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A polyline through local points, optionally smoothed by `tension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub(crate) id: ShapeId,
    /// Points relative to the node position.
    pub points: Vec<Point>,
    /// Curve smoothing (0 = straight segments).
    #[serde(default)]
    pub tension: f64,
    /// Whether the last point joins back to the first.
    #[serde(default)]
    pub closed: bool,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl Line {
    /// Create a straight line between two world points.
    pub fn new(start: Point, end: Point) -> Self {
        Self::from_points(vec![start, end])
    }

    /// Create a polyline from world points. The node is positioned at the origin.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            tension: 0.0,
            closed: false,
            transform: NodeTransform::default(),
            style: ShapeStyle {
                fill: None,
                ..ShapeStyle::default()
            },
        }
    }

    /// Get the length of the polyline.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).hypot()).sum()
    }
}

/// Build a path through `points`; with `tension > 0` segments become
/// cardinal-spline cubics that pass through every point.
pub(crate) fn polyline_path(points: &[Point], tension: f64, closed: bool) -> BezPath {
    let mut path = BezPath::new();
    let Some(first) = points.first() else {
        return path;
    };
    path.move_to(*first);
    if tension <= 0.0 || points.len() < 3 {
        for p in &points[1..] {
            path.line_to(*p);
        }
    } else {
        let k = tension / 3.0;
        let last = points.len() - 1;
        for i in 0..last {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = points[(i + 2).min(last)];
            let c1 = p1 + (p2 - p0) * k;
            let c2 = p2 - (p3 - p1) * k;
            path.curve_to(c1, c2, p2);
        }
    }
    if closed {
        path.close_path();
    }
    path
}

/// Unit direction of the final segment, defaulting to +x.
pub(crate) fn end_direction(points: &[Point]) -> Vec2 {
    match points {
        [.., a, b] => {
            let d = *b - *a;
            let len = d.hypot();
            if len < f64::EPSILON {
                Vec2::new(1.0, 0.0)
            } else {
                d / len
            }
        }
        _ => Vec2::new(1.0, 0.0),
    }
}

impl ShapeTrait for Line {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        polyline_path(&self.points, self.tension, self.closed)
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
            "closed" => self.closed = value.as_bool().ok_or_else(|| SceneError::invalid(key, value))?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "points" => Some(points_to_value(&self.points)),
            "tension" => Some(self.tension.into()),
            "closed" => Some(self.closed.into()),
            _ => None,
        }
    }

    fn hit_test_local(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= tolerance + self.style.stroke_width / 2.0
    }
}
