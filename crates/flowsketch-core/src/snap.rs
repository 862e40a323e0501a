//! Snap functionality: grid snapping and smart alignment guides.

use crate::scene::{NodeId, NodeRole, SceneGraph};
use crate::shapes::{Line, SerializableColor, Shape, ShapeStyle};
use kurbo::{Point, Rect, Vec2};

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }
}

/// Snap a point to the nearest grid intersection, each axis independently.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if !(grid_size > 0.0) {
        return SnapResult::none(point);
    }
    let snapped_x = (point.x / grid_size).round() * grid_size;
    let snapped_y = (point.y / grid_size).round() * grid_size;

    SnapResult {
        point: Point::new(snapped_x, snapped_y),
        snapped_x: snapped_x != point.x,
        snapped_y: snapped_y != point.y,
    }
}

/// Orientation of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideOrientation {
    /// A line of constant x.
    Vertical,
    /// A line of constant y.
    Horizontal,
}

/// Which part of a box lines up with a guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideStop {
    Center,
    /// Left or top edge.
    Start,
    /// Right or bottom edge.
    End,
}

/// A matched alignment on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub orientation: GuideOrientation,
    /// World coordinate of the guide line.
    pub position: f64,
    /// The part of the moving box that matched.
    pub stop: GuideStop,
    /// Signed distance the moving box must travel to sit on the guide.
    pub offset: f64,
}

/// At most one vertical and one horizontal guide.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuideMatch {
    pub vertical: Option<Guide>,
    pub horizontal: Option<Guide>,
}

impl GuideMatch {
    pub fn is_empty(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    /// Corrective delta that aligns the moving box exactly to the guides.
    pub fn snapped_delta(&self) -> Vec2 {
        Vec2::new(
            self.vertical.map_or(0.0, |g| g.offset),
            self.horizontal.map_or(0.0, |g| g.offset),
        )
    }
}

/// Stops of a box along one axis, in evaluation order.
fn stops(rect: Rect, orientation: GuideOrientation) -> [(GuideStop, f64); 3] {
    match orientation {
        GuideOrientation::Vertical => [
            (GuideStop::Center, rect.center().x),
            (GuideStop::Start, rect.x0),
            (GuideStop::End, rect.x1),
        ],
        GuideOrientation::Horizontal => [
            (GuideStop::Center, rect.center().y),
            (GuideStop::Start, rect.y0),
            (GuideStop::End, rect.y1),
        ],
    }
}

fn best_on_axis(
    moving: Rect,
    candidates: &[Rect],
    threshold: f64,
    orientation: GuideOrientation,
) -> Option<Guide> {
    let mut best: Option<Guide> = None;
    let mut best_distance = f64::INFINITY;

    for (stop, value) in stops(moving, orientation) {
        for candidate in candidates {
            for (_, target) in stops(*candidate, orientation) {
                let distance = (target - value).abs();
                // Strict comparison keeps the earlier candidate on ties.
                if distance < threshold && distance < best_distance {
                    best_distance = distance;
                    best = Some(Guide {
                        orientation,
                        position: target,
                        stop,
                        offset: target - value,
                    });
                }
            }
        }
    }
    best
}

/// Compare the moving box against candidate boxes on both axes.
pub fn compute_guides(moving: Rect, candidates: &[Rect], threshold: f64) -> GuideMatch {
    GuideMatch {
        vertical: best_on_axis(moving, candidates, threshold, GuideOrientation::Vertical),
        horizontal: best_on_axis(moving, candidates, threshold, GuideOrientation::Horizontal),
    }
}

/// Bounds of every visible shape node other than `dragged`.
pub fn guide_candidates<S: SceneGraph>(scene: &S, dragged: NodeId) -> Vec<Rect> {
    scene
        .ids_with_role(NodeRole::Shape)
        .into_iter()
        .filter(|id| *id != dragged && scene.is_visible(*id))
        .filter_map(|id| scene.bounds(id))
        .collect()
}

/// The guide line drawables currently on screen.
#[derive(Debug, Clone, Default)]
pub struct SmartGuides {
    vertical: Option<NodeId>,
    horizontal: Option<NodeId>,
}

impl SmartGuides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    /// Ids of the guide drawables on screen.
    pub fn drawables(&self) -> Vec<NodeId> {
        self.vertical.into_iter().chain(self.horizontal).collect()
    }

    /// Replace the shown guides with `matched`, spanning `viewport`.
    pub fn show<S: SceneGraph>(&mut self, scene: &mut S, matched: &GuideMatch, viewport: Rect) {
        self.clear(scene);
        self.vertical = matched.vertical.map(|g| {
            let line = guide_line(
                Point::new(g.position, viewport.y0),
                Point::new(g.position, viewport.y1),
            );
            scene.insert(line, NodeRole::Guide)
        });
        self.horizontal = matched.horizontal.map(|g| {
            let line = guide_line(
                Point::new(viewport.x0, g.position),
                Point::new(viewport.x1, g.position),
            );
            scene.insert(line, NodeRole::Guide)
        });
    }

    /// Remove every guide drawable.
    pub fn clear<S: SceneGraph>(&mut self, scene: &mut S) {
        for id in self.vertical.take().into_iter().chain(self.horizontal.take()) {
            scene.remove(id);
        }
        scene.request_redraw();
    }
}

fn guide_line(start: Point, end: Point) -> Shape {
    let mut line = Line::new(start, end);
    line.style = ShapeStyle {
        fill: None,
        stroke: SerializableColor::new(255, 0, 128, 255),
        stroke_width: 1.0,
        opacity: 1.0,
        dash: vec![4.0, 6.0],
    };
    Shape::Line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::shapes::Rectangle;

    #[test]
    fn test_snap_to_grid() {
        let result = snap_to_grid(Point::new(23.0, 47.0), 20.0);
        assert_eq!(result.point, Point::new(20.0, 40.0));
        assert!(result.snapped_x);
        assert!(result.snapped_y);
    }

    #[test]
    fn test_snap_to_grid_exact() {
        let result = snap_to_grid(Point::new(40.0, 60.0), 20.0);
        assert_eq!(result.point, Point::new(40.0, 60.0));
        assert!(!result.snapped_x);
        assert!(!result.snapped_y);
    }

    #[test]
    fn test_snap_to_grid_round_up() {
        let result = snap_to_grid(Point::new(53.0, 78.0), 20.0);
        assert_eq!(result.point, Point::new(60.0, 80.0));
    }

    #[test]
    fn test_snap_to_grid_is_idempotent() {
        for (x, y) in [(53.0, 78.0), (-31.0, 9.99), (10.0, 30.0), (1234.5, -0.4)] {
            let once = snap_to_grid(Point::new(x, y), 20.0).point;
            let twice = snap_to_grid(once, 20.0).point;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_guides_match_edges_under_threshold() {
        let moving = Rect::new(103.0, 250.0, 153.0, 300.0);
        let other = Rect::new(0.0, 0.0, 100.0, 100.0);
        let matched = compute_guides(moving, &[other], 5.0);

        let vertical = matched.vertical.unwrap();
        assert_eq!(vertical.position, 100.0);
        assert_eq!(vertical.stop, GuideStop::Start);
        assert!(matched.horizontal.is_none());
        assert_eq!(matched.snapped_delta(), Vec2::new(-3.0, 0.0));
    }

    #[test]
    fn test_guides_prefer_center_on_ties() {
        // Moving center x = 52, left edge = 2: both are 2 away from a target.
        let moving = Rect::new(2.0, 500.0, 102.0, 600.0);
        let other = Rect::new(0.0, 0.0, 100.0, 100.0);
        let matched = compute_guides(moving, &[other], 5.0);
        assert_eq!(matched.vertical.unwrap().stop, GuideStop::Center);
    }

    #[test]
    fn test_no_guide_at_threshold() {
        let moving = Rect::new(105.0, 500.0, 155.0, 550.0);
        let other = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(compute_guides(moving, &[other], 5.0).is_empty());
    }

    #[test]
    fn test_candidates_exclude_dragged_and_non_shapes() {
        let mut scene = Scene::new();
        let dragged = scene.insert(
            Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0)),
            NodeRole::Shape,
        );
        scene.insert(
            Shape::Rectangle(Rectangle::new(Point::new(50.0, 0.0), 10.0, 10.0)),
            NodeRole::Shape,
        );
        scene.insert(
            Shape::Rectangle(Rectangle::new(Point::new(90.0, 0.0), 10.0, 10.0)),
            NodeRole::Anchor,
        );
        let hidden = scene.insert(
            Shape::Rectangle(Rectangle::new(Point::new(70.0, 0.0), 10.0, 10.0)),
            NodeRole::Shape,
        );
        scene.set_visible(hidden, false);

        let candidates = guide_candidates(&scene, dragged);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].x0 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_show_and_clear_guides() {
        let mut scene = Scene::new();
        let mut guides = SmartGuides::new();
        let matched = GuideMatch {
            vertical: Some(Guide {
                orientation: GuideOrientation::Vertical,
                position: 100.0,
                stop: GuideStop::Start,
                offset: 0.0,
            }),
            horizontal: None,
        };
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);

        guides.show(&mut scene, &matched, viewport);
        guides.show(&mut scene, &matched, viewport);
        assert_eq!(scene.ids_with_role(NodeRole::Guide).len(), 1);
        let line = scene.get(guides.drawables()[0]).unwrap();
        assert!((line.bounds().height() - 600.0).abs() < 1e-9);

        guides.clear(&mut scene);
        assert!(guides.is_empty());
        assert!(scene.is_empty());
    }
}
