//! Selection set, the shared transform handle and property edits.

use crate::scene::{NodeId, SceneError, SceneGraph};
use crate::shapes::{NodeTransform, Shape, number};
use kurbo::{Point, Rect, Vec2};
use serde_json::Value;

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 24.0;
/// Distance from the selection edge to the rotation handle (in world units).
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest box a resize may produce, in world units.
const MIN_TRANSFORM_SIZE: f64 = 1.0;

/// Type of transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Corner(Corner),
    /// Edge midpoint handle (resizes one axis).
    Edge(Edge),
    /// Rotation handle (above the top edge).
    Rotate,
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A transform handle with its position and type.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in world coordinates) hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Resize handles on corners and edge midpoints plus the rotation handle.
pub fn handles_for_bounds(bounds: Rect) -> Vec<Handle> {
    let center = bounds.center();
    vec![
        Handle::new(Point::new(bounds.x0, bounds.y0), HandleKind::Corner(Corner::TopLeft)),
        Handle::new(Point::new(bounds.x1, bounds.y0), HandleKind::Corner(Corner::TopRight)),
        Handle::new(Point::new(bounds.x0, bounds.y1), HandleKind::Corner(Corner::BottomLeft)),
        Handle::new(Point::new(bounds.x1, bounds.y1), HandleKind::Corner(Corner::BottomRight)),
        Handle::new(Point::new(center.x, bounds.y0), HandleKind::Edge(Edge::Top)),
        Handle::new(Point::new(bounds.x1, center.y), HandleKind::Edge(Edge::Right)),
        Handle::new(Point::new(center.x, bounds.y1), HandleKind::Edge(Edge::Bottom)),
        Handle::new(Point::new(bounds.x0, center.y), HandleKind::Edge(Edge::Left)),
        Handle::new(
            Point::new(center.x, bounds.y0 - ROTATE_HANDLE_OFFSET),
            HandleKind::Rotate,
        ),
    ]
}

/// Point that stays fixed while dragging `handle`.
fn fixed_point(bounds: Rect, handle: HandleKind) -> Point {
    let center = bounds.center();
    match handle {
        HandleKind::Corner(Corner::TopLeft) => Point::new(bounds.x1, bounds.y1),
        HandleKind::Corner(Corner::TopRight) => Point::new(bounds.x0, bounds.y1),
        HandleKind::Corner(Corner::BottomLeft) => Point::new(bounds.x1, bounds.y0),
        HandleKind::Corner(Corner::BottomRight) => Point::new(bounds.x0, bounds.y0),
        HandleKind::Edge(Edge::Top) => Point::new(center.x, bounds.y1),
        HandleKind::Edge(Edge::Bottom) => Point::new(center.x, bounds.y0),
        HandleKind::Edge(Edge::Left) => Point::new(bounds.x1, center.y),
        HandleKind::Edge(Edge::Right) => Point::new(bounds.x0, center.y),
        HandleKind::Rotate => center,
    }
}

/// State of an in-progress resize or rotate of the attached nodes.
#[derive(Debug, Clone)]
struct TransformGesture {
    handle: HandleKind,
    start_point: Point,
    start_bounds: Rect,
    /// Node transforms at gesture start.
    originals: Vec<(NodeId, NodeTransform)>,
}

/// Tracks the selected nodes and drives the shared transform handle.
///
/// Selection order is insertion order. The handle is attached to exactly
/// the selected set.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: Vec<NodeId>,
    gesture: Option<TransformGesture>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected node ids in selection order.
    pub fn ids(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn first(&self) -> Option<NodeId> {
        self.selected.first().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Replace the selection with exactly `id`.
    pub fn select(&mut self, id: NodeId) {
        self.gesture = None;
        self.selected.clear();
        self.selected.push(id);
    }

    /// Append `id`. Returns false if it was already selected.
    pub fn add(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.gesture = None;
        self.selected.push(id);
        true
    }

    pub fn set(&mut self, ids: Vec<NodeId>) {
        self.gesture = None;
        self.selected.clear();
        for id in ids {
            if !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.gesture = None;
        self.selected.clear();
    }

    /// Union of the selected nodes' world bounds.
    pub fn bounds<S: SceneGraph>(&self, scene: &S) -> Option<Rect> {
        self.selected
            .iter()
            .filter_map(|id| scene.bounds(*id))
            .reduce(|a, b| a.union(b))
    }

    /// Handles of the transform box around the selection.
    pub fn handles<S: SceneGraph>(&self, scene: &S) -> Vec<Handle> {
        self.bounds(scene).map(handles_for_bounds).unwrap_or_default()
    }

    /// Find which handle (if any) is hit at the given point.
    pub fn hit_test_handle<S: SceneGraph>(
        &self,
        scene: &S,
        point: Point,
        tolerance: f64,
    ) -> Option<HandleKind> {
        self.handles(scene)
            .into_iter()
            .find(|h| h.hit_test(point, tolerance))
            .map(|h| h.kind)
    }

    pub fn is_transforming(&self) -> bool {
        self.gesture.is_some()
    }

    /// Start resizing or rotating the selection from `handle`.
    pub fn begin_transform<S: SceneGraph>(
        &mut self,
        scene: &S,
        handle: HandleKind,
        point: Point,
    ) -> bool {
        let Some(start_bounds) = self.bounds(scene) else {
            return false;
        };
        let originals = self
            .selected
            .iter()
            .filter_map(|id| scene.get(*id).map(|s| (*id, *s.transform())))
            .collect();
        self.gesture = Some(TransformGesture {
            handle,
            start_point: point,
            start_bounds,
            originals,
        });
        true
    }

    /// Apply the gesture for the current pointer position.
    /// Returns the nodes whose geometry changed.
    pub fn update_transform<S: SceneGraph>(
        &self,
        scene: &mut S,
        point: Point,
        keep_aspect_ratio: bool,
    ) -> Vec<NodeId> {
        let Some(gesture) = &self.gesture else {
            return Vec::new();
        };
        let pivot = fixed_point(gesture.start_bounds, gesture.handle);

        let apply: Box<dyn Fn(&NodeTransform) -> NodeTransform> = match gesture.handle {
            HandleKind::Rotate => {
                let start = gesture.start_point - pivot;
                let current = point - pivot;
                let degrees = (current.y.atan2(current.x) - start.y.atan2(start.x)).to_degrees();
                Box::new(move |original| rotate_about(original, pivot, degrees))
            }
            handle => {
                let (sx, sy) = scale_factors(gesture, handle, point, keep_aspect_ratio);
                Box::new(move |original| scale_about(original, pivot, sx, sy))
            }
        };

        let mut changed = Vec::with_capacity(gesture.originals.len());
        for (id, original) in &gesture.originals {
            if let Some(shape) = scene.get_mut(*id) {
                *shape.transform_mut() = apply(original);
                changed.push(*id);
            }
        }
        scene.request_redraw();
        changed
    }

    /// Finish the gesture. Returns true if one was active.
    pub fn end_transform(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    /// Move every selected node to the top, keeping their relative order.
    pub fn bring_to_front<S: SceneGraph>(&self, scene: &mut S) {
        for id in self.by_z_order(scene) {
            scene.move_to_top(id);
        }
    }

    /// Move every selected node to the bottom, keeping their relative order.
    pub fn send_to_back<S: SceneGraph>(&self, scene: &mut S) {
        for id in self.by_z_order(scene).into_iter().rev() {
            scene.move_to_bottom(id);
        }
    }

    fn by_z_order<S: SceneGraph>(&self, scene: &S) -> Vec<NodeId> {
        let mut ids: Vec<(usize, NodeId)> = self
            .selected
            .iter()
            .filter_map(|id| scene.z_index(*id).map(|z| (z, *id)))
            .collect();
        ids.sort_by_key(|(z, _)| *z);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Set an attribute on every selected node. Either all nodes accept the
    /// value or none is modified.
    pub fn apply_property<S: SceneGraph>(
        &self,
        scene: &mut S,
        key: &str,
        value: &Value,
    ) -> Result<Vec<NodeId>, SceneError> {
        let mut updated: Vec<(NodeId, Shape)> = Vec::with_capacity(self.selected.len());
        for id in &self.selected {
            let mut shape = scene.get(*id).cloned().ok_or(SceneError::NodeNotFound(*id))?;
            shape.set_attr(key, value)?;
            updated.push((*id, shape));
        }
        let ids = updated.iter().map(|(id, _)| *id).collect();
        for (id, shape) in updated {
            if let Some(slot) = scene.get_mut(id) {
                *slot = shape;
            }
        }
        scene.request_redraw();
        Ok(ids)
    }

    /// Set position or size of the first selected node.
    ///
    /// `width` and `height` are expressed as a scale of the unscaled geometry.
    pub fn apply_position<S: SceneGraph>(
        &self,
        scene: &mut S,
        key: &str,
        value: &Value,
    ) -> Result<Option<NodeId>, SceneError> {
        let Some(id) = self.first() else {
            return Ok(None);
        };
        let shape = scene.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        let v = number(key, value)?;
        match key {
            "x" => shape.transform_mut().x = v,
            "y" => shape.transform_mut().y = v,
            "rotation" => shape.transform_mut().rotation = v,
            "width" | "height" => {
                let size = shape.unscaled_size();
                let unscaled = if key == "width" { size.width } else { size.height };
                if unscaled.abs() < f64::EPSILON || v <= 0.0 {
                    return Err(SceneError::invalid(key, value));
                }
                if key == "width" {
                    shape.transform_mut().scale_x = v / unscaled;
                } else {
                    shape.transform_mut().scale_y = v / unscaled;
                }
            }
            _ => return Err(SceneError::UnknownAttribute(key.to_string())),
        }
        scene.request_redraw();
        Ok(Some(id))
    }
}

fn scale_factors(
    gesture: &TransformGesture,
    handle: HandleKind,
    point: Point,
    keep_aspect_ratio: bool,
) -> (f64, f64) {
    let bounds = gesture.start_bounds;
    let delta: Vec2 = point - gesture.start_point;
    let width = bounds.width().max(f64::EPSILON);
    let height = bounds.height().max(f64::EPSILON);

    let (dw, dh) = match handle {
        HandleKind::Corner(Corner::TopLeft) => (-delta.x, -delta.y),
        HandleKind::Corner(Corner::TopRight) => (delta.x, -delta.y),
        HandleKind::Corner(Corner::BottomLeft) => (-delta.x, delta.y),
        HandleKind::Corner(Corner::BottomRight) => (delta.x, delta.y),
        HandleKind::Edge(Edge::Left) => (-delta.x, 0.0),
        HandleKind::Edge(Edge::Right) => (delta.x, 0.0),
        HandleKind::Edge(Edge::Top) => (0.0, -delta.y),
        HandleKind::Edge(Edge::Bottom) => (0.0, delta.y),
        HandleKind::Rotate => (0.0, 0.0),
    };
    let mut sx = (width + dw).max(MIN_TRANSFORM_SIZE) / width;
    let mut sy = (height + dh).max(MIN_TRANSFORM_SIZE) / height;

    if keep_aspect_ratio && matches!(handle, HandleKind::Corner(_)) {
        let uniform = sx.max(sy);
        sx = uniform;
        sy = uniform;
    }
    (sx, sy)
}

/// Scale about `pivot` by world-axis factors. For a rotated node the factors
/// are projected onto its local axes so a uniform resize keeps its aspect.
fn scale_about(original: &NodeTransform, pivot: Point, sx: f64, sy: f64) -> NodeTransform {
    let offset = original.position() - pivot;
    let (sin, cos) = original.rotation.to_radians().sin_cos();
    let local_x = (sx * cos).hypot(sy * sin);
    let local_y = (sx * sin).hypot(sy * cos);
    NodeTransform {
        x: pivot.x + offset.x * sx,
        y: pivot.y + offset.y * sy,
        scale_x: original.scale_x * local_x,
        scale_y: original.scale_y * local_y,
        rotation: original.rotation,
    }
}

fn rotate_about(original: &NodeTransform, pivot: Point, degrees: f64) -> NodeTransform {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let offset = original.position() - pivot;
    NodeTransform {
        x: pivot.x + offset.x * cos - offset.y * sin,
        y: pivot.y + offset.x * sin + offset.y * cos,
        rotation: original.rotation + degrees,
        ..*original
    }
}
