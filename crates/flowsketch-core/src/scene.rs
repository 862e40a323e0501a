//! Scene graph capability and the in-memory retained scene.
//!
//! The editing core never owns drawables directly. It talks to a
//! [`SceneGraph`] through node identifiers, so a node destroyed mid-gesture
//! simply stops resolving instead of leaving a dangling reference.

use crate::shapes::{Shape, ShapeId};
use kurbo::{Point, Rect};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Identifier of a drawable in the scene. Shapes reuse their own id.
pub type NodeId = ShapeId;

/// Errors raised while mutating scene nodes.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Cannot connect node {0} to itself")]
    SelfConnection(NodeId),
    #[error("Connector not found: {0}")]
    ConnectorNotFound(uuid::Uuid),
}

impl SceneError {
    pub(crate) fn invalid(key: &str, value: &Value) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// What a drawable is for. Only `Shape` nodes are user content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// A diagram node the user placed.
    Shape,
    /// The rendered path of a connector.
    Connector,
    /// A connection handle on a shape.
    Anchor,
    /// A smart alignment guide line.
    Guide,
    /// The rubber-band line of an in-progress connection.
    Preview,
}

/// Capability interface over a retained-mode 2D scene.
pub trait SceneGraph {
    /// Add a drawable on top of the z-order and return its id.
    fn insert(&mut self, shape: Shape, role: NodeRole) -> NodeId;

    /// Destroy a drawable.
    fn remove(&mut self, id: NodeId) -> Option<Shape>;

    fn get(&self, id: NodeId) -> Option<&Shape>;

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Shape>;

    fn role(&self, id: NodeId) -> Option<NodeRole>;

    /// All drawable ids, back to front.
    fn ids(&self) -> Vec<NodeId>;

    /// Position in the z-order (0 = bottom).
    fn z_index(&self, id: NodeId) -> Option<usize>;

    fn move_to_top(&mut self, id: NodeId);

    fn move_to_bottom(&mut self, id: NodeId);

    /// Reposition `id` directly beneath `reference`.
    fn place_below(&mut self, id: NodeId, reference: NodeId);

    fn set_visible(&mut self, id: NodeId, visible: bool);

    fn is_visible(&self, id: NodeId) -> bool;

    /// Ask the renderer for a new frame.
    fn request_redraw(&mut self);

    fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// World-space axis-aligned bounding box.
    fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.get(id).map(Shape::bounds)
    }

    /// Ids with the given role, back to front.
    fn ids_with_role(&self, role: NodeRole) -> Vec<NodeId> {
        self.ids()
            .into_iter()
            .filter(|id| self.role(*id) == Some(role))
            .collect()
    }

    /// Topmost visible drawable under `point`.
    fn hit_test(&self, point: Point, tolerance: f64) -> Option<NodeId> {
        self.ids().into_iter().rev().find(|id| {
            self.is_visible(*id)
                && self
                    .get(*id)
                    .is_some_and(|shape| shape.hit_test(point, tolerance))
        })
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    shape: Shape,
    role: NodeRole,
    visible: bool,
}

/// In-memory scene: nodes keyed by id plus an explicit z-order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, SceneNode>,
    /// Z-order of drawables (back to front).
    z_order: Vec<NodeId>,
    redraw_requested: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drawables of every role.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns and resets the pending redraw flag.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }
}

impl SceneGraph for Scene {
    fn insert(&mut self, shape: Shape, role: NodeRole) -> NodeId {
        let id = shape.id();
        if self.nodes.contains_key(&id) {
            self.z_order.retain(|&z| z != id);
        }
        self.z_order.push(id);
        self.nodes.insert(
            id,
            SceneNode {
                shape,
                role,
                visible: true,
            },
        );
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<Shape> {
        self.z_order.retain(|&z| z != id);
        self.nodes.remove(&id).map(|n| n.shape)
    }

    fn get(&self, id: NodeId) -> Option<&Shape> {
        self.nodes.get(&id).map(|n| &n.shape)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Shape> {
        self.nodes.get_mut(&id).map(|n| &mut n.shape)
    }

    fn role(&self, id: NodeId) -> Option<NodeRole> {
        self.nodes.get(&id).map(|n| n.role)
    }

    fn ids(&self) -> Vec<NodeId> {
        self.z_order.clone()
    }

    fn z_index(&self, id: NodeId) -> Option<usize> {
        self.z_order.iter().position(|&z| z == id)
    }

    fn move_to_top(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) {
            self.z_order.retain(|&z| z != id);
            self.z_order.push(id);
        }
    }

    fn move_to_bottom(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) {
            self.z_order.retain(|&z| z != id);
            self.z_order.insert(0, id);
        }
    }

    fn place_below(&mut self, id: NodeId, reference: NodeId) {
        if id == reference || !self.nodes.contains_key(&id) {
            return;
        }
        self.z_order.retain(|&z| z != id);
        match self.z_order.iter().position(|&z| z == reference) {
            Some(pos) => self.z_order.insert(pos, id),
            None => self.z_order.push(id),
        }
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.visible)
    }

    fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rectangle;

    fn rect(x: f64, y: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 100.0))
    }

    #[test]
    fn test_insert_and_remove() {
        let mut scene = Scene::new();
        let id = scene.insert(rect(0.0, 0.0), NodeRole::Shape);
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(id));
        assert!(scene.remove(id).is_some());
        assert!(scene.is_empty());
        assert!(scene.z_index(id).is_none());
    }

    #[test]
    fn test_z_order() {
        let mut scene = Scene::new();
        let id1 = scene.insert(rect(0.0, 0.0), NodeRole::Shape);
        let id2 = scene.insert(rect(50.0, 50.0), NodeRole::Shape);
        let id3 = scene.insert(rect(80.0, 80.0), NodeRole::Shape);

        assert_eq!(scene.ids(), vec![id1, id2, id3]);

        scene.move_to_top(id1);
        assert_eq!(scene.ids(), vec![id2, id3, id1]);

        scene.move_to_bottom(id1);
        assert_eq!(scene.ids(), vec![id1, id2, id3]);

        scene.place_below(id3, id2);
        assert_eq!(scene.ids(), vec![id1, id3, id2]);
    }

    #[test]
    fn test_hit_test_prefers_front_and_skips_hidden() {
        let mut scene = Scene::new();
        let back = scene.insert(rect(0.0, 0.0), NodeRole::Shape);
        let front = scene.insert(rect(50.0, 50.0), NodeRole::Shape);

        assert_eq!(scene.hit_test(Point::new(75.0, 75.0), 0.0), Some(front));
        scene.set_visible(front, false);
        assert_eq!(scene.hit_test(Point::new(75.0, 75.0), 0.0), Some(back));
        assert_eq!(scene.hit_test(Point::new(500.0, 500.0), 0.0), None);
    }

    #[test]
    fn test_roles_filter_shapes() {
        let mut scene = Scene::new();
        let shape = scene.insert(rect(0.0, 0.0), NodeRole::Shape);
        scene.insert(rect(10.0, 10.0), NodeRole::Anchor);

        assert_eq!(scene.ids_with_role(NodeRole::Shape), vec![shape]);
    }

    #[test]
    fn test_redraw_request_is_consumed() {
        let mut scene = Scene::new();
        scene.request_redraw();
        assert!(scene.take_redraw_request());
        assert!(!scene.take_redraw_request());
    }
}
