//! Connection anchors and the drag-to-connect gesture.
//!
//! Every shape gets eight anchor drawables on its bounding box. They are
//! shown on hover; pressing one starts the single connecting gesture, which
//! draws a preview line to the pointer and highlights the nearest anchor of
//! another shape within the capture radius.

use crate::scene::{NodeId, NodeRole, SceneGraph};
use crate::shapes::{Ellipse, Line, SerializableColor, Shape, ShapeStyle};
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Enlargement of the highlighted target anchor.
const HIGHLIGHT_SCALE: f64 = 1.5;

const ANCHOR_COLOR: SerializableColor = SerializableColor {
    r: 0x1e,
    g: 0x88,
    b: 0xe5,
    a: 255,
};

/// Fixed relative location of an anchor on the owner's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorPosition {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 8] = [
        AnchorPosition::TopLeft,
        AnchorPosition::Top,
        AnchorPosition::TopRight,
        AnchorPosition::Right,
        AnchorPosition::BottomRight,
        AnchorPosition::Bottom,
        AnchorPosition::BottomLeft,
        AnchorPosition::Left,
    ];

    /// World position of this anchor on `bounds`.
    pub fn locate(self, bounds: Rect) -> Point {
        let c = bounds.center();
        match self {
            AnchorPosition::TopLeft => Point::new(bounds.x0, bounds.y0),
            AnchorPosition::Top => Point::new(c.x, bounds.y0),
            AnchorPosition::TopRight => Point::new(bounds.x1, bounds.y0),
            AnchorPosition::Right => Point::new(bounds.x1, c.y),
            AnchorPosition::BottomRight => Point::new(bounds.x1, bounds.y1),
            AnchorPosition::Bottom => Point::new(c.x, bounds.y1),
            AnchorPosition::BottomLeft => Point::new(bounds.x0, bounds.y1),
            AnchorPosition::Left => Point::new(bounds.x0, c.y),
        }
    }
}

/// Per-node anchor visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    Hidden,
    Visible,
}

/// One anchor of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub position: AnchorPosition,
    pub drawable: NodeId,
}

#[derive(Debug, Clone)]
struct NodeAnchors {
    anchors: Vec<Anchor>,
    state: AnchorState,
}

/// The in-progress connection, at most one at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectingGesture {
    pub source_node: NodeId,
    pub source_anchor: AnchorPosition,
    /// Rubber-band line drawable.
    pub preview: NodeId,
    /// Candidate target currently enlarged.
    pub highlighted: Option<Anchor>,
}

/// Owns the anchors of every shape and the connecting gesture.
#[derive(Debug, Clone)]
pub struct AnchorManager {
    nodes: HashMap<NodeId, NodeAnchors>,
    gesture: Option<ConnectingGesture>,
    hovered: Option<NodeId>,
    anchor_size: f64,
}

impl AnchorManager {
    pub fn new(anchor_size: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            gesture: None,
            hovered: None,
            anchor_size,
        }
    }

    pub fn anchor_size(&self) -> f64 {
        self.anchor_size
    }

    /// Distance within which a target anchor is captured.
    pub fn capture_radius(&self) -> f64 {
        self.anchor_size * 4.0
    }

    pub fn state(&self, node: NodeId) -> AnchorState {
        self.nodes.get(&node).map_or(AnchorState::Hidden, |n| n.state)
    }

    pub fn is_connecting(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn gesture(&self) -> Option<&ConnectingGesture> {
        self.gesture.as_ref()
    }

    /// Anchors of `node`, in [`AnchorPosition::ALL`] order.
    pub fn anchors(&self, node: NodeId) -> &[Anchor] {
        self.nodes.get(&node).map_or(&[], |n| n.anchors.as_slice())
    }

    /// World position of one anchor.
    pub fn anchor_point<S: SceneGraph>(
        &self,
        scene: &S,
        node: NodeId,
        position: AnchorPosition,
    ) -> Option<Point> {
        scene.bounds(node).map(|b| position.locate(b))
    }

    /// Create the (hidden) anchors of a node. No-op if it already has them.
    pub fn attach<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) {
        if self.nodes.contains_key(&node) {
            return;
        }
        let Some(bounds) = scene.bounds(node) else {
            return;
        };
        let anchors = AnchorPosition::ALL
            .iter()
            .map(|position| {
                let drawable = scene.insert(
                    anchor_shape(position.locate(bounds), self.anchor_size, false),
                    NodeRole::Anchor,
                );
                scene.set_visible(drawable, false);
                Anchor {
                    node,
                    position: *position,
                    drawable,
                }
            })
            .collect();
        self.nodes.insert(
            node,
            NodeAnchors {
                anchors,
                state: AnchorState::Hidden,
            },
        );
    }

    /// Destroy the anchors of a node, ending any gesture that involves it.
    pub fn detach<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) {
        let involved = self.gesture.as_ref().is_some_and(|g| {
            g.source_node == node || g.highlighted.is_some_and(|a| a.node == node)
        });
        if involved {
            self.cancel_connecting(scene);
        }
        if self.hovered == Some(node) {
            self.hovered = None;
        }
        if let Some(entry) = self.nodes.remove(&node) {
            for anchor in entry.anchors {
                scene.remove(anchor.drawable);
            }
        }
    }

    /// Destroy every anchor and any gesture.
    pub fn detach_all<S: SceneGraph>(&mut self, scene: &mut S) {
        self.cancel_connecting(scene);
        for (_, entry) in self.nodes.drain() {
            for anchor in entry.anchors {
                scene.remove(anchor.drawable);
            }
        }
        self.hovered = None;
    }

    /// Move a node's anchors to its current bounding box.
    pub fn sync<S: SceneGraph>(&self, scene: &mut S, node: NodeId) {
        let (Some(entry), Some(bounds)) = (self.nodes.get(&node), scene.bounds(node)) else {
            return;
        };
        let highlighted = self.gesture.as_ref().and_then(|g| g.highlighted);
        for anchor in &entry.anchors {
            let enlarged = highlighted == Some(*anchor);
            if let Some(Shape::Ellipse(dot)) = scene.get_mut(anchor.drawable) {
                dot.transform.set_position(anchor.position.locate(bounds));
                let radius = self.radius(enlarged);
                dot.radius_x = radius;
                dot.radius_y = radius;
            }
        }
        scene.request_redraw();
    }

    fn radius(&self, enlarged: bool) -> f64 {
        if enlarged {
            self.anchor_size * HIGHLIGHT_SCALE
        } else {
            self.anchor_size
        }
    }

    fn set_state<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId, state: AnchorState) {
        let Some(entry) = self.nodes.get_mut(&node) else {
            return;
        };
        if entry.state == state {
            return;
        }
        entry.state = state;
        for anchor in &entry.anchors {
            scene.set_visible(anchor.drawable, state == AnchorState::Visible);
            if state == AnchorState::Visible {
                scene.move_to_top(anchor.drawable);
            }
        }
        scene.request_redraw();
    }

    /// Pointer entered a node: show its anchors.
    pub fn pointer_enter<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) {
        self.hovered = Some(node);
        self.sync(scene, node);
        self.set_state(scene, node, AnchorState::Visible);
    }

    /// Pointer left a node: hide its anchors unless a connection is being aimed.
    pub fn pointer_leave<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) {
        if self.hovered == Some(node) {
            self.hovered = None;
        }
        if self.is_connecting() {
            return;
        }
        self.set_state(scene, node, AnchorState::Hidden);
    }

    /// The anchor rendered by `drawable`, if any.
    pub fn anchor_for_drawable(&self, drawable: NodeId) -> Option<Anchor> {
        self.nodes
            .values()
            .flat_map(|n| n.anchors.iter())
            .find(|a| a.drawable == drawable)
            .copied()
    }

    /// Start connecting from an anchor. Ignored while another gesture is active.
    pub fn begin_connecting<S: SceneGraph>(&mut self, scene: &mut S, anchor: Anchor) -> bool {
        if self.gesture.is_some() {
            log::debug!("Connection gesture already active, ignoring");
            return false;
        }
        let Some(origin) = self.anchor_point(scene, anchor.node, anchor.position) else {
            return false;
        };
        let mut line = Line::new(origin, origin);
        line.style = ShapeStyle {
            fill: None,
            stroke: ANCHOR_COLOR,
            stroke_width: 2.0,
            opacity: 1.0,
            dash: vec![6.0, 4.0],
        };
        let preview = scene.insert(Shape::Line(line), NodeRole::Preview);
        self.gesture = Some(ConnectingGesture {
            source_node: anchor.node,
            source_anchor: anchor.position,
            preview,
            highlighted: None,
        });
        // Every other shape becomes a potential drop target.
        let others: Vec<NodeId> = self.nodes.keys().copied().filter(|n| *n != anchor.node).collect();
        for node in others {
            self.sync(scene, node);
            self.set_state(scene, node, AnchorState::Visible);
        }
        log::debug!("Connecting from {} {:?}", anchor.node, anchor.position);
        true
    }

    /// Nearest anchor of a node other than the source within the capture radius.
    fn nearest_target<S: SceneGraph>(&self, scene: &S, source: NodeId, pointer: Point) -> Option<Anchor> {
        let radius = self.capture_radius();
        let mut best: Option<(f64, Anchor)> = None;
        for (node, entry) in &self.nodes {
            if *node == source {
                continue;
            }
            let Some(bounds) = scene.bounds(*node) else {
                continue;
            };
            for anchor in &entry.anchors {
                let distance = (anchor.position.locate(bounds) - pointer).hypot();
                if distance <= radius && best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, *anchor));
                }
            }
        }
        best.map(|(_, anchor)| anchor)
    }

    /// Follow the pointer and update the highlighted target.
    pub fn update_connecting<S: SceneGraph>(&mut self, scene: &mut S, pointer: Point) {
        let Some(gesture) = &self.gesture else {
            return;
        };
        let source = gesture.source_node;
        let preview = gesture.preview;
        let previous = gesture.highlighted;

        if let Some(Shape::Line(line)) = scene.get_mut(preview) {
            if let Some(end) = line.points.last_mut() {
                *end = pointer;
            }
        }

        let target = self.nearest_target(scene, source, pointer);
        if target != previous {
            if let Some(old) = previous {
                set_dot_radius(scene, old.drawable, self.radius(false), false);
            }
            if let Some(new) = target {
                set_dot_radius(scene, new.drawable, self.radius(true), true);
            }
            if let Some(gesture) = self.gesture.as_mut() {
                gesture.highlighted = target;
            }
        }
        scene.request_redraw();
    }

    /// Release the pointer. Returns `(source, target)` when a valid anchor of
    /// another node was within range. The gesture is always torn down.
    pub fn end_connecting<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        pointer: Point,
    ) -> Option<(NodeId, NodeId)> {
        let source = self.gesture.as_ref()?.source_node;
        let target = self
            .nearest_target(scene, source, pointer)
            .filter(|anchor| anchor.node != source && scene.contains(source));
        self.cancel_connecting(scene);
        target.map(|anchor| (source, anchor.node))
    }

    /// Tear down the gesture without connecting anything.
    pub fn cancel_connecting<S: SceneGraph>(&mut self, scene: &mut S) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        scene.remove(gesture.preview);
        if let Some(anchor) = gesture.highlighted {
            set_dot_radius(scene, anchor.drawable, self.radius(false), false);
        }
        let idle: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|n| Some(*n) != self.hovered)
            .collect();
        for node in idle {
            self.set_state(scene, node, AnchorState::Hidden);
        }
        scene.request_redraw();
    }
}

fn anchor_shape(center: Point, radius: f64, highlighted: bool) -> Shape {
    let mut dot = Ellipse::circle(center, radius);
    dot.style = anchor_style(highlighted);
    Shape::Ellipse(dot)
}

fn anchor_style(highlighted: bool) -> ShapeStyle {
    ShapeStyle {
        fill: Some(if highlighted {
            ANCHOR_COLOR
        } else {
            SerializableColor::white()
        }),
        stroke: ANCHOR_COLOR,
        stroke_width: 1.5,
        opacity: 1.0,
        dash: Vec::new(),
    }
}

fn set_dot_radius<S: SceneGraph>(scene: &mut S, drawable: NodeId, radius: f64, highlighted: bool) {
    if let Some(Shape::Ellipse(dot)) = scene.get_mut(drawable) {
        dot.radius_x = radius;
        dot.radius_y = radius;
        dot.style = anchor_style(highlighted);
    }
}
