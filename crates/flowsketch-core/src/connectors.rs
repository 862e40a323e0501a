//! Connectors: persisted edges between two shapes.
//!
//! A connector stores its endpoints by node id and owns one drawable in the
//! scene. Whenever an endpoint moves the whole route is recomputed from the
//! two current bounding boxes.

use crate::scene::{NodeId, NodeRole, SceneError, SceneGraph};
use crate::shapes::{Arrow, Line, SerializableColor, Shape, ShapeStyle};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for connectors.
pub type ConnectorId = Uuid;

/// Smoothing applied to the curved connector route.
const CURVE_TENSION: f64 = 0.5;

/// How a connector is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Straight segment.
    #[default]
    Line,
    /// Straight segment with an arrowhead at the end shape.
    Arrow,
    /// Smooth curve bowed away from the chord.
    Curved,
    /// Orthogonal route with two bends.
    Elbow,
}

/// Style and geometry options of a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectorOptions {
    #[serde(rename = "type")]
    pub kind: ConnectorKind,
    pub stroke: SerializableColor,
    pub stroke_width: f64,
    pub dash: Vec<f64>,
    /// Bow of a curved connector, 0 (straight) to 1.
    pub curvature: f64,
    pub pointer_length: f64,
    pub pointer_width: f64,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            kind: ConnectorKind::Line,
            stroke: SerializableColor::black(),
            stroke_width: 2.0,
            dash: Vec::new(),
            curvature: 0.2,
            pointer_length: crate::shapes::DEFAULT_POINTER_LENGTH,
            pointer_width: crate::shapes::DEFAULT_POINTER_WIDTH,
        }
    }
}

impl ConnectorOptions {
    pub fn with_kind(kind: ConnectorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Merge the set fields of `patch` into these options.
    pub fn merge(&mut self, patch: &ConnectorPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(stroke) = patch.stroke {
            self.stroke = stroke;
        }
        if let Some(width) = patch.stroke_width {
            self.stroke_width = width.max(0.0);
        }
        if let Some(dash) = &patch.dash {
            self.dash = dash.clone();
        }
        if let Some(curvature) = patch.curvature {
            self.curvature = curvature;
        }
        if let Some(length) = patch.pointer_length {
            self.pointer_length = length.max(0.0);
        }
        if let Some(width) = patch.pointer_width {
            self.pointer_width = width.max(0.0);
        }
        self.curvature = self.curvature.clamp(0.0, 1.0);
    }

    fn style(&self) -> ShapeStyle {
        ShapeStyle {
            fill: match self.kind {
                ConnectorKind::Arrow => Some(self.stroke),
                _ => None,
            },
            stroke: self.stroke,
            stroke_width: self.stroke_width,
            opacity: 1.0,
            dash: self.dash.clone(),
        }
    }
}

/// Partial update of [`ConnectorOptions`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectorPatch {
    #[serde(rename = "type")]
    pub kind: Option<ConnectorKind>,
    pub stroke: Option<SerializableColor>,
    pub stroke_width: Option<f64>,
    pub dash: Option<Vec<f64>>,
    pub curvature: Option<f64>,
    pub pointer_length: Option<f64>,
    pub pointer_width: Option<f64>,
}

/// A live connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: ConnectorId,
    pub start: NodeId,
    pub end: NodeId,
    pub options: ConnectorOptions,
    /// The scene drawable rendering this connector.
    pub drawable: NodeId,
}

/// Persisted form of a connector: endpoints by id, never by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorRecord {
    pub id: ConnectorId,
    pub start_shape_id: NodeId,
    pub end_shape_id: NodeId,
    #[serde(default)]
    pub options: ConnectorOptions,
}

/// Edge of a bounding box a connector attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Pick the edge of `from` that faces the center of `to`.
///
/// The angle between the centers is bucketed: right below 45°, left above
/// 135°, otherwise bottom when pointing down (positive y) and top when up.
pub fn attachment_side(from: Rect, to: Rect) -> Side {
    let delta = to.center() - from.center();
    let angle = delta.y.atan2(delta.x).to_degrees();
    if angle.abs() < 45.0 {
        Side::Right
    } else if angle.abs() > 135.0 {
        Side::Left
    } else if angle > 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// Midpoint of the given edge.
pub fn attachment_point(rect: Rect, side: Side) -> Point {
    let center = rect.center();
    match side {
        Side::Left => Point::new(rect.x0, center.y),
        Side::Right => Point::new(rect.x1, center.y),
        Side::Top => Point::new(center.x, rect.y0),
        Side::Bottom => Point::new(center.x, rect.y1),
    }
}

/// World-space route of a connector between two bounding boxes.
pub fn route(start: Rect, end: Rect, options: &ConnectorOptions) -> Vec<Point> {
    let start_side = attachment_side(start, end);
    let end_side = attachment_side(end, start);
    let a = attachment_point(start, start_side);
    let b = attachment_point(end, end_side);

    match options.kind {
        ConnectorKind::Line | ConnectorKind::Arrow => vec![a, b],
        ConnectorKind::Curved => {
            let chord = b - a;
            let length = chord.hypot();
            if length < f64::EPSILON {
                return vec![a, b];
            }
            let normal = Vec2::new(-chord.y, chord.x) / length;
            let control = a.midpoint(b) + normal * (options.curvature * length / 2.0);
            vec![a, control, b]
        }
        ConnectorKind::Elbow => {
            if start_side.is_horizontal() {
                let mid_x = (a.x + b.x) / 2.0;
                vec![a, Point::new(mid_x, a.y), Point::new(mid_x, b.y), b]
            } else {
                let mid_y = (a.y + b.y) / 2.0;
                vec![a, Point::new(a.x, mid_y), Point::new(b.x, mid_y), b]
            }
        }
    }
}

fn build_drawable(points: Vec<Point>, options: &ConnectorOptions) -> Shape {
    match options.kind {
        ConnectorKind::Arrow => {
            let mut arrow = Arrow::from_points(points);
            arrow.pointer_length = options.pointer_length;
            arrow.pointer_width = options.pointer_width;
            arrow.style = options.style();
            Shape::Arrow(arrow)
        }
        kind => {
            let mut line = Line::from_points(points);
            if kind == ConnectorKind::Curved {
                line.tension = CURVE_TENSION;
            }
            line.style = options.style();
            Shape::Line(line)
        }
    }
}

/// Rewrite an existing drawable in place.
fn patch_drawable(shape: &mut Shape, points: Vec<Point>, options: &ConnectorOptions) {
    match shape {
        Shape::Arrow(arrow) => {
            arrow.points = points;
            arrow.pointer_length = options.pointer_length;
            arrow.pointer_width = options.pointer_width;
        }
        Shape::Line(line) => line.points = points,
        _ => return,
    }
    *shape.style_mut() = options.style();
}

/// Registry of connectors and the nodes they listen to.
#[derive(Debug, Clone, Default)]
pub struct ConnectorEngine {
    connectors: HashMap<ConnectorId, Connector>,
    /// Creation order, used for stable serialization.
    order: Vec<ConnectorId>,
    /// Node id -> connectors attached to it.
    listeners: HashMap<NodeId, Vec<ConnectorId>>,
}

impl ConnectorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn get(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    /// Connectors in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Connector> {
        self.order.iter().filter_map(|id| self.connectors.get(id))
    }

    /// Connectors attached to `node` at either end.
    pub fn connectors_for(&self, node: NodeId) -> Vec<ConnectorId> {
        self.listeners.get(&node).cloned().unwrap_or_default()
    }

    /// Connect two shapes. The drawable is placed beneath both endpoints.
    pub fn create_connector<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        start: NodeId,
        end: NodeId,
        options: ConnectorOptions,
    ) -> Result<ConnectorId, SceneError> {
        self.create_with_id(scene, Uuid::new_v4(), start, end, options)
    }

    fn create_with_id<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        id: ConnectorId,
        start: NodeId,
        end: NodeId,
        mut options: ConnectorOptions,
    ) -> Result<ConnectorId, SceneError> {
        if start == end {
            return Err(SceneError::SelfConnection(start));
        }
        let start_bounds = scene.bounds(start).ok_or(SceneError::NodeNotFound(start))?;
        let end_bounds = scene.bounds(end).ok_or(SceneError::NodeNotFound(end))?;
        options.curvature = options.curvature.clamp(0.0, 1.0);

        let drawable = scene.insert(
            build_drawable(route(start_bounds, end_bounds, &options), &options),
            NodeRole::Connector,
        );
        Self::place_beneath_endpoints(scene, drawable, start, end);

        self.connectors.insert(
            id,
            Connector {
                id,
                start,
                end,
                options,
                drawable,
            },
        );
        self.order.push(id);
        self.listeners.entry(start).or_default().push(id);
        self.listeners.entry(end).or_default().push(id);
        scene.request_redraw();

        log::debug!("Connector {id} created: {start} -> {end}");
        Ok(id)
    }

    fn place_beneath_endpoints<S: SceneGraph>(
        scene: &mut S,
        drawable: NodeId,
        start: NodeId,
        end: NodeId,
    ) {
        let lowest = match (scene.z_index(start), scene.z_index(end)) {
            (Some(a), Some(b)) if b < a => end,
            _ => start,
        };
        scene.place_below(drawable, lowest);
    }

    /// Recompute the route of one connector from its endpoints' current bounds.
    pub fn reroute<S: SceneGraph>(&self, scene: &mut S, id: ConnectorId) {
        let Some(connector) = self.connectors.get(&id) else {
            return;
        };
        let (Some(start), Some(end)) = (scene.bounds(connector.start), scene.bounds(connector.end))
        else {
            log::debug!("Connector {id} has a missing endpoint, not rerouting");
            return;
        };
        let points = route(start, end, &connector.options);
        if let Some(shape) = scene.get_mut(connector.drawable) {
            patch_drawable(shape, points, &connector.options);
        }
    }

    /// Reroute every connector attached to `node`.
    pub fn node_moved<S: SceneGraph>(&self, scene: &mut S, node: NodeId) {
        let Some(ids) = self.listeners.get(&node) else {
            return;
        };
        for id in ids {
            self.reroute(scene, *id);
        }
        scene.request_redraw();
    }

    /// Merge style options. A kind change rebuilds the drawable.
    pub fn update_connector_style<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        id: ConnectorId,
        patch: &ConnectorPatch,
    ) -> Result<(), SceneError> {
        let connector = self
            .connectors
            .get_mut(&id)
            .ok_or(SceneError::ConnectorNotFound(id))?;
        let previous_kind = connector.options.kind;
        connector.options.merge(patch);

        if connector.options.kind != previous_kind || !scene.contains(connector.drawable) {
            let start = scene
                .bounds(connector.start)
                .ok_or(SceneError::NodeNotFound(connector.start))?;
            let end = scene
                .bounds(connector.end)
                .ok_or(SceneError::NodeNotFound(connector.end))?;
            scene.remove(connector.drawable);
            let drawable = scene.insert(
                build_drawable(route(start, end, &connector.options), &connector.options),
                NodeRole::Connector,
            );
            Self::place_beneath_endpoints(scene, drawable, connector.start, connector.end);
            connector.drawable = drawable;
            log::debug!("Connector {id} rebuilt as {:?}", connector.options.kind);
        } else {
            self.reroute(scene, id);
        }
        scene.request_redraw();
        Ok(())
    }

    /// Destroy one connector and its drawable.
    pub fn remove_connector<S: SceneGraph>(&mut self, scene: &mut S, id: ConnectorId) -> bool {
        let Some(connector) = self.connectors.remove(&id) else {
            return false;
        };
        self.order.retain(|c| *c != id);
        for node in [connector.start, connector.end] {
            if let Some(ids) = self.listeners.get_mut(&node) {
                ids.retain(|c| *c != id);
                if ids.is_empty() {
                    self.listeners.remove(&node);
                }
            }
        }
        scene.remove(connector.drawable);
        scene.request_redraw();
        true
    }

    /// Destroy every connector referencing `node` at either end.
    pub fn remove_connectors_for_shape<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        node: NodeId,
    ) -> Vec<ConnectorId> {
        let ids = self.connectors_for(node);
        for id in &ids {
            self.remove_connector(scene, *id);
        }
        ids
    }

    /// Persisted records in creation order.
    pub fn to_json(&self) -> Vec<ConnectorRecord> {
        self.iter()
            .map(|c| ConnectorRecord {
                id: c.id,
                start_shape_id: c.start,
                end_shape_id: c.end,
                options: c.options.clone(),
            })
            .collect()
    }

    /// Recreate connectors whose endpoints are both in `nodes`.
    /// Returns the number of connectors restored.
    pub fn from_json<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        records: &[ConnectorRecord],
        nodes: &[NodeId],
    ) -> usize {
        let mut restored = 0;
        for record in records {
            if !nodes.contains(&record.start_shape_id) || !nodes.contains(&record.end_shape_id) {
                log::warn!("Skipping connector {}: endpoint not found", record.id);
                continue;
            }
            if self.connectors.contains_key(&record.id) {
                log::warn!("Skipping duplicate connector {}", record.id);
                continue;
            }
            match self.create_with_id(
                scene,
                record.id,
                record.start_shape_id,
                record.end_shape_id,
                record.options.clone(),
            ) {
                Ok(_) => restored += 1,
                Err(e) => log::warn!("Skipping connector {}: {}", record.id, e),
            }
        }
        restored
    }

    /// Destroy every connector drawable and empty the registry.
    pub fn clear_all<S: SceneGraph>(&mut self, scene: &mut S) {
        for connector in self.connectors.values() {
            scene.remove(connector.drawable);
        }
        self.connectors.clear();
        self.order.clear();
        self.listeners.clear();
        scene.request_redraw();
    }
}
