//! Scene snapshots and the bounded undo/redo log.

use crate::connectors::{ConnectorEngine, ConnectorRecord};
use crate::scene::{NodeRole, SceneGraph};
use crate::shapes::Shape;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Current persisted snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while decoding persisted snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// A self-contained serialized copy of the scene.
///
/// Shapes are kept as flat attribute bags so that a snapshot never aliases
/// live scene state and unknown shape types survive until decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub version: u32,
    pub zoom: f64,
    pub shapes: Vec<Value>,
    pub connectors: Vec<ConnectorRecord>,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            zoom: crate::camera::BASE_ZOOM,
            shapes: Vec::new(),
            connectors: Vec::new(),
        }
    }
}

/// Lenient on-disk layout: entries are validated one by one.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default = "default_zoom")]
    zoom: f64,
    #[serde(default)]
    shapes: Vec<Value>,
    #[serde(default)]
    connectors: Vec<Value>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

fn default_zoom() -> f64 {
    crate::camera::BASE_ZOOM
}

impl SceneSnapshot {
    /// Capture every `Shape` node (back to front), every connector and the zoom.
    pub fn capture<S: SceneGraph>(scene: &S, connectors: &ConnectorEngine, zoom: f64) -> Self {
        let shapes = scene
            .ids_with_role(NodeRole::Shape)
            .into_iter()
            .filter_map(|id| scene.get(id))
            .filter_map(|shape| match serde_json::to_value(shape) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("Failed to serialize shape {}: {}", shape.id(), e);
                    None
                }
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            zoom,
            shapes,
            connectors: connectors.to_json(),
        }
    }

    /// Decode the stored shapes, skipping entries that are not valid shapes.
    pub fn decode_shapes(&self) -> Vec<Shape> {
        self.shapes
            .iter()
            .filter_map(|value| match serde_json::from_value::<Shape>(value.clone()) {
                Ok(shape) => Some(shape),
                Err(e) => {
                    let tag = value.get("type").and_then(Value::as_str).unwrap_or("<missing>");
                    log::warn!("Skipping shape of type {tag}: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a persisted snapshot. Malformed connector entries are dropped with
    /// a warning; malformed shapes are dropped later by [`Self::decode_shapes`].
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        if raw.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(raw.version));
        }

        let connectors = raw
            .connectors
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<ConnectorRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping malformed connector entry: {e}");
                    None
                }
            })
            .collect();

        Ok(Self {
            version: SNAPSHOT_VERSION,
            zoom: if raw.zoom.is_finite() && raw.zoom > 0.0 {
                raw.zoom
            } else {
                default_zoom()
            },
            shapes: raw.shapes,
            connectors,
        })
    }
}

/// Ordered snapshots plus a cursor.
///
/// `step` always points at the state currently shown. Pushing discards the
/// redo branch; going over capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: Vec<SceneSnapshot>,
    step: usize,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            step: 0,
            capacity: capacity.max(1),
        }
    }

    /// Append a snapshot and make it current.
    pub fn push(&mut self, snapshot: SceneSnapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.step + 1);
        }
        self.entries.push(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.step = self.entries.len() - 1;
    }

    /// Move the cursor back and return the state to restore.
    pub fn step_back(&mut self) -> Option<&SceneSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.step -= 1;
        self.entries.get(self.step)
    }

    /// Move the cursor forward and return the state to restore.
    pub fn step_forward(&mut self) -> Option<&SceneSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.step += 1;
        self.entries.get(self.step)
    }

    pub fn can_undo(&self) -> bool {
        self.step > 0
    }

    pub fn can_redo(&self) -> bool {
        self.step + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&SceneSnapshot> {
        self.entries.get(self.step)
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::shapes::Rectangle;
    use kurbo::Point;
    use pretty_assertions::assert_eq;

    fn marked(zoom: f64) -> SceneSnapshot {
        SceneSnapshot {
            zoom,
            ..SceneSnapshot::default()
        }
    }

    #[test]
    fn test_can_undo_only_after_first_entry() {
        let mut log = HistoryLog::new(50);
        for n in 1..=5 {
            log.push(marked(n as f64));
            assert_eq!(log.can_undo(), log.step() != 0);
        }
        assert_eq!(log.step(), 4);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_redo_cursor() {
        let mut log = HistoryLog::new(50);
        log.push(marked(1.0));
        log.push(marked(2.0));

        assert_eq!(log.step_back().map(|s| s.zoom), Some(1.0));
        assert!(log.step_back().is_none());
        assert_eq!(log.step_forward().map(|s| s.zoom), Some(2.0));
        assert!(log.step_forward().is_none());
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut log = HistoryLog::new(50);
        for n in 1..=5 {
            log.push(marked(n as f64));
        }
        for _ in 0..3 {
            log.step_back();
        }
        log.push(marked(6.0));

        assert!(!log.can_redo());
        assert_eq!(log.len(), 3);
        assert_eq!(log.current().map(|s| s.zoom), Some(6.0));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = HistoryLog::new(3);
        for n in 1..=4 {
            log.push(marked(n as f64));
        }
        assert_eq!(log.len(), 3);
        while log.step_back().is_some() {}
        assert_eq!(log.current().map(|s| s.zoom), Some(2.0));
    }

    #[test]
    fn test_capture_keeps_only_shape_nodes() {
        let mut scene = Scene::new();
        scene.insert(
            Shape::Rectangle(Rectangle::new(Point::new(5.0, 5.0), 10.0, 10.0)),
            NodeRole::Shape,
        );
        scene.insert(
            Shape::Rectangle(Rectangle::new(Point::ZERO, 1.0, 1.0)),
            NodeRole::Anchor,
        );

        let snapshot = SceneSnapshot::capture(&scene, &ConnectorEngine::new(), 1.5);
        assert_eq!(snapshot.shapes.len(), 1);
        assert_eq!(snapshot.zoom, 1.5);
        assert_eq!(snapshot.decode_shapes().len(), 1);
    }

    #[test]
    fn test_from_json_skips_bad_entries() {
        let json = r##"{
            "version": 1,
            "zoom": 2.0,
            "shapes": [
                {"type": "hexagram", "x": 1},
                {"type": "rectangle", "id": "6c2b6a0e-2f7c-4b8b-9d7c-0d5d1c4b9a11",
                 "width": 10, "height": 10, "stroke": "#000000", "strokeWidth": 1}
            ],
            "connectors": [{"id": "nope"}]
        }"##;
        let snapshot = SceneSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.zoom, 2.0);
        assert!(snapshot.connectors.is_empty());
        assert_eq!(snapshot.decode_shapes().len(), 1);
    }

    #[test]
    fn test_from_json_rejects_future_version() {
        let result = SceneSnapshot::from_json(r#"{"version": 99}"#);
        assert!(matches!(result, Err(SnapshotError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = marked(0.5);
        let parsed = SceneSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
