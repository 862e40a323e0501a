//! Editor configuration.

use crate::connectors::ConnectorKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Maximum number of undo states to keep.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
/// Grid size for snapping (matches the visual grid).
pub const DEFAULT_GRID_SIZE: f64 = 20.0;
/// Distance under which a smart guide engages (in world units).
pub const DEFAULT_GUIDE_THRESHOLD: f64 = 5.0;
/// Radius of a connection anchor (in world units).
pub const DEFAULT_ANCHOR_SIZE: f64 = 6.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the editing core. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Snapshots kept in the undo log.
    pub history_capacity: usize,
    /// Grid unit for grid snapping.
    pub grid_size: f64,
    /// Whether drops, creations and pastes snap to the grid.
    pub grid_snap: bool,
    /// Whether smart guides are computed while dragging.
    pub smart_guides: bool,
    pub guide_threshold: f64,
    pub anchor_size: f64,
    /// Connector kind created by the anchor drag gesture.
    pub default_connector: ConnectorKind,
    /// Offset applied to pasted shapes.
    pub paste_offset: f64,
    pub autosave_interval_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            grid_size: DEFAULT_GRID_SIZE,
            grid_snap: false,
            smart_guides: true,
            guide_threshold: DEFAULT_GUIDE_THRESHOLD,
            anchor_size: DEFAULT_ANCHOR_SIZE,
            default_connector: ConnectorKind::Line,
            paste_offset: 20.0,
            autosave_interval_secs: crate::storage::DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str::<Self>(json)?.sanitized())
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Clamp values that would break the engines to usable minimums.
    fn sanitized(mut self) -> Self {
        if self.history_capacity == 0 {
            log::warn!("history capacity of 0 is not usable, using 1");
            self.history_capacity = 1;
        }
        if !(self.grid_size > 0.0) {
            log::warn!("grid size {} is not positive, using default", self.grid_size);
            self.grid_size = DEFAULT_GRID_SIZE;
        }
        self.guide_threshold = self.guide_threshold.max(0.0);
        if !(self.anchor_size > 0.0) {
            self.anchor_size = DEFAULT_ANCHOR_SIZE;
        }
        self
    }

    /// Radius within which a connection gesture captures a target anchor.
    pub fn capture_radius(&self) -> f64 {
        self.anchor_size * 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = EditorConfig::from_json(r#"{"gridSnap": true, "gridSize": 10}"#).unwrap();
        assert!(config.grid_snap);
        assert_eq!(config.grid_size, 10.0);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.default_connector, ConnectorKind::Line);
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let config = EditorConfig::from_json(r#"{"historyCapacity": 0, "gridSize": -4}"#).unwrap();
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.grid_size, DEFAULT_GRID_SIZE);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{"anchorSize": 8, "defaultConnector": "arrow"}"#).unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.capture_radius(), 32.0);
        assert_eq!(config.default_connector, ConnectorKind::Arrow);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(EditorConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
