//! FlowSketch Core Library
//!
//! Headless editing core for the FlowSketch diagram editor: shapes on a
//! retained scene, connectors, anchors, selection, snapping and undo.

pub mod anchors;
pub mod camera;
pub mod config;
pub mod connectors;
pub mod editor;
pub mod history;
pub mod notify;
pub mod scene;
pub mod selection;
pub mod session;
pub mod shapes;
pub mod snap;
pub mod storage;

pub use anchors::{Anchor, AnchorManager, AnchorPosition, AnchorState};
pub use camera::Camera;
pub use config::{ConfigError, EditorConfig};
pub use connectors::{
    Connector, ConnectorEngine, ConnectorId, ConnectorKind, ConnectorOptions, ConnectorPatch,
    ConnectorRecord,
};
pub use editor::{Editor, EditorEvent, SceneEvent};
pub use history::{HistoryLog, SceneSnapshot, SnapshotError};
pub use notify::{LogNotifier, Notifier, NotifyIcon, NotifyOptions};
pub use scene::{NodeId, NodeRole, Scene, SceneError, SceneGraph};
pub use selection::{Handle, HandleKind, SelectionManager};
pub use session::Session;
pub use shapes::{Shape, ShapeId, ShapeStyle};
pub use snap::{GuideMatch, SmartGuides, SnapResult, compute_guides, snap_to_grid};
pub use storage::{
    FileStorage, MemoryStorage, Project, ProjectInfo, ProjectLibrary, Storage, StorageError,
};
