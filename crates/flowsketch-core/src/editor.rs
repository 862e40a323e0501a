//! The editing coordinator.
//!
//! [`Editor`] owns the scene, the camera and every editing component. Hosts
//! feed it [`SceneEvent`]s and drain [`EditorEvent`]s; every discrete action
//! ends with exactly one history snapshot, drag frames never snapshot.

use crate::anchors::AnchorManager;
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::connectors::{ConnectorEngine, ConnectorId, ConnectorOptions, ConnectorPatch, ConnectorRecord};
use crate::history::{HistoryLog, SceneSnapshot};
use crate::scene::{NodeId, NodeRole, SceneError, SceneGraph};
use crate::selection::{HANDLE_HIT_TOLERANCE, HandleKind, SelectionManager};
use crate::shapes::Shape;
use crate::snap::{SmartGuides, compute_guides, guide_candidates, snap_to_grid};
use kurbo::{Point, Rect, Vec2};
use serde_json::Value;
use std::collections::HashMap;

/// Input delivered by the host. Points are in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    PointerEnter { node: NodeId },
    PointerLeave { node: NodeId },
    /// `additive` extends the selection instead of replacing it.
    PointerDown { point: Point, additive: bool },
    PointerMove { point: Point, keep_aspect_ratio: bool },
    PointerUp { point: Point },
    /// The pointer was released outside the canvas.
    StagePointerUp,
    DragStart { node: NodeId },
    /// `position` is the node's new origin as proposed by the host.
    DragMove { node: NodeId, position: Point },
    DragEnd { node: NodeId },
    TransformEnd,
}

/// Notifications for the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionChanged(Vec<NodeId>),
    /// Undo/redo availability may have changed.
    HistoryChanged,
    ZoomChanged(f64),
}

/// Copied shapes plus the connectors running between them.
#[derive(Debug, Clone, Default)]
struct Clipboard {
    shapes: Vec<Shape>,
    connectors: Vec<ConnectorRecord>,
}

/// Interactive editing core over a [`SceneGraph`].
pub struct Editor<S: SceneGraph> {
    scene: S,
    config: EditorConfig,
    camera: Camera,
    history: HistoryLog,
    selection: SelectionManager,
    connectors: ConnectorEngine,
    anchors: AnchorManager,
    guides: SmartGuides,
    dragging: Option<NodeId>,
    clipboard: Clipboard,
    events: Vec<EditorEvent>,
}

impl<S: SceneGraph> Editor<S> {
    /// Wrap `scene`, which is expected to be empty, and record the initial state.
    pub fn new(scene: S, config: EditorConfig) -> Self {
        let mut editor = Self {
            scene,
            camera: Camera::new(),
            history: HistoryLog::new(config.history_capacity),
            selection: SelectionManager::new(),
            connectors: ConnectorEngine::new(),
            anchors: AnchorManager::new(config.anchor_size),
            guides: SmartGuides::new(),
            dragging: None,
            clipboard: Clipboard::default(),
            events: Vec::new(),
            config,
        };
        let initial = editor.capture();
        editor.history.push(initial);
        editor
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Direct scene access for hosts. Changes made here are not recorded.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn connectors(&self) -> &ConnectorEngine {
        &self.connectors
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }

    pub fn guides(&self) -> &SmartGuides {
        &self.guides
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Take every pending event.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    fn emit_selection(&mut self) {
        let ids = self.selection.ids().to_vec();
        self.emit(EditorEvent::SelectionChanged(ids));
    }

    // --- History ---

    fn capture(&self) -> SceneSnapshot {
        SceneSnapshot::capture(&self.scene, &self.connectors, self.camera.zoom)
    }

    /// Current scene as a detached value, for saving.
    pub fn current_snapshot(&self) -> SceneSnapshot {
        self.capture()
    }

    /// Record the current scene as a new history step.
    pub fn snapshot(&mut self) {
        let snapshot = self.capture();
        self.history.push(snapshot);
        self.emit(EditorEvent::HistoryChanged);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.step_back().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        self.emit(EditorEvent::HistoryChanged);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.step_forward().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        self.emit(EditorEvent::HistoryChanged);
        true
    }

    /// Replace the scene with a loaded snapshot and start a fresh history.
    pub fn load_snapshot(&mut self, snapshot: &SceneSnapshot) {
        self.restore(snapshot);
        self.history.clear();
        let loaded = self.capture();
        self.history.push(loaded);
        self.emit(EditorEvent::HistoryChanged);
        log::info!(
            "Loaded scene: {} shapes, {} connectors",
            snapshot.shapes.len(),
            self.connectors.len()
        );
    }

    /// Rebuild the scene from `snapshot`. Never records history.
    fn restore(&mut self, snapshot: &SceneSnapshot) {
        self.connectors.clear_all(&mut self.scene);
        self.anchors.detach_all(&mut self.scene);
        self.guides.clear(&mut self.scene);
        self.selection.end_transform();
        self.dragging = None;

        for id in self.scene.ids_with_role(NodeRole::Shape) {
            self.scene.remove(id);
        }

        let mut nodes = Vec::with_capacity(snapshot.shapes.len());
        for shape in snapshot.decode_shapes() {
            let id = self.scene.insert(shape, NodeRole::Shape);
            self.anchors.attach(&mut self.scene, id);
            nodes.push(id);
        }
        self.connectors
            .from_json(&mut self.scene, &snapshot.connectors, &nodes);

        if self.camera.set_zoom(snapshot.zoom) {
            self.emit(EditorEvent::ZoomChanged(self.camera.zoom));
        }
        self.selection.clear();
        self.emit_selection();
        self.scene.request_redraw();
    }

    // --- Shapes ---

    /// Add a user shape. Returns its id.
    pub fn add_shape(&mut self, mut shape: Shape) -> NodeId {
        if self.config.grid_snap {
            let snapped = snap_to_grid(shape.position(), self.config.grid_size);
            shape.set_position(snapped.point);
        }
        let id = self.scene.insert(shape, NodeRole::Shape);
        self.anchors.attach(&mut self.scene, id);
        self.scene.request_redraw();
        self.snapshot();
        id
    }

    /// Connect two shapes with the configured default connector kind.
    pub fn connect(&mut self, start: NodeId, end: NodeId) -> Result<ConnectorId, SceneError> {
        let options = ConnectorOptions::with_kind(self.config.default_connector);
        self.connect_with(start, end, options)
    }

    pub fn connect_with(
        &mut self,
        start: NodeId,
        end: NodeId,
        options: ConnectorOptions,
    ) -> Result<ConnectorId, SceneError> {
        for node in [start, end] {
            if self.scene.role(node) != Some(NodeRole::Shape) {
                return Err(SceneError::NodeNotFound(node));
            }
        }
        let id = self
            .connectors
            .create_connector(&mut self.scene, start, end, options)?;
        self.snapshot();
        Ok(id)
    }

    pub fn update_connector_style(
        &mut self,
        id: ConnectorId,
        patch: &ConnectorPatch,
    ) -> Result<(), SceneError> {
        self.connectors
            .update_connector_style(&mut self.scene, id, patch)?;
        self.snapshot();
        Ok(())
    }

    pub fn remove_connector(&mut self, id: ConnectorId) -> bool {
        let removed = self.connectors.remove_connector(&mut self.scene, id);
        if removed {
            self.snapshot();
        }
        removed
    }

    /// Reroute connectors and move anchors after `node` changed geometry.
    fn node_changed(&mut self, node: NodeId) {
        self.connectors.node_moved(&mut self.scene, node);
        self.anchors.sync(&mut self.scene, node);
    }

    // --- Selection ---

    pub fn selected(&self) -> &[NodeId] {
        self.selection.ids()
    }

    /// Union bounds of the selection.
    pub fn selected_bounds(&self) -> Option<Rect> {
        self.selection.bounds(&self.scene)
    }

    /// Select only `id`. Non-shape nodes are ignored.
    pub fn select(&mut self, id: NodeId) {
        if self.scene.role(id) != Some(NodeRole::Shape) {
            return;
        }
        self.selection.select(id);
        self.emit_selection();
    }

    pub fn add_to_selection(&mut self, id: NodeId) {
        if self.scene.role(id) != Some(NodeRole::Shape) {
            return;
        }
        if self.selection.add(id) {
            self.emit_selection();
        }
    }

    /// Empty the selection. Always notifies.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.emit_selection();
    }

    pub fn select_all(&mut self) {
        let ids = self.scene.ids_with_role(NodeRole::Shape);
        self.selection.set(ids);
        self.emit_selection();
    }

    /// Delete the selected shapes and every connector touching them.
    /// Returns the number of shapes removed.
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        self.selection.end_transform();
        let ids = self.selection.ids().to_vec();
        let mut removed = 0;
        for id in ids {
            let connectors = self.connectors.remove_connectors_for_shape(&mut self.scene, id);
            self.anchors.detach(&mut self.scene, id);
            if self.scene.remove(id).is_some() {
                removed += 1;
            }
            log::debug!("Deleted {id} and {} connectors", connectors.len());
        }
        self.selection.clear();
        self.emit_selection();
        self.scene.request_redraw();
        self.snapshot();
        removed
    }

    pub fn bring_to_front(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.bring_to_front(&mut self.scene);
        self.scene.request_redraw();
        self.snapshot();
    }

    pub fn send_to_back(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.send_to_back(&mut self.scene);
        self.scene.request_redraw();
        self.snapshot();
    }

    /// Set an attribute on every selected shape.
    pub fn update_property(&mut self, key: &str, value: &Value) -> Result<(), SceneError> {
        if self.selection.is_empty() {
            return Ok(());
        }
        let changed = self.selection.apply_property(&mut self.scene, key, value)?;
        for id in changed {
            self.node_changed(id);
        }
        self.snapshot();
        Ok(())
    }

    /// Set `x`, `y`, `rotation`, `width` or `height` of the first selected shape.
    pub fn update_position(&mut self, key: &str, value: &Value) -> Result<(), SceneError> {
        if let Some(id) = self.selection.apply_position(&mut self.scene, key, value)? {
            self.node_changed(id);
            self.snapshot();
        }
        Ok(())
    }

    // --- Transform ---

    /// Start a resize or rotate of the selection from `handle`.
    pub fn begin_transform(&mut self, handle: HandleKind, point: Point) -> bool {
        self.selection.begin_transform(&self.scene, handle, point)
    }

    pub fn update_transform(&mut self, point: Point, keep_aspect_ratio: bool) {
        let changed = self
            .selection
            .update_transform(&mut self.scene, point, keep_aspect_ratio);
        for id in changed {
            self.node_changed(id);
        }
    }

    /// Finish the transform gesture, recording one step if one was active.
    pub fn end_transform(&mut self) -> bool {
        if !self.selection.end_transform() {
            return false;
        }
        self.snapshot();
        true
    }

    // --- Drag ---

    fn drag_start(&mut self, node: NodeId) {
        if self.scene.role(node) == Some(NodeRole::Shape) {
            self.dragging = Some(node);
        }
    }

    fn drag_move(&mut self, node: NodeId, position: Point) {
        if self.dragging != Some(node) {
            return;
        }
        let Some(shape) = self.scene.get_mut(node) else {
            return;
        };
        shape.set_position(position);

        if self.config.smart_guides {
            let matched = match self.scene.bounds(node) {
                Some(moving) => compute_guides(
                    moving,
                    &guide_candidates(&self.scene, node),
                    self.config.guide_threshold,
                ),
                None => Default::default(),
            };
            if matched.is_empty() {
                self.guides.clear(&mut self.scene);
            } else {
                let aligned = position + matched.snapped_delta();
                if let Some(shape) = self.scene.get_mut(node) {
                    shape.set_position(aligned);
                }
                let viewport = self.camera.visible_world_rect();
                self.guides.show(&mut self.scene, &matched, viewport);
            }
        }
        self.node_changed(node);
    }

    fn drag_end(&mut self, node: NodeId) {
        self.guides.clear(&mut self.scene);
        if self.dragging.take() != Some(node) {
            return;
        }
        if self.config.grid_snap {
            if let Some(shape) = self.scene.get_mut(node) {
                let snapped = snap_to_grid(shape.position(), self.config.grid_size);
                shape.set_position(snapped.point);
            }
        }
        self.node_changed(node);
        self.snapshot();
    }

    // --- Pointer ---

    fn pointer_down(&mut self, point: Point, additive: bool) {
        let hit = self.scene.hit_test(point, 0.0);

        // Visible anchors sit on the handles of a selected node and win.
        if let Some(anchor) = hit
            .filter(|id| self.scene.role(*id) == Some(NodeRole::Anchor))
            .and_then(|id| self.anchors.anchor_for_drawable(id))
        {
            self.anchors.begin_connecting(&mut self.scene, anchor);
            return;
        }

        let tolerance = HANDLE_HIT_TOLERANCE / self.camera.zoom;
        if let Some(handle) = self.selection.hit_test_handle(&self.scene, point, tolerance) {
            self.begin_transform(handle, point);
            return;
        }

        let Some(hit) = hit else {
            self.clear_selection();
            return;
        };
        match self.scene.role(hit) {
            Some(NodeRole::Shape) if additive => self.add_to_selection(hit),
            Some(NodeRole::Shape) => self.select(hit),
            _ => {}
        }
    }

    fn pointer_move(&mut self, point: Point, keep_aspect_ratio: bool) {
        if self.anchors.is_connecting() {
            self.anchors.update_connecting(&mut self.scene, point);
        } else if self.selection.is_transforming() {
            self.update_transform(point, keep_aspect_ratio);
        }
    }

    fn pointer_up(&mut self, point: Point) {
        self.guides.clear(&mut self.scene);
        if self.anchors.is_connecting() {
            if let Some((start, end)) = self.anchors.end_connecting(&mut self.scene, point) {
                if let Err(e) = self.connect(start, end) {
                    log::debug!("Connection dropped: {e}");
                }
            }
        } else {
            self.end_transform();
        }
    }

    /// Pointer released outside the canvas: abandon any connection in
    /// progress and settle the rest. An active drag ends as if dropped.
    fn stage_pointer_up(&mut self) {
        self.anchors.cancel_connecting(&mut self.scene);
        self.guides.clear(&mut self.scene);
        if let Some(node) = self.dragging {
            self.drag_end(node);
        }
        self.end_transform();
    }

    /// Abort an in-progress connection without creating anything.
    pub fn cancel_connecting(&mut self) {
        self.anchors.cancel_connecting(&mut self.scene);
    }

    /// Dispatch one input event.
    pub fn handle_event(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::PointerEnter { node } => {
                if self.scene.role(node) == Some(NodeRole::Shape) {
                    self.anchors.pointer_enter(&mut self.scene, node);
                }
            }
            SceneEvent::PointerLeave { node } => self.anchors.pointer_leave(&mut self.scene, node),
            SceneEvent::PointerDown { point, additive } => self.pointer_down(point, additive),
            SceneEvent::PointerMove {
                point,
                keep_aspect_ratio,
            } => self.pointer_move(point, keep_aspect_ratio),
            SceneEvent::PointerUp { point } => self.pointer_up(point),
            SceneEvent::StagePointerUp => self.stage_pointer_up(),
            SceneEvent::DragStart { node } => self.drag_start(node),
            SceneEvent::DragMove { node, position } => self.drag_move(node, position),
            SceneEvent::DragEnd { node } => self.drag_end(node),
            SceneEvent::TransformEnd => {
                self.end_transform();
            }
        }
    }

    // --- Clipboard ---

    /// Copy the selected shapes and the connectors between them.
    /// Returns the number of shapes copied.
    pub fn copy_selected(&mut self) -> usize {
        let mut ids = self.selection.ids().to_vec();
        ids.sort_by_key(|id| self.scene.z_index(*id));
        let shapes: Vec<Shape> = ids
            .iter()
            .filter_map(|id| self.scene.get(*id).cloned())
            .collect();
        let connectors = self
            .connectors
            .to_json()
            .into_iter()
            .filter(|r| ids.contains(&r.start_shape_id) && ids.contains(&r.end_shape_id))
            .collect();
        let count = shapes.len();
        self.clipboard = Clipboard { shapes, connectors };
        count
    }

    pub fn has_clipboard(&self) -> bool {
        !self.clipboard.shapes.is_empty()
    }

    /// Paste the clipboard offset from the copied shapes. The pasted shapes
    /// become the selection; repeated pastes cascade.
    pub fn paste(&mut self) -> Vec<NodeId> {
        let mut clipboard = std::mem::take(&mut self.clipboard);
        let pasted = self.paste_from(&mut clipboard);
        self.clipboard = clipboard;
        pasted
    }

    /// Copy and paste the selection in one step, leaving the clipboard alone.
    pub fn duplicate_selected(&mut self) -> Vec<NodeId> {
        let saved = std::mem::take(&mut self.clipboard);
        self.copy_selected();
        let mut clipboard = std::mem::replace(&mut self.clipboard, saved);
        self.paste_from(&mut clipboard)
    }

    fn paste_from(&mut self, clipboard: &mut Clipboard) -> Vec<NodeId> {
        if clipboard.shapes.is_empty() {
            return Vec::new();
        }
        let offset = Vec2::new(self.config.paste_offset, self.config.paste_offset);
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let mut pasted = Vec::with_capacity(clipboard.shapes.len());

        for original in clipboard.shapes.iter_mut() {
            original.set_position(original.position() + offset);
            let mut shape = original.clone();
            shape.regenerate_id();
            if self.config.grid_snap {
                let snapped = snap_to_grid(shape.position(), self.config.grid_size);
                shape.set_position(snapped.point);
            }
            let id = self.scene.insert(shape, NodeRole::Shape);
            self.anchors.attach(&mut self.scene, id);
            remap.insert(original.id(), id);
            pasted.push(id);
        }

        for record in &clipboard.connectors {
            let (Some(start), Some(end)) = (
                remap.get(&record.start_shape_id),
                remap.get(&record.end_shape_id),
            ) else {
                continue;
            };
            if let Err(e) = self.connectors.create_connector(
                &mut self.scene,
                *start,
                *end,
                record.options.clone(),
            ) {
                log::warn!("Skipping pasted connector {}: {}", record.id, e);
            }
        }

        self.selection.set(pasted.clone());
        self.emit_selection();
        self.scene.request_redraw();
        self.snapshot();
        pasted
    }

    // --- Camera ---

    /// Set the zoom level. Returns true if it changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let changed = self.camera.set_zoom(zoom);
        if changed {
            self.emit(EditorEvent::ZoomChanged(self.camera.zoom));
        }
        changed
    }

    /// Zoom by `factor` keeping `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        let changed = self.camera.zoom_at(screen_point, factor);
        if changed {
            self.emit(EditorEvent::ZoomChanged(self.camera.zoom));
        }
        changed
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
        self.scene.request_redraw();
    }

    /// Size the viewport the guides and fit operations work against.
    pub fn set_viewport_size(&mut self, size: kurbo::Size) {
        self.camera.viewport = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::AnchorState;
    use crate::connectors::ConnectorKind;
    use crate::scene::Scene;
    use crate::shapes::{Ellipse, Rectangle};
    use serde_json::json;

    fn editor() -> Editor<Scene> {
        Editor::new(Scene::new(), EditorConfig::default())
    }

    fn rect(x: f64, y: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 100.0))
    }

    #[test]
    fn test_initial_state_is_recorded() {
        let editor = editor();
        assert_eq!(editor.history().len(), 1);
        assert!(!editor.can_undo());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_add_shape_snapshots_once_and_attaches_anchors() {
        let mut editor = editor();
        let id = editor.add_shape(rect(0.0, 0.0));
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.anchors().anchors(id).len(), 8);
        assert_eq!(editor.drain_events(), vec![EditorEvent::HistoryChanged]);
    }

    #[test]
    fn test_undo_redo_restores_shapes_with_ids() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(300.0, 0.0));
        editor.connect(a, b).unwrap();

        assert!(editor.undo());
        assert!(editor.connectors().is_empty());
        assert!(editor.scene().contains(b));

        assert!(editor.undo());
        assert!(!editor.scene().contains(b));
        assert!(editor.scene().contains(a));
        // Anchors of the removed node are gone too.
        assert_eq!(editor.scene().ids_with_role(NodeRole::Anchor).len(), 8);

        assert!(editor.redo());
        assert!(editor.redo());
        assert_eq!(editor.connectors().len(), 1);
        assert!(!editor.redo());
    }

    #[test]
    fn test_restore_clears_selection() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.select(a);
        editor.drain_events();
        editor.undo();
        assert!(editor.selected().is_empty());
        assert!(
            editor
                .drain_events()
                .contains(&EditorEvent::SelectionChanged(Vec::new()))
        );
    }

    #[test]
    fn test_selection_events() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(200.0, 0.0));
        editor.drain_events();

        editor.select(a);
        editor.add_to_selection(b);
        editor.add_to_selection(b);
        editor.clear_selection();
        editor.clear_selection();

        assert_eq!(
            editor.drain_events(),
            vec![
                EditorEvent::SelectionChanged(vec![a]),
                EditorEvent::SelectionChanged(vec![a, b]),
                EditorEvent::SelectionChanged(vec![]),
                EditorEvent::SelectionChanged(vec![]),
            ]
        );
    }

    #[test]
    fn test_reselect_still_notifies() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.select(a);
        editor.drain_events();

        editor.select(a);
        assert_eq!(editor.drain_events(), vec![EditorEvent::SelectionChanged(vec![a])]);
    }

    #[test]
    fn test_select_ignores_non_shapes() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let anchor = editor.anchors().anchors(a)[0].drawable;
        editor.select(anchor);
        assert!(editor.selected().is_empty());
    }

    #[test]
    fn test_delete_selected_cascades_connectors() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(300.0, 0.0));
        let c = editor.add_shape(rect(0.0, 300.0));
        editor.connect(a, b).unwrap();
        editor.connect(b, c).unwrap();
        editor.connect(a, c).unwrap();
        let before = editor.history().len();

        editor.select(b);
        assert_eq!(editor.delete_selected(), 1);

        assert!(!editor.scene().contains(b));
        assert_eq!(editor.connectors().len(), 1);
        assert!(editor.selected().is_empty());
        assert_eq!(editor.history().len(), before + 1);
        assert_eq!(editor.scene().ids_with_role(NodeRole::Connector).len(), 1);
    }

    #[test]
    fn test_delete_with_empty_selection_is_noop() {
        let mut editor = editor();
        editor.add_shape(rect(0.0, 0.0));
        assert_eq!(editor.delete_selected(), 0);
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_update_property_applies_to_all_selected() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(200.0, 0.0));
        editor.select_all();
        editor.update_property("fill", &json!("#ff0000")).unwrap();

        for id in [a, b] {
            assert_eq!(editor.scene().get(id).unwrap().attr("fill"), Some(json!("#ff0000")));
        }
        assert_eq!(editor.history().len(), 4);
    }

    #[test]
    fn test_update_property_rejects_bad_value_without_snapshot() {
        let mut editor = editor();
        editor.add_shape(rect(0.0, 0.0));
        editor.select_all();
        assert!(editor.update_property("strokeWidth", &json!("wide")).is_err());
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_update_position_width_sets_scale() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(300.0, 0.0));
        editor.connect(a, b).unwrap();
        editor.select(a);
        editor.update_position("width", &json!(200.0)).unwrap();

        let shape = editor.scene().get(a).unwrap();
        assert!((shape.transform().scale_x - 2.0).abs() < 1e-9);
        assert!((editor.scene().bounds(a).unwrap().width() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_snaps_to_grid_and_records_once() {
        let mut editor = Editor::new(
            Scene::new(),
            EditorConfig {
                grid_snap: true,
                smart_guides: false,
                ..EditorConfig::default()
            },
        );
        let a = editor.add_shape(rect(0.0, 0.0));
        let before = editor.history().len();

        editor.handle_event(SceneEvent::DragStart { node: a });
        editor.handle_event(SceneEvent::DragMove {
            node: a,
            position: Point::new(31.0, 12.0),
        });
        editor.handle_event(SceneEvent::DragMove {
            node: a,
            position: Point::new(53.0, 78.0),
        });
        assert_eq!(editor.history().len(), before);
        editor.handle_event(SceneEvent::DragEnd { node: a });

        assert_eq!(editor.scene().get(a).unwrap().position(), Point::new(60.0, 80.0));
        assert_eq!(editor.history().len(), before + 1);
    }

    #[test]
    fn test_drag_shows_and_clears_guides() {
        let mut editor = editor();
        editor.add_shape(rect(0.0, 0.0));
        let moving = editor.add_shape(Shape::Rectangle(Rectangle::new(
            Point::new(400.0, 400.0),
            50.0,
            50.0,
        )));

        editor.handle_event(SceneEvent::DragStart { node: moving });
        editor.handle_event(SceneEvent::DragMove {
            node: moving,
            position: Point::new(103.0, 400.0),
        });
        assert!(!editor.guides().is_empty());
        // Aligned exactly on the other shape's right edge.
        assert!((editor.scene().bounds(moving).unwrap().x0 - 100.0).abs() < 1e-9);

        editor.handle_event(SceneEvent::DragEnd { node: moving });
        assert!(editor.guides().is_empty());
        assert!(editor.scene().ids_with_role(NodeRole::Guide).is_empty());
    }

    #[test]
    fn test_stage_pointer_up_ends_drag() {
        let mut editor = Editor::new(
            Scene::new(),
            EditorConfig {
                grid_snap: true,
                ..EditorConfig::default()
            },
        );
        editor.add_shape(rect(0.0, 0.0));
        let moving = editor.add_shape(Shape::Rectangle(Rectangle::new(
            Point::new(400.0, 400.0),
            50.0,
            50.0,
        )));
        let before = editor.history().len();

        editor.handle_event(SceneEvent::DragStart { node: moving });
        editor.handle_event(SceneEvent::DragMove {
            node: moving,
            position: Point::new(103.0, 407.0),
        });
        assert!(!editor.scene().ids_with_role(NodeRole::Guide).is_empty());

        editor.handle_event(SceneEvent::StagePointerUp);
        assert!(editor.scene().ids_with_role(NodeRole::Guide).is_empty());
        assert_eq!(editor.scene().get(moving).unwrap().position(), Point::new(100.0, 400.0));
        assert_eq!(editor.history().len(), before + 1);

        // The drag is over; a late DragEnd records nothing.
        editor.handle_event(SceneEvent::DragEnd { node: moving });
        assert_eq!(editor.history().len(), before + 1);
    }

    #[test]
    fn test_drag_reroutes_connectors() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(300.0, 0.0));
        let id = editor.connect(a, b).unwrap();

        editor.handle_event(SceneEvent::DragStart { node: b });
        editor.handle_event(SceneEvent::DragMove {
            node: b,
            position: Point::new(0.0, 500.0),
        });
        editor.handle_event(SceneEvent::DragEnd { node: b });

        let drawable = editor.connectors().get(id).unwrap().drawable;
        let bounds = editor.scene().bounds(drawable).unwrap();
        // Now attached bottom of A to top of B.
        assert!((bounds.y0 - 100.0).abs() < 1e-6);
        assert!((bounds.y1 - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_gesture_records_once() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.select(a);
        let before = editor.history().len();

        editor.handle_event(SceneEvent::PointerDown {
            point: Point::new(100.0, 100.0),
            additive: false,
        });
        editor.handle_event(SceneEvent::PointerMove {
            point: Point::new(150.0, 150.0),
            keep_aspect_ratio: false,
        });
        editor.handle_event(SceneEvent::PointerMove {
            point: Point::new(200.0, 200.0),
            keep_aspect_ratio: false,
        });
        assert_eq!(editor.history().len(), before);
        editor.handle_event(SceneEvent::PointerUp {
            point: Point::new(200.0, 200.0),
        });

        let bounds = editor.scene().bounds(a).unwrap();
        assert!((bounds.width() - 200.0).abs() < 1e-6);
        assert_eq!(editor.history().len(), before + 1);
    }

    #[test]
    fn test_pointer_down_on_empty_space_clears_selection() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.handle_event(SceneEvent::PointerDown {
            point: Point::new(50.0, 50.0),
            additive: false,
        });
        assert_eq!(editor.selected(), &[a]);
        editor.handle_event(SceneEvent::PointerDown {
            point: Point::new(900.0, 900.0),
            additive: false,
        });
        assert!(editor.selected().is_empty());
    }

    #[test]
    fn test_hover_shows_anchors() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.handle_event(SceneEvent::PointerEnter { node: a });
        assert_eq!(editor.anchors().state(a), AnchorState::Visible);
        editor.handle_event(SceneEvent::PointerLeave { node: a });
        assert_eq!(editor.anchors().state(a), AnchorState::Hidden);
    }

    #[test]
    fn test_stage_pointer_up_cancels_connection() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.add_shape(rect(300.0, 0.0));
        editor.handle_event(SceneEvent::PointerEnter { node: a });
        editor.handle_event(SceneEvent::PointerDown {
            point: Point::new(100.0, 50.0),
            additive: false,
        });
        assert!(editor.anchors().is_connecting());

        editor.handle_event(SceneEvent::StagePointerUp);
        assert!(!editor.anchors().is_connecting());
        assert!(editor.connectors().is_empty());
        assert!(editor.scene().ids_with_role(NodeRole::Preview).is_empty());
    }

    #[test]
    fn test_connect_uses_default_kind() {
        let mut editor = Editor::new(
            Scene::new(),
            EditorConfig {
                default_connector: ConnectorKind::Arrow,
                ..EditorConfig::default()
            },
        );
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(rect(300.0, 0.0));
        let id = editor.connect(a, b).unwrap();
        assert_eq!(editor.connectors().get(id).unwrap().options.kind, ConnectorKind::Arrow);
        assert!(matches!(editor.connect(a, a), Err(SceneError::SelfConnection(_))));
    }

    #[test]
    fn test_paste_offsets_and_selects() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        let b = editor.add_shape(Shape::Ellipse(Ellipse::new(Point::new(400.0, 50.0), 50.0, 50.0)));
        editor.connect(a, b).unwrap();
        editor.select_all();
        assert_eq!(editor.copy_selected(), 2);

        let first = editor.paste();
        assert_eq!(first.len(), 2);
        assert_eq!(editor.selected(), first.as_slice());
        assert!(!first.contains(&a));
        assert_eq!(editor.scene().get(first[0]).unwrap().position(), Point::new(20.0, 20.0));
        assert_eq!(editor.connectors().len(), 2);

        let second = editor.paste();
        assert_eq!(editor.scene().get(second[0]).unwrap().position(), Point::new(40.0, 40.0));
    }

    #[test]
    fn test_duplicate_keeps_clipboard() {
        let mut editor = editor();
        let a = editor.add_shape(rect(0.0, 0.0));
        editor.select(a);
        editor.copy_selected();
        let dup = editor.duplicate_selected();
        assert_eq!(dup.len(), 1);

        let pasted = editor.paste();
        assert_eq!(editor.scene().get(pasted[0]).unwrap().position(), Point::new(20.0, 20.0));
    }

    #[test]
    fn test_zoom_is_part_of_history() {
        let mut editor = editor();
        assert!(editor.set_zoom(2.0));
        assert!(!editor.set_zoom(2.0));
        editor.add_shape(rect(0.0, 0.0));
        assert!(editor.set_zoom(3.0));
        editor.drain_events();

        editor.undo();
        assert_eq!(editor.camera().zoom, 1.0);
        assert!(editor.drain_events().contains(&EditorEvent::ZoomChanged(1.0)));
        editor.redo();
        assert_eq!(editor.camera().zoom, 2.0);
    }

    #[test]
    fn test_load_snapshot_resets_history() {
        let mut source = editor();
        let a = source.add_shape(rect(0.0, 0.0));
        let b = source.add_shape(rect(300.0, 0.0));
        source.connect(a, b).unwrap();
        let snapshot = source.current_snapshot();

        let mut target = editor();
        target.add_shape(rect(50.0, 50.0));
        target.load_snapshot(&snapshot);

        assert_eq!(target.history().len(), 1);
        assert!(!target.can_undo());
        assert_eq!(target.current_snapshot(), snapshot);
    }
}
