//! Auto-save functionality for scene persistence.
//!
//! Periodically writes the current scene to the last-session slot and, when a
//! named project is open, to that project.

use crate::config::EditorConfig;
use crate::history::SceneSnapshot;
use crate::storage::{FileStorage, Project, ProjectLibrary, Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Manages automatic scene persistence.
pub struct AutoSaveManager<S: Storage> {
    library: Arc<ProjectLibrary<S>>,
    interval: Duration,
    last_save: Option<Instant>,
    /// Whether the scene has unsaved changes.
    dirty: bool,
    /// Named project currently being edited, as `(id, name)`.
    current_project: Option<(String, String)>,
}

impl<S: Storage> AutoSaveManager<S> {
    /// Create a new auto-save manager over the given library.
    pub fn new(library: Arc<ProjectLibrary<S>>) -> Self {
        Self {
            library,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            current_project: None,
        }
    }

    /// Create a manager using the configured auto-save interval.
    pub fn with_config(library: Arc<ProjectLibrary<S>>, config: &EditorConfig) -> Self {
        let mut manager = Self::new(library);
        manager.set_interval(Duration::from_secs(config.autosave_interval_secs));
        manager
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the scene as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set the named project that saves should also update.
    pub fn set_project(&mut self, project: Option<(String, String)>) {
        self.current_project = project;
    }

    pub fn project_id(&self) -> Option<&str> {
        self.current_project.as_ref().map(|(id, _)| id.as_str())
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and the interval has elapsed. Returns true if a save
    /// was performed.
    pub async fn maybe_save(&mut self, snapshot: &SceneSnapshot) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }

        self.save(snapshot).await?;
        Ok(true)
    }

    /// Force save immediately.
    pub async fn save(&mut self, snapshot: &SceneSnapshot) -> StorageResult<()> {
        if let Some((id, name)) = &self.current_project {
            self.library.overwrite_project(id, name, snapshot).await?;
        }
        self.library.save_last_session(snapshot).await?;
        log::debug!("Auto-saved scene with {} shapes", snapshot.shapes.len());

        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Open a named project; later saves update it.
    pub async fn load(&mut self, id: &str) -> StorageResult<Option<Project>> {
        let project = self.library.load_project(id).await?;
        if let Some(project) = &project {
            self.current_project = Some((project.id.clone(), project.name.clone()));
            self.dirty = false;
            self.last_save = Some(Instant::now());
        }
        Ok(project)
    }

    /// Restore the last session, if one was saved.
    pub async fn load_last(&mut self) -> StorageResult<Option<SceneSnapshot>> {
        let snapshot = self.library.get_last_session().await?;
        if snapshot.is_some() {
            self.dirty = false;
            self.last_save = Some(Instant::now());
        }
        Ok(snapshot)
    }

    pub fn library(&self) -> &Arc<ProjectLibrary<S>> {
        &self.library
    }
}

/// Convenience function to create an auto-save manager over the default
/// file location.
pub fn create_autosave_manager() -> StorageResult<AutoSaveManager<FileStorage>> {
    let storage = Arc::new(FileStorage::default_location()?);
    Ok(AutoSaveManager::new(Arc::new(ProjectLibrary::new(storage))))
}
