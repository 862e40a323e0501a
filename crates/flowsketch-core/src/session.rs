//! Project and session persistence wired to an editor and a notifier.
//!
//! Storage failures never touch the scene; they are reported through the
//! [`Notifier`] and the call returns a neutral value.

use crate::editor::Editor;
use crate::notify::{NotifyIcon, NotifyOptions, Notifier};
use crate::scene::SceneGraph;
use crate::storage::{ProjectInfo, ProjectLibrary, Storage};
use std::sync::Arc;

pub struct Session<S: Storage, N: Notifier> {
    library: Arc<ProjectLibrary<S>>,
    notifier: N,
}

impl<S: Storage, N: Notifier> Session<S, N> {
    pub fn new(library: Arc<ProjectLibrary<S>>, notifier: N) -> Self {
        Self { library, notifier }
    }

    pub fn library(&self) -> &Arc<ProjectLibrary<S>> {
        &self.library
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn report(&self, message: &str, icon: NotifyIcon) {
        self.notifier.notify(message, NotifyOptions::with_icon(icon));
    }

    /// Load the last session into `editor`. Returns true if one was found.
    pub async fn restore_last_session<G: SceneGraph>(&self, editor: &mut Editor<G>) -> bool {
        match self.library.get_last_session().await {
            Ok(Some(snapshot)) => {
                editor.load_snapshot(&snapshot);
                log::info!("Restored last session");
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.report(&format!("Could not restore last session: {e}"), NotifyIcon::Error);
                false
            }
        }
    }

    pub async fn save_last_session<G: SceneGraph>(&self, editor: &Editor<G>) -> bool {
        match self.library.save_last_session(&editor.current_snapshot()).await {
            Ok(()) => true,
            Err(e) => {
                self.report(&format!("Could not save session: {e}"), NotifyIcon::Error);
                false
            }
        }
    }

    pub async fn list_projects(&self) -> Vec<ProjectInfo> {
        match self.library.list_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                self.report(&format!("Could not list projects: {e}"), NotifyIcon::Error);
                Vec::new()
            }
        }
    }

    /// Save the editor's scene as a new named project.
    pub async fn save_project<G: SceneGraph>(&self, editor: &Editor<G>, name: &str) -> Option<String> {
        match self.library.save_project(name, &editor.current_snapshot()).await {
            Ok(id) => {
                self.report(&format!("Saved \"{name}\""), NotifyIcon::Success);
                Some(id)
            }
            Err(e) => {
                self.report(&format!("Could not save \"{name}\": {e}"), NotifyIcon::Error);
                None
            }
        }
    }

    /// Open a project into `editor`. The scene is untouched on failure.
    pub async fn open_project<G: SceneGraph>(&self, editor: &mut Editor<G>, id: &str) -> bool {
        match self.library.load_project(id).await {
            Ok(Some(project)) => {
                editor.load_snapshot(&project.data);
                log::info!("Opened project {} ({id})", project.name);
                true
            }
            Ok(None) => {
                self.report("Project not found", NotifyIcon::Warning);
                false
            }
            Err(e) => {
                self.report(&format!("Could not open project: {e}"), NotifyIcon::Error);
                false
            }
        }
    }

    /// Delete a project after the user confirms. Returns true if deleted.
    pub async fn delete_project(&self, id: &str, name: &str) -> bool {
        if !self.notifier.confirm(&format!("Delete \"{name}\"?")).await {
            return false;
        }
        match self.library.delete_project(id).await {
            Ok(()) => true,
            Err(e) => {
                self.report(&format!("Could not delete \"{name}\": {e}"), NotifyIcon::Error);
                false
            }
        }
    }
}
