//! Named projects and the last-session slot on top of a [`Storage`] backend.

use super::{Project, Storage, StorageError, StorageResult};
use crate::history::SceneSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Key of the implicit "last session" entry.
pub const LAST_SESSION_KEY: &str = "__last_session__";

/// Listing entry for a stored project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub saved_at: u64,
}

/// Project catalogue with quota handling.
///
/// When a write fails with [`StorageError::QuotaExceeded`], the oldest named
/// project is evicted and the write is retried once.
pub struct ProjectLibrary<S: Storage> {
    storage: Arc<S>,
    last_stamp: AtomicU64,
}

impl<S: Storage> ProjectLibrary<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            last_stamp: AtomicU64::new(0),
        }
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Wall-clock milliseconds, forced to increase on every call.
    fn stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// The scene saved by the last session, if any.
    pub async fn get_last_session(&self) -> StorageResult<Option<SceneSnapshot>> {
        match self.storage.load(LAST_SESSION_KEY).await {
            Ok(project) => Ok(Some(project.data)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(StorageError::Serialization(e)) => {
                log::warn!("Ignoring unreadable last session: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save_last_session(&self, snapshot: &SceneSnapshot) -> StorageResult<()> {
        let project = Project {
            id: LAST_SESSION_KEY.to_string(),
            name: String::new(),
            saved_at: self.stamp(),
            data: snapshot.clone(),
        };
        self.write(&project).await
    }

    /// Named projects, newest first. Unreadable entries are skipped.
    pub async fn list_projects(&self) -> StorageResult<Vec<ProjectInfo>> {
        let mut projects = Vec::new();
        for id in self.storage.list().await? {
            if id == LAST_SESSION_KEY {
                continue;
            }
            match self.storage.load(&id).await {
                Ok(project) => projects.push(ProjectInfo {
                    id,
                    name: project.name,
                    saved_at: project.saved_at,
                }),
                Err(StorageError::Serialization(e)) | Err(StorageError::NotFound(e)) => {
                    log::warn!("Skipping project {id}: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        projects.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(projects)
    }

    /// Store `snapshot` as a new project and return its id.
    pub async fn save_project(&self, name: &str, snapshot: &SceneSnapshot) -> StorageResult<String> {
        let id = Uuid::new_v4().to_string();
        self.overwrite_project(&id, name, snapshot).await?;
        Ok(id)
    }

    /// Replace the project stored under `id`.
    pub async fn overwrite_project(
        &self,
        id: &str,
        name: &str,
        snapshot: &SceneSnapshot,
    ) -> StorageResult<()> {
        let project = Project {
            id: id.to_string(),
            name: name.to_string(),
            saved_at: self.stamp(),
            data: snapshot.clone(),
        };
        self.write(&project).await?;
        log::info!("Saved project {name} ({id})");
        Ok(())
    }

    pub async fn load_project(&self, id: &str) -> StorageResult<Option<Project>> {
        match self.storage.load(id).await {
            Ok(project) => Ok(Some(project)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_project(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    async fn write(&self, project: &Project) -> StorageResult<()> {
        match self.storage.save(&project.id, project).await {
            Err(StorageError::QuotaExceeded) => {
                let Some(oldest) = self.oldest_project(&project.id).await? else {
                    return Err(StorageError::QuotaExceeded);
                };
                log::warn!("Storage quota exceeded, evicting project {oldest}");
                self.storage.delete(&oldest).await?;
                self.storage.save(&project.id, project).await
            }
            other => other,
        }
    }

    async fn oldest_project(&self, exclude: &str) -> StorageResult<Option<String>> {
        Ok(self
            .list_projects()
            .await?
            .into_iter()
            .filter(|p| p.id != exclude)
            .min_by_key(|p| p.saved_at)
            .map(|p| p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, block_on};

    fn library(storage: MemoryStorage) -> ProjectLibrary<MemoryStorage> {
        ProjectLibrary::new(Arc::new(storage))
    }

    /// Serialized size of a one-letter-named project with an empty scene.
    fn unit_size() -> usize {
        Project {
            id: Uuid::nil().to_string(),
            name: "a".to_string(),
            saved_at: 1_700_000_000_000,
            data: SceneSnapshot::default(),
        }
        .to_json()
        .unwrap()
        .len()
    }

    #[test]
    fn test_last_session_round_trip() {
        let lib = library(MemoryStorage::new());
        assert_eq!(block_on(lib.get_last_session()).unwrap(), None);

        let snapshot = SceneSnapshot {
            zoom: 2.0,
            ..SceneSnapshot::default()
        };
        block_on(lib.save_last_session(&snapshot)).unwrap();
        assert_eq!(block_on(lib.get_last_session()).unwrap(), Some(snapshot));
        // The last session is not a named project.
        assert!(block_on(lib.list_projects()).unwrap().is_empty());
    }

    #[test]
    fn test_projects_listed_newest_first() {
        let lib = library(MemoryStorage::new());
        let first = block_on(lib.save_project("first", &SceneSnapshot::default())).unwrap();
        let second = block_on(lib.save_project("second", &SceneSnapshot::default())).unwrap();

        let list = block_on(lib.list_projects()).unwrap();
        let ids: Vec<_> = list.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(list[0].saved_at > list[1].saved_at);
    }

    #[test]
    fn test_load_and_delete_project() {
        let lib = library(MemoryStorage::new());
        let id = block_on(lib.save_project("diagram", &SceneSnapshot::default())).unwrap();

        let project = block_on(lib.load_project(&id)).unwrap().unwrap();
        assert_eq!(project.name, "diagram");

        block_on(lib.delete_project(&id)).unwrap();
        assert!(block_on(lib.load_project(&id)).unwrap().is_none());
        assert!(block_on(lib.load_project("missing")).unwrap().is_none());
    }

    #[test]
    fn test_quota_evicts_oldest_and_retries() {
        let unit = unit_size();
        let lib = library(MemoryStorage::with_quota(unit * 2 + unit / 2));

        let oldest = block_on(lib.save_project("a", &SceneSnapshot::default())).unwrap();
        let kept = block_on(lib.save_project("b", &SceneSnapshot::default())).unwrap();
        let newest = block_on(lib.save_project("c", &SceneSnapshot::default())).unwrap();

        let ids: Vec<_> = block_on(lib.list_projects())
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![newest, kept]);
        assert!(block_on(lib.load_project(&oldest)).unwrap().is_none());
    }

    #[test]
    fn test_quota_error_when_nothing_to_evict() {
        let lib = library(MemoryStorage::with_quota(unit_size() / 2));
        let result = block_on(lib.save_project("a", &SceneSnapshot::default()));
        assert!(matches!(result, Err(StorageError::QuotaExceeded)));
    }
}
