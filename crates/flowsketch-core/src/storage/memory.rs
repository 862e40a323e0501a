//! In-memory storage implementation.

use super::{BoxFuture, Project, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
///
/// Projects are held as serialized JSON. An optional byte quota makes writes
/// fail with [`StorageError::QuotaExceeded`] once the total would exceed it,
/// the way browser storage does.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that holds at most `bytes` of serialized data.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            documents: RwLock::default(),
            quota: Some(bytes),
        }
    }

    /// Total serialized size currently stored.
    pub fn used_bytes(&self) -> usize {
        self.documents
            .read()
            .map(|docs| docs.values().map(String::len).sum())
            .unwrap_or(0)
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, project: &Project) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let json = project.to_json();
        Box::pin(async move {
            let json = json?;
            let mut docs = self.documents.write().map_err(lock_error)?;
            if let Some(quota) = self.quota {
                let others: usize = docs
                    .iter()
                    .filter(|(key, _)| **key != id)
                    .map(|(_, doc)| doc.len())
                    .sum();
                if others + json.len() > quota {
                    return Err(StorageError::QuotaExceeded);
                }
            }
            docs.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Project>> {
        let id = id.to_string();
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            let json = docs.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            Project::from_json(json)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(lock_error)?;
            docs.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            Ok(docs.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            Ok(docs.contains_key(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SceneSnapshot;
    use crate::storage::block_on;

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: format!("Project {id}"),
            saved_at: 0,
            data: SceneSnapshot::default(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        block_on(storage.save("test", &project("test"))).unwrap();
        let loaded = block_on(storage.load("test")).unwrap();
        assert_eq!(loaded, project("test"));
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!block_on(storage.exists("test")).unwrap());
        block_on(storage.save("test", &project("test"))).unwrap();
        assert!(block_on(storage.exists("test")).unwrap());
        block_on(storage.delete("test")).unwrap();
        assert!(!block_on(storage.exists("test")).unwrap());
    }

    #[test]
    fn test_list() {
        let storage = MemoryStorage::new();
        block_on(storage.save("doc1", &project("doc1"))).unwrap();
        block_on(storage.save("doc2", &project("doc2"))).unwrap();

        let list = block_on(storage.list()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"doc1".to_string()));
        assert!(list.contains(&"doc2".to_string()));
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let size = project("a").to_json().unwrap().len();
        let storage = MemoryStorage::with_quota(size * 2);
        block_on(storage.save("a", &project("a"))).unwrap();
        block_on(storage.save("b", &project("b"))).unwrap();
        // Overwriting an existing key only counts the new value.
        block_on(storage.save("a", &project("a"))).unwrap();

        let result = block_on(storage.save("c", &project("c")));
        assert!(matches!(result, Err(StorageError::QuotaExceeded)));
        assert_eq!(storage.used_bytes(), size * 2);
    }
}
