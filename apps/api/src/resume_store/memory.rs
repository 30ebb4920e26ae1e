use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::archive::write_archive;
use super::{
    archive_file_name, content_hash, entry_name, hash_from_archive_path, ResumeStore,
    ResumeStoreError, StoredResume,
};

const MEMORY_ROOT: &str = "memory://resumes";

/// In-memory resume store for tests. Archives are real zips keyed by hash.
#[derive(Default)]
pub struct MemoryResumeStore {
    archives: RwLock<HashMap<String, Bytes>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn archive_count(&self) -> usize {
        self.archives.read().await.len()
    }

    /// Drops an archive, as if the storage medium had been cleared.
    pub async fn evict(&self, content_hash: &str) -> bool {
        self.archives.write().await.remove(content_hash).is_some()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn store(
        &self,
        bytes: Bytes,
        original_filename: &str,
    ) -> Result<StoredResume, ResumeStoreError> {
        let content_hash = content_hash(&bytes);
        let archive_path = format!("{MEMORY_ROOT}/{}", archive_file_name(&content_hash));

        let mut archives = self.archives.write().await;
        if !archives.contains_key(&content_hash) {
            let archive = write_archive(Cursor::new(Vec::new()), &entry_name(original_filename), &bytes)
                .map_err(|e| ResumeStoreError::Io {
                    path: archive_path.clone().into(),
                    source: std::io::Error::other(e),
                })?
                .into_inner();
            archives.insert(content_hash.clone(), Bytes::from(archive));
        }

        Ok(StoredResume {
            content_hash,
            archive_path,
        })
    }

    async fn retrieve(&self, archive_path: &str) -> Result<Bytes, ResumeStoreError> {
        let archives = self.archives.read().await;
        hash_from_archive_path(archive_path)
            .and_then(|hash| archives.get(hash).cloned())
            .ok_or_else(|| ResumeStoreError::NotFound(archive_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume_store::read_archive;

    #[tokio::test]
    async fn test_memory_store_deduplicates_by_content() {
        let store = MemoryResumeStore::new();

        let a = store.store(Bytes::from_static(b"A"), "a.pdf").await.unwrap();
        let again = store.store(Bytes::from_static(b"A"), "again.pdf").await.unwrap();
        store.store(Bytes::from_static(b"B"), "b.pdf").await.unwrap();

        assert_eq!(a, again);
        assert_eq!(store.archive_count().await, 2);
    }

    #[tokio::test]
    async fn test_memory_store_round_trips_and_evicts() {
        let store = MemoryResumeStore::new();
        let stored = store.store(Bytes::from_static(b"cv"), "cv.pdf").await.unwrap();

        let file = read_archive(&store.retrieve(&stored.archive_path).await.unwrap()).unwrap();
        assert_eq!(file.filename, "cv.pdf");
        assert_eq!(file.bytes, b"cv");

        assert!(store.evict(&stored.content_hash).await);
        let err = store.retrieve(&stored.archive_path).await.unwrap_err();
        assert!(matches!(err, ResumeStoreError::NotFound(_)));
    }
}
