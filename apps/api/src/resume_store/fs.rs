use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task;
use tracing::{debug, info, warn};

use super::archive::write_archive;
use super::{
    archive_file_name, content_hash, entry_name, hash_from_archive_path, ResumeStore,
    ResumeStoreError, StoredResume,
};

/// Resume archives kept as `{root}/{sha256}.zip` on the local filesystem.
///
/// New archives are written to a temporary file inside `root` and linked into
/// place without overwriting, so readers only ever see complete archives, even
/// with several processes sharing the directory.
pub struct FsResumeStore {
    root: PathBuf,
    locks: HashLocks,
}

impl FsResumeStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ResumeStoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| ResumeStoreError::Io {
            path: root.clone(),
            source,
        })?;
        info!("Resume store ready at {}", root.display());
        Ok(Self {
            root,
            locks: HashLocks::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn archive_location(&self, content_hash: &str) -> PathBuf {
        self.root.join(archive_file_name(content_hash))
    }
}

#[async_trait]
impl ResumeStore for FsResumeStore {
    async fn store(
        &self,
        bytes: Bytes,
        original_filename: &str,
    ) -> Result<StoredResume, ResumeStoreError> {
        let content_hash = content_hash(&bytes);
        let location = self.archive_location(&content_hash);
        let archive_path = location.display().to_string();

        // Serializes check-then-write for identical content within this process.
        let _guard = self.locks.lock(&content_hash).await;

        let root = self.root.clone();
        let entry = entry_name(original_filename);
        let size = bytes.len();
        let created = task::spawn_blocking(move || write_if_absent(&root, &location, &entry, &bytes))
            .await
            .map_err(|e| ResumeStoreError::TaskJoin(e.to_string()))??;

        if created {
            info!("Archived resume {content_hash} ({size} bytes) at {archive_path}");
        } else {
            debug!("Resume {content_hash} already archived, skipping write");
        }

        Ok(StoredResume {
            content_hash,
            archive_path,
        })
    }

    async fn retrieve(&self, archive_path: &str) -> Result<Bytes, ResumeStoreError> {
        let Some(hash) = hash_from_archive_path(archive_path) else {
            warn!("Refusing to resolve non-archive path {archive_path:?}");
            return Err(ResumeStoreError::NotFound(archive_path.to_string()));
        };

        let location = self.archive_location(hash);
        match tokio::fs::read(&location).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Resume archive missing at {}", location.display());
                Err(ResumeStoreError::NotFound(archive_path.to_string()))
            }
            Err(source) => Err(ResumeStoreError::Io {
                path: location,
                source,
            }),
        }
    }
}

/// Writes the archive unless one already exists at `target`.
/// Returns `true` when this call created it.
fn write_if_absent(
    root: &Path,
    target: &Path,
    entry_name: &str,
    bytes: &[u8],
) -> Result<bool, ResumeStoreError> {
    if target.exists() {
        return Ok(false);
    }

    let io_error = |source: io::Error| ResumeStoreError::Io {
        path: target.to_path_buf(),
        source,
    };

    // Dropping `temp` on any early return deletes the partial file.
    let mut temp = NamedTempFile::new_in(root).map_err(io_error)?;
    write_archive(temp.as_file_mut(), entry_name, bytes).map_err(|e| match e {
        zip::result::ZipError::Io(source) => io_error(source),
        other => io_error(io::Error::other(other)),
    })?;
    temp.as_file().sync_all().map_err(io_error)?;

    match temp.persist_noclobber(target) {
        Ok(_) => {
            sync_dir(root).map_err(|source| ResumeStoreError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            Ok(true)
        }
        // Another process finished the same content first.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io_error(e.error)),
    }
}

/// Flushes `dir`'s entries so a newly linked archive survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

/// Directory handles cannot be synced this way outside unix.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// One async mutex per content hash currently being stored.
#[derive(Default)]
struct HashLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl HashLocks {
    async fn lock(&self, content_hash: &str) -> HashLockGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(content_hash.to_string()).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;
        HashLockGuard {
            locks: self,
            content_hash: content_hash.to_string(),
            slot,
            guard: Some(guard),
        }
    }
}

struct HashLockGuard<'a> {
    locks: &'a HashLocks,
    content_hash: String,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for HashLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the slot: nobody is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.content_hash);
        }
    }
}
