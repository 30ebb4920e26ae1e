use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`ResumeStore`](super::ResumeStore).
#[derive(Debug, Error)]
pub enum ResumeStoreError {
    #[error("Storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resume archive {0} not found")]
    NotFound(String),

    #[error("Corrupt resume archive: {0}")]
    CorruptArchive(String),

    #[error("Storage task failed: {0}")]
    TaskJoin(String),
}
