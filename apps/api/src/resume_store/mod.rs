//! Resume Store: content-addressed archive of uploaded resume files.
//!
//! Every upload is fingerprinted with SHA-256 and kept as a single-entry zip
//! named `{sha256}.zip`. Byte-identical uploads share one archive no matter
//! what they were called or when they arrived.
//!
//! `Tracker` holds an `Arc<dyn ResumeStore>`: [`FsResumeStore`] in production,
//! [`MemoryResumeStore`] in tests.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub mod archive;
pub mod error;
pub mod fs;
pub mod memory;

pub use archive::{read_archive, ResumeFile};
pub use error::ResumeStoreError;
pub use fs::FsResumeStore;
pub use memory::MemoryResumeStore;

pub const ARCHIVE_EXTENSION: &str = "zip";

/// Entry name used when the uploader supplied no usable filename.
const FALLBACK_ENTRY_NAME: &str = "resume";

/// Fingerprint and location of a stored resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredResume {
    pub content_hash: String,
    pub archive_path: String,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Archives `bytes` under their content hash. Storing content that is
    /// already present writes nothing and returns the existing location.
    async fn store(
        &self,
        bytes: Bytes,
        original_filename: &str,
    ) -> Result<StoredResume, ResumeStoreError>;

    /// Returns the raw archive bytes at `archive_path`.
    async fn retrieve(&self, archive_path: &str) -> Result<Bytes, ResumeStoreError>;
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn archive_file_name(content_hash: &str) -> String {
    format!("{content_hash}.{ARCHIVE_EXTENSION}")
}

/// Extracts the content hash from an archive path whose file name is
/// `<sha256>.zip`. Anything else yields `None`.
pub fn hash_from_archive_path(archive_path: &str) -> Option<&str> {
    let name = Path::new(archive_path).file_name()?.to_str()?;
    let hash = name
        .strip_suffix(ARCHIVE_EXTENSION)?
        .strip_suffix('.')?;
    is_content_hash(hash).then_some(hash)
}

fn is_content_hash(candidate: &str) -> bool {
    candidate.len() == 64
        && candidate
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Name of the single archive entry: the uploaded filename without any
/// directory components.
pub fn entry_name(original_filename: &str) -> String {
    let base = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => FALLBACK_ENTRY_NAME.to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_matches_known_digest() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_from_archive_path_accepts_store_layout() {
        let hash = content_hash(b"resume");
        let path = format!("resumes/{}", archive_file_name(&hash));
        assert_eq!(hash_from_archive_path(&path), Some(hash.as_str()));
    }

    #[test]
    fn test_hash_from_archive_path_rejects_foreign_names() {
        assert_eq!(hash_from_archive_path("resumes/cv.zip"), None);
        assert_eq!(hash_from_archive_path("../../etc/passwd"), None);
        assert_eq!(hash_from_archive_path(""), None);

        let upper = content_hash(b"x").to_uppercase();
        assert_eq!(hash_from_archive_path(&format!("{upper}.zip")), None);

        let hash = content_hash(b"x");
        assert_eq!(hash_from_archive_path(&format!("{hash}.tar")), None);
        assert_eq!(hash_from_archive_path(&format!("{hash}zip")), None);
    }

    #[test]
    fn test_entry_name_strips_directories() {
        assert_eq!(entry_name("cv.pdf"), "cv.pdf");
        assert_eq!(entry_name("/home/me/cv.pdf"), "cv.pdf");
        assert_eq!(entry_name("C:\\Users\\me\\cv final.pdf"), "cv final.pdf");
        assert_eq!(entry_name("../../cv.pdf"), "cv.pdf");
    }

    #[test]
    fn test_entry_name_falls_back_when_blank() {
        assert_eq!(entry_name(""), "resume");
        assert_eq!(entry_name("   "), "resume");
        assert_eq!(entry_name("uploads/"), "resume");
        assert_eq!(entry_name(".."), "resume");
    }
}
