use std::io::{Cursor, Read, Seek, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::ResumeStoreError;

/// The single entry held by a resume archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Writes a Deflate zip holding exactly one entry, `entry_name`, with `bytes`.
/// Returns the underlying writer once the central directory is written.
pub fn write_archive<W: Write + Seek>(writer: W, entry_name: &str, bytes: &[u8]) -> ZipResult<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)?;
    zip.write_all(bytes)?;
    zip.finish()
}

/// Reads the single entry back out of archive bytes.
pub fn read_archive(archive: &[u8]) -> Result<ResumeFile, ResumeStoreError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ResumeStoreError::CorruptArchive(e.to_string()))?;
    if zip.len() != 1 {
        return Err(ResumeStoreError::CorruptArchive(format!(
            "expected exactly one entry, found {}",
            zip.len()
        )));
    }

    let mut entry = zip
        .by_index(0)
        .map_err(|e| ResumeStoreError::CorruptArchive(e.to_string()))?;
    let filename = entry.name().to_string();
    let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| ResumeStoreError::CorruptArchive(e.to_string()))?;

    Ok(ResumeFile { filename, bytes })
}
