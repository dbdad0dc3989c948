//! Change-detecting file writes.
//!
//! Every artifact and the report go through [`write_if_changed`]: content is
//! normalized to LF lines with one trailing newline, its SHA-256 digest is
//! compared with the file already on disk, and the file is replaced (temp file
//! + atomic rename) only on mismatch.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Normalize line endings: LF only, exactly one trailing newline.
pub fn normalize(content: &str) -> String {
    let mut normalized = content.lines().collect::<Vec<_>>().join("\n");
    normalized.push('\n');
    normalized
}

/// Render rules one per line, normalized.
pub fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut content = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    normalize(&content)
}

/// Hex-encoded SHA-256 of `data`.
pub fn digest(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Digest of the file at `path`, or `None` if it does not exist.
pub fn file_digest(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(digest(&data))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::write(path, e)),
    }
}

/// Write `content` (normalized) to `path` unless the file already holds it.
///
/// Returns `true` if the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    match stage_if_changed(path, content)? {
        Some(staged) => {
            staged.commit()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Stage `content` (normalized) in a sibling temp file unless `path` already
/// holds it.
///
/// Nothing at `path` changes until [`StagedFile::commit`]. Dropping the
/// returned value without committing removes the temp file.
pub fn stage_if_changed(path: &Path, content: &str) -> Result<Option<StagedFile>> {
    let normalized = normalize(content);
    let new_digest = digest(normalized.as_bytes());

    if file_digest(path)?.as_deref() == Some(new_digest.as_str()) {
        log::debug!("Unchanged: {:?}", path);
        return Ok(None);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }

    let staged = StagedFile {
        path: path.to_path_buf(),
        temp_path: temp_path(path),
        len: normalized.len(),
        committed: false,
    };
    let mut temp_file =
        fs::File::create(&staged.temp_path).map_err(|e| Error::write(&staged.temp_path, e))?;
    temp_file
        .write_all(normalized.as_bytes())
        .and_then(|_| temp_file.sync_all())
        .map_err(|e| Error::write(&staged.temp_path, e))?;

    Ok(Some(staged))
}

/// New content waiting in a temp file next to its destination.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    temp_path: PathBuf,
    len: usize,
    committed: bool,
}

impl StagedFile {
    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the destination with the staged content.
    pub fn commit(mut self) -> Result<PathBuf> {
        fs::rename(&self.temp_path, &self.path).map_err(|e| Error::write(&self.path, e))?;
        self.committed = true;
        log::info!("Wrote {:?} ({} bytes)", self.path, self.len);
        Ok(self.path.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Sibling temp file used for atomic replacement.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
