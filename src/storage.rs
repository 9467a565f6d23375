// Filesystem-backed download records
//
// No database: the downloads directory itself is the record store. A file
// present in the directory is a completed download; listing stats the
// directory on every call.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use time::OffsetDateTime;
use tracing::debug;

use crate::errors::EngineError;
use crate::models::{DownloadRecord, QualityLabel};

const MAX_TITLE_LEN: usize = 80;

#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
}

impl DownloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the downloads directory if missing. Called before any write.
    pub fn ensure_root(&self) -> Result<(), EngineError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Picks a filename for a new download: sanitized title + quality +
    /// epoch-millis, with a numeric bump if the path is somehow taken.
    pub fn reserve_path(
        &self,
        title: &str,
        quality: QualityLabel,
    ) -> Result<(PathBuf, String), EngineError> {
        self.ensure_root()?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let base = format!("{}_{}_{}", sanitize_title(title), quality, millis);

        let mut filename = format!("{base}.mp4");
        let mut bump = 1u32;
        while self.root.join(&filename).exists() {
            filename = format!("{base}_{bump}.mp4");
            bump += 1;
        }

        debug!(filename, "reserved download path");
        Ok((self.root.join(&filename), filename))
    }

    /// All completed downloads, newest first.
    pub fn list(&self) -> Result<Vec<DownloadRecord>, EngineError> {
        let mut records = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // A store that was never written to lists as empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            // Only finished downloads count as records.
            if !filename.ends_with(".mp4") {
                continue;
            }
            let created_at = metadata
                .modified()
                .map(OffsetDateTime::from)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);

            records.push(DownloadRecord {
                id: filename.clone(),
                title: title_from_filename(&filename),
                filename,
                byte_size: metadata.len(),
                created_at,
            });
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Absolute path of a stored download, for a transport to serve.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, EngineError> {
        let path = self.root.join(checked_filename(filename)?);
        if !path.is_file() {
            return Err(EngineError::NotFound(filename.to_string()));
        }
        Ok(path)
    }

    pub fn delete(&self, filename: &str) -> Result<(), EngineError> {
        let path = self.path_for(filename)?;
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Rejects path-traversal attempts before the name touches the filesystem.
fn checked_filename(filename: &str) -> Result<&str, EngineError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(EngineError::NotFound(filename.to_string()));
    }
    Ok(filename)
}

/// Collapses a title to `[A-Za-z0-9_.-]`, capped at 80 characters.
pub(crate) fn sanitize_title(title: &str) -> String {
    let mut out: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    out.truncate(MAX_TITLE_LEN);
    if out.is_empty() {
        out.push_str("video");
    }
    out
}

/// Best-effort human title for the listing, recovered from the stored
/// filename (`title_quality_millis[.bump].mp4`).
fn title_from_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(".mp4").unwrap_or(filename);
    let parts: Vec<&str> = stem.split('_').collect();

    // Drop trailing collision bump, millis and quality tokens when present.
    let mut end = parts.len();
    if end > 1 && parts[end - 1].chars().all(|c| c.is_ascii_digit()) {
        end -= 1;
    }
    if end > 1 && parts[end - 1].chars().all(|c| c.is_ascii_digit()) {
        end -= 1;
    }
    // `unknown` is the label's own spelling for an untagged rendition.
    if end > 1
        && (QualityLabel::parse(parts[end - 1]) != QualityLabel::Unknown
            || parts[end - 1] == "unknown")
    {
        end -= 1;
    }

    let title = parts[..end].join(" ");
    if title.is_empty() {
        stem.to_string()
    } else {
        title
    }
}
