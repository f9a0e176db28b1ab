//! Request-scoped temporary storage for uploads.
//!
//! Filenames are request-unique (UUID v4 plus the original extension), so
//! concurrent requests never collide and no locking is needed. Every file is
//! wrapped in a [`TempFile`] guard that deletes it on drop, which keeps the
//! cleanup invariant even when a request is aborted mid-pipeline.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Staging area for uploaded media and derived audio.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh request-unique name.
    pub async fn stage(&self, bytes: &[u8], extension: &str) -> std::io::Result<TempFile> {
        let file = self.reserve(extension);
        tokio::fs::write(file.path(), bytes).await?;
        tracing::debug!(
            path = %file.path().display(),
            bytes = bytes.len(),
            "staged upload"
        );
        Ok(file)
    }

    /// Reserve a fresh path without creating the file, for subprocess
    /// output. The guard still removes whatever ends up there.
    pub fn reserve(&self, extension: &str) -> TempFile {
        let name = format!("{}.{}", Uuid::new_v4(), extension);
        TempFile {
            path: self.dir.join(name),
        }
    }
}

/// Owns one temp path and deletes it on drop. Cleanup failure is logged and
/// never surfaced to the caller.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp file")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_writes_and_drop_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_path_buf()).unwrap();

        let staged = store.stage(b"RIFF....WAVE", "wav").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "wav");

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_staged_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_path_buf()).unwrap();

        let a = store.stage(b"a", "mp3").await.unwrap();
        let b = store.stage(b"b", "mp3").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_reserve_drop_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_path_buf()).unwrap();

        let reserved = store.reserve("wav");
        assert!(!reserved.path().exists());
        drop(reserved); // must not panic or log an error for NotFound
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = UploadStore::new(nested.clone()).unwrap();
        assert!(store.dir().exists());
        assert_eq!(store.dir(), nested);
    }
}
