use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::shared::validation::sanitize_filename;

/// Raw upload handed over by the HTTP layer
#[derive(Debug)]
pub struct UploadHandle {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Directory holding request-scoped copies of uploaded bytes
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the staging directory if missing
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload to disk and hand back the guard that owns it
    pub async fn stage(&self, upload: UploadHandle) -> std::io::Result<StagedFile> {
        let path = self.root.join(format!(
            "{}-{}",
            Uuid::new_v4(),
            sanitize_filename(&upload.filename)
        ));

        // Guard first: a write that fails partway is removed on drop
        let staged = StagedFile {
            path,
            original_filename: upload.filename,
            content_type: upload.content_type,
            size: upload.bytes.len(),
            released: false,
        };
        tokio::fs::write(&staged.path, &upload.bytes).await?;

        debug!(
            "Staged {} ({} bytes) at {}",
            staged.original_filename,
            staged.size,
            staged.path.display()
        );
        Ok(staged)
    }

    /// Remove a staged path. Missing files are not an error; other failures
    /// are logged and swallowed.
    pub async fn release(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Released staged file {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to release staged file {}: {}", path.display(), e),
        }
    }
}

/// A file sitting in the staging area.
///
/// Removed by `release()` or, failing that, when dropped. Either way the
/// file does not outlive the request that staged it.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_filename: String,
    content_type: String,
    size: usize,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn release(mut self) {
        StagingArea::release(&self.path).await;
        self.released = true;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released staged file {} on drop", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to release staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handle(name: &str) -> UploadHandle {
        UploadHandle {
            filename: name.to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_stage_writes_file_inside_root() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());

        let staged = staging.stage(handle("../../annual report.pdf")).await.unwrap();

        assert!(staged.path().starts_with(dir.path()));
        assert!(staged.path().exists());
        assert!(staged
            .path()
            .to_string_lossy()
            .ends_with("-annual_report.pdf"));
        assert_eq!(staged.size(), 8);
        staged.release().await;
    }

    #[tokio::test]
    async fn test_release_removes_file() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());
        let staged = staging.stage(handle("a.pdf")).await.unwrap();
        let path = staged.path().to_path_buf();

        staged.release().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());
        let staged = staging.stage(handle("a.pdf")).await.unwrap();
        let path = staged.path().to_path_buf();

        drop(staged);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_stage_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("missing");
        let staging = StagingArea::new(&root);

        let result = staging.stage(handle("a.pdf")).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let staging = StagingArea::new(dir.path());
        let staged = staging.stage(handle("a.pdf")).await.unwrap();
        let path = staged.path().to_path_buf();

        StagingArea::release(&path).await;
        StagingArea::release(&path).await;
        // Guard drop after an external release is a no-op too
        drop(staged);
        StagingArea::release(&dir.path().join("never-staged.pdf")).await;

        assert!(!path.exists());
    }
}
