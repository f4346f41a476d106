use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::shared::validation::normalize_folder_segment;

/// Kind of binary asset kept in the blob store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Document,
    Video,
    /// Resolved from the file extension at upload time. Never persisted.
    Auto,
}

impl AssetKind {
    /// Resolve `Auto` from a file extension; concrete kinds are returned unchanged
    pub fn resolve(self, extension: &str) -> AssetKind {
        match self {
            AssetKind::Auto => match extension.to_ascii_lowercase().as_str() {
                "pdf" | "doc" | "docx" => AssetKind::Document,
                "mp4" | "webm" | "mov" => AssetKind::Video,
                _ => AssetKind::Image,
            },
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Document => "document",
            AssetKind::Video => "video",
            AssetKind::Auto => "auto",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub storage_id: String,
    pub url: String,
    pub kind: AssetKind,
}

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage capability.
///
/// Implementations store the bytes at `local_path` under the caller-chosen
/// `storage_id` and return the URL the object is reachable at.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        local_path: &Path,
        storage_id: &str,
        kind: AssetKind,
    ) -> Result<String, BlobStoreError>;

    /// Deleting an object that does not exist is not an error.
    async fn delete(&self, storage_id: &str, kind: AssetKind) -> Result<(), BlobStoreError>;

    async fn exists(&self, storage_id: &str) -> Result<bool, BlobStoreError>;
}

/// Build a folder path from a root and owner-derived segments.
///
/// Every segment is normalized, so the same department or category always
/// maps to the same folder.
pub fn folder_path(root: &str, segments: &[&str]) -> String {
    std::iter::once(normalize_folder_segment(root))
        .chain(segments.iter().map(|s| normalize_folder_segment(s)))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_path_normalizes_each_segment() {
        assert_eq!(
            folder_path("achievements", &["Computer Science"]),
            "achievements/computer_science"
        );
        assert_eq!(
            folder_path("gallery", &["Sports Day", "2024/25"]),
            "gallery/sports_day/2024_25"
        );
        assert_eq!(folder_path("testimonials", &[]), "testimonials");
    }

    #[test]
    fn test_folder_path_is_reproducible() {
        let a = folder_path("syllabus", &["E.C.E."]);
        let b = folder_path("syllabus", &["e c e"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_auto_kind_resolution() {
        assert_eq!(AssetKind::Auto.resolve("PDF"), AssetKind::Document);
        assert_eq!(AssetKind::Auto.resolve("mp4"), AssetKind::Video);
        assert_eq!(AssetKind::Auto.resolve("png"), AssetKind::Image);
        assert_eq!(AssetKind::Image.resolve("pdf"), AssetKind::Image);
    }
}
