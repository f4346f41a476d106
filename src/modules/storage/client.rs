//! Blob store client used by the asset coordinator
//!
//! Adds the guarantees the raw store does not give: bounded time per call,
//! retried deletes and reconciliation of uploads whose outcome is unknown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::modules::storage::blob_store::{AssetKind, BlobStore, BlobStoreError, StoredObject};

const DELETE_BACKOFF_STEP: Duration = Duration::from_millis(200);

pub struct BlobStoreClient {
    store: Arc<dyn BlobStore>,
    upload_timeout: Duration,
    delete_timeout: Duration,
    delete_max_attempts: u32,
}

impl BlobStoreClient {
    pub fn new(store: Arc<dyn BlobStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            upload_timeout: config.upload_timeout,
            delete_timeout: config.delete_timeout,
            delete_max_attempts: config.delete_max_attempts.max(1),
        }
    }

    /// Allocate a storage id `<folder>/<uuid>.<ext>` for a local file
    fn allocate_storage_id(folder: &str, extension: &str) -> String {
        if extension.is_empty() {
            format!("{}/{}", folder, Uuid::new_v4())
        } else {
            format!("{}/{}.{}", folder, Uuid::new_v4(), extension)
        }
    }

    /// Upload a staged file into `folder`.
    ///
    /// The storage id is chosen before the transfer starts. If the call times
    /// out the object may still have been written, so the id is deleted
    /// before the timeout is reported.
    pub async fn upload(
        &self,
        local_path: &Path,
        folder: &str,
        kind: AssetKind,
    ) -> Result<StoredObject, BlobStoreError> {
        let extension = local_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let kind = kind.resolve(&extension);
        let storage_id = Self::allocate_storage_id(folder, &extension);

        match tokio::time::timeout(
            self.upload_timeout,
            self.store.put(local_path, &storage_id, kind),
        )
        .await
        {
            Ok(Ok(url)) => {
                debug!("Uploaded {} as {} ({})", local_path.display(), storage_id, kind);
                Ok(StoredObject {
                    storage_id,
                    url,
                    kind,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    storage_id = %storage_id,
                    folder = %folder,
                    "Upload timed out after {:?}; reconciling possibly written object",
                    self.upload_timeout
                );
                self.reconcile(&storage_id, folder, kind).await;
                Err(BlobStoreError::Timeout(self.upload_timeout))
            }
        }
    }

    /// Check for an object whose upload outcome is unknown and delete it if
    /// it may exist. A failed check counts as "may exist".
    async fn reconcile(&self, storage_id: &str, folder: &str, kind: AssetKind) {
        match self.exists(storage_id).await {
            Ok(false) => {
                debug!("Timed out upload {} left nothing behind", storage_id);
                return;
            }
            Ok(true) => debug!("Timed out upload {} was written; deleting", storage_id),
            Err(e) => debug!(
                "Existence check of {} failed, deleting anyway: {}",
                storage_id, e
            ),
        }

        if let Err(e) = self.remove(storage_id, kind).await {
            warn!(
                storage_id = %storage_id,
                folder = %folder,
                "Reconciliation of timed out upload failed, object may be orphaned: {}",
                e
            );
        }
    }

    /// Delete an object, retrying transient failures
    pub async fn remove(&self, storage_id: &str, kind: AssetKind) -> Result<(), BlobStoreError> {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(
                self.delete_timeout,
                self.store.delete(storage_id, kind),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BlobStoreError::Timeout(self.delete_timeout)),
            };

            match result {
                Ok(()) | Err(BlobStoreError::NotFound(_)) => {
                    debug!("Deleted object {}", storage_id);
                    return Ok(());
                }
                Err(e) if attempt >= self.delete_max_attempts => return Err(e),
                Err(e) => {
                    debug!(
                        "Delete of {} failed (attempt {}/{}): {}",
                        storage_id, attempt, self.delete_max_attempts, e
                    );
                    tokio::time::sleep(DELETE_BACKOFF_STEP * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Whether an object currently exists in the store
    pub async fn exists(&self, storage_id: &str) -> Result<bool, BlobStoreError> {
        match tokio::time::timeout(self.delete_timeout, self.store.exists(storage_id)).await {
            Ok(result) => result,
            Err(_) => Err(BlobStoreError::Timeout(self.delete_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{storage_config, write_temp_file, MemoryBlobStore};

    #[tokio::test]
    async fn test_upload_allocates_id_under_folder() {
        let store = Arc::new(MemoryBlobStore::new());
        let client = BlobStoreClient::new(store.clone(), &storage_config());
        let (_dir, path) = write_temp_file("poster.PNG", b"png-bytes");

        let stored = client
            .upload(&path, "gallery/sports", AssetKind::Auto)
            .await
            .unwrap();

        assert!(stored.storage_id.starts_with("gallery/sports/"));
        assert!(stored.storage_id.ends_with(".png"));
        assert_eq!(stored.kind, AssetKind::Image);
        assert!(store.contains(&stored.storage_id));
    }

    #[tokio::test]
    async fn test_timed_out_upload_is_reconciled() {
        let store = Arc::new(MemoryBlobStore::new());
        store.set_upload_delay(Duration::from_secs(5));
        let mut config = storage_config();
        config.upload_timeout = Duration::from_millis(50);
        let client = BlobStoreClient::new(store.clone(), &config);
        let (_dir, path) = write_temp_file("slow.pdf", b"%PDF");

        let result = client.upload(&path, "syllabus/cs", AssetKind::Document).await;

        assert!(matches!(result, Err(BlobStoreError::Timeout(_))));
        let attempted = store.attempted_ids();
        assert_eq!(attempted.len(), 1);
        assert!(attempted[0].starts_with("syllabus/cs/"));
        assert!(!client.exists(&attempted[0]).await.unwrap());
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_upload_is_deleted_even_if_exists_check_fails() {
        let store = Arc::new(MemoryBlobStore::new());
        store.set_upload_delay(Duration::from_secs(5));
        store.break_exists_checks(true);
        let mut config = storage_config();
        config.upload_timeout = Duration::from_millis(50);
        let client = BlobStoreClient::new(store.clone(), &config);
        let (_dir, path) = write_temp_file("slow.jpg", b"jpg");

        let result = client.upload(&path, "faculty", AssetKind::Image).await;

        assert!(matches!(result, Err(BlobStoreError::Timeout(_))));
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_exists_follows_upload_and_remove() {
        let store = Arc::new(MemoryBlobStore::new());
        let client = BlobStoreClient::new(store, &storage_config());
        let (_dir, path) = write_temp_file("a.pdf", b"%PDF");

        let stored = client
            .upload(&path, "syllabus/cs", AssetKind::Auto)
            .await
            .unwrap();
        assert!(client.exists(&stored.storage_id).await.unwrap());

        client.remove(&stored.storage_id, stored.kind).await.unwrap();
        assert!(!client.exists(&stored.storage_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_retries_until_success() {
        let store = Arc::new(MemoryBlobStore::new());
        let client = BlobStoreClient::new(store.clone(), &storage_config());
        let (_dir, path) = write_temp_file("a.jpg", b"jpg");
        let stored = client.upload(&path, "faculty", AssetKind::Image).await.unwrap();

        store.fail_next_deletes(2);
        client.remove(&stored.storage_id, stored.kind).await.unwrap();

        assert!(!store.contains(&stored.storage_id));
    }

    #[tokio::test]
    async fn test_remove_gives_up_after_max_attempts() {
        let store = Arc::new(MemoryBlobStore::new());
        let client = BlobStoreClient::new(store.clone(), &storage_config());
        let (_dir, path) = write_temp_file("a.jpg", b"jpg");
        let stored = client.upload(&path, "faculty", AssetKind::Image).await.unwrap();

        store.fail_next_deletes(10);
        let result = client.remove(&stored.storage_id, stored.kind).await;

        assert!(matches!(result, Err(BlobStoreError::Transport(_))));
        assert!(store.contains(&stored.storage_id));
    }

    #[tokio::test]
    async fn test_remove_missing_object_is_ok() {
        let store = Arc::new(MemoryBlobStore::new());
        let client = BlobStoreClient::new(store, &storage_config());

        client
            .remove("faculty/does-not-exist.jpg", AssetKind::Image)
            .await
            .unwrap();
    }
}
