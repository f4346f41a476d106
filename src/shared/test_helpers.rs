//! In-memory stand-ins for the blob store and record store, with fault
//! injection, plus staging helpers backed by temporary directories.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::features::assets::AssetCoordinator;
use crate::modules::records::{
    Collection, Document, ElementStore, Filter, RecordStore, Sort, StoreError,
};
use crate::modules::staging::{StagedFile, StagingArea, UploadHandle};
use crate::modules::storage::{AssetKind, BlobStore, BlobStoreClient, BlobStoreError};
use crate::shared::constants::get_content_type_from_extension;

pub fn storage_config() -> StorageConfig {
    StorageConfig {
        upload_timeout: Duration::from_secs(5),
        delete_timeout: Duration::from_secs(1),
        delete_max_attempts: 3,
        staging_dir: std::env::temp_dir().join("campus-cms-test-staging"),
    }
}

/// Write `bytes` to `name` inside a fresh temporary directory
pub fn write_temp_file(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

pub fn staging_area() -> (TempDir, StagingArea) {
    let dir = TempDir::new().unwrap();
    let staging = StagingArea::new(dir.path());
    (dir, staging)
}

/// Stage a small file whose content type follows its extension
pub async fn staged_file(staging: &StagingArea, name: &str) -> StagedFile {
    let content_type = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(get_content_type_from_extension)
        .unwrap_or("application/octet-stream");

    staging
        .stage(UploadHandle {
            filename: name.to_string(),
            content_type: content_type.to_string(),
            bytes: format!("bytes of {}", name).into_bytes(),
        })
        .await
        .unwrap()
}

/// Number of files currently left in a staging directory
pub fn staged_count(staging: &StagingArea) -> usize {
    std::fs::read_dir(staging.root()).unwrap().count()
}

pub fn coordinator(blobs: &Arc<MemoryBlobStore>) -> AssetCoordinator {
    AssetCoordinator::new(Arc::new(BlobStoreClient::new(
        blobs.clone(),
        &storage_config(),
    )))
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (AssetKind, Vec<u8>)>>,
    upload_delay: Mutex<Duration>,
    failing_upload_kinds: Mutex<HashSet<AssetKind>>,
    failing_deletes: AtomicU32,
    deletes_broken: AtomicBool,
    exists_broken: AtomicBool,
    upload_calls: AtomicUsize,
    attempted_ids: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, storage_id: &str) -> bool {
        self.objects.lock().unwrap().contains_key(storage_id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn storage_ids(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(AtomicOrdering::SeqCst)
    }

    /// Storage ids of every upload attempt, failed ones included
    pub fn attempted_ids(&self) -> Vec<String> {
        self.attempted_ids.lock().unwrap().clone()
    }

    /// Uploads write the object and then stall for `delay`
    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = delay;
    }

    pub fn fail_uploads_of(&self, kind: AssetKind) {
        self.failing_upload_kinds.lock().unwrap().insert(kind);
    }

    /// The next `n` delete calls fail with a transport error
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, AtomicOrdering::SeqCst);
    }

    /// Every delete fails until turned off again
    pub fn break_deletes(&self, broken: bool) {
        self.deletes_broken.store(broken, AtomicOrdering::SeqCst);
    }

    pub fn break_exists_checks(&self, broken: bool) {
        self.exists_broken.store(broken, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        local_path: &Path,
        storage_id: &str,
        kind: AssetKind,
    ) -> Result<String, BlobStoreError> {
        self.upload_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.attempted_ids
            .lock()
            .unwrap()
            .push(storage_id.to_string());

        if self.failing_upload_kinds.lock().unwrap().contains(&kind) {
            return Err(BlobStoreError::Transport(format!(
                "injected {} upload failure",
                kind
            )));
        }

        let bytes = tokio::fs::read(local_path).await?;
        self.objects
            .lock()
            .unwrap()
            .insert(storage_id.to_string(), (kind, bytes));

        let delay = *self.upload_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(format!("http://blobs.test/campus/{}", storage_id))
    }

    async fn delete(&self, storage_id: &str, _kind: AssetKind) -> Result<(), BlobStoreError> {
        if self.deletes_broken.load(AtomicOrdering::SeqCst) {
            return Err(BlobStoreError::Transport("injected delete failure".into()));
        }
        let injected = self
            .failing_deletes
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok();
        if injected {
            return Err(BlobStoreError::Transport("injected delete failure".into()));
        }

        self.objects.lock().unwrap().remove(storage_id);
        Ok(())
    }

    async fn exists(&self, storage_id: &str) -> Result<bool, BlobStoreError> {
        if self.exists_broken.load(AtomicOrdering::SeqCst) {
            return Err(BlobStoreError::Transport("injected exists failure".into()));
        }
        Ok(self.contains(storage_id))
    }
}

/// Record store keeping serialized documents in insertion order
pub struct MemoryRecordStore<T> {
    documents: Mutex<Vec<Value>>,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    fail_pushes: AtomicBool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryRecordStore<T> {
    fn default() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            fail_inserts: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_pushes: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> MemoryRecordStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        let docs = self.documents.lock().unwrap();
        docs.iter()
            .find(|d| document_id(d) == Some(id))
            .map(|d| serde_json::from_value(d.clone()).unwrap())
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, AtomicOrdering::SeqCst);
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable(format!("injected {} failure", what)))
        } else {
            Ok(())
        }
    }
}

fn document_id(document: &Value) -> Option<Uuid> {
    document
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl<T: Document> RecordStore<T> for MemoryRecordStore<T> {
    async fn find(&self, filter: &Filter, sort: &Sort) -> Result<Vec<T>, StoreError> {
        let mut matching: Vec<Value> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();

        match sort {
            Sort::Newest => matching.reverse(),
            Sort::Oldest => {}
            Sort::Field { name, descending } => {
                matching.sort_by(|a, b| {
                    let ord = compare_values(a.get(name), b.get(name));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
        }

        matching
            .into_iter()
            .map(|d| serde_json::from_value(d).map_err(StoreError::from))
            .collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.get(id))
    }

    async fn insert(&self, document: &T) -> Result<(), StoreError> {
        Self::injected(&self.fail_inserts, "insert")?;
        let value = serde_json::to_value(document)?;
        self.documents.lock().unwrap().push(value);
        Ok(())
    }

    async fn update(&self, document: &T) -> Result<bool, StoreError> {
        Self::injected(&self.fail_updates, "update")?;
        let mut value = serde_json::to_value(document)?;
        let mut docs = self.documents.lock().unwrap();
        match docs.iter_mut().find(|d| document_id(d) == Some(document.id())) {
            Some(slot) => {
                if let Some(field) = T::ELEMENT_ARRAY {
                    let stored = slot.get(field).cloned().unwrap_or_else(|| Value::Array(vec![]));
                    value[field] = stored;
                }
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        Self::injected(&self.fail_deletes, "delete")?;
        let mut docs = self.documents.lock().unwrap();
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok(docs.len() != before)
    }
}

#[async_trait]
impl<T: Collection> ElementStore<T> for MemoryRecordStore<T> {
    async fn push_element(
        &self,
        parent_id: Uuid,
        element: &T::Element,
    ) -> Result<bool, StoreError> {
        Self::injected(&self.fail_pushes, "push")?;
        let value = serde_json::to_value(element)?;
        let mut docs = self.documents.lock().unwrap();
        let Some(parent) = docs.iter_mut().find(|d| document_id(d) == Some(parent_id)) else {
            return Ok(false);
        };

        let array = parent
            .as_object_mut()
            .ok_or_else(|| StoreError::Unavailable("document is not an object".into()))?
            .entry(T::ELEMENTS_FIELD)
            .or_insert_with(|| Value::Array(Vec::new()));
        match array.as_array_mut() {
            Some(items) => {
                items.push(value);
                Ok(true)
            }
            None => Err(StoreError::Unavailable(format!(
                "'{}' is not an array",
                T::ELEMENTS_FIELD
            ))),
        }
    }

    async fn pull_element(&self, parent_id: Uuid, element_id: Uuid) -> Result<bool, StoreError> {
        Self::injected(&self.fail_updates, "pull")?;
        let mut docs = self.documents.lock().unwrap();
        let Some(items) = docs
            .iter_mut()
            .find(|d| document_id(d) == Some(parent_id))
            .and_then(|d| d.get_mut(T::ELEMENTS_FIELD))
            .and_then(Value::as_array_mut)
        else {
            return Ok(false);
        };

        let before = items.len();
        items.retain(|e| document_id(e) != Some(element_id));
        Ok(items.len() != before)
    }
}
