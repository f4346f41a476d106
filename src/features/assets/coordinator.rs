//! Asset lifecycle coordinator
//!
//! Keeps staged files, blob store objects and record documents in step.
//! Every operation ends fully applied or fully unapplied; the only state
//! that can survive a failure is an orphaned blob, and that is always
//! logged with its storage id, folder and owning record.
//!
//! Ordering rules:
//! - uploads happen before any record is written
//! - a record is written before the assets it stopped referencing are deleted
//! - on delete, assets go first and the record last

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::assets::entity::{AssetEntity, AssetSet, AssetSlot, ElementOwner};
use crate::features::assets::models::{AssetRef, OpContext, Operation};
use crate::modules::records::{Collection, ElementStore, RecordStore};
use crate::modules::staging::{StagedFile, UploadIntake};
use crate::modules::storage::BlobStoreClient;

pub struct AssetCoordinator {
    blobs: Arc<BlobStoreClient>,
}

impl AssetCoordinator {
    pub fn new(blobs: Arc<BlobStoreClient>) -> Self {
        Self { blobs }
    }

    /// Create a record together with its assets
    pub async fn create<T, S>(&self, store: &S, intake: UploadIntake) -> Result<T>
    where
        T: AssetEntity,
        S: RecordStore<T> + ?Sized,
    {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::Create);

        T::DESCRIPTOR
            .validate_create(&intake)
            .map_err(|e| ctx.wrap(e))?;
        let draft = T::parse_draft(&intake).map_err(|e| ctx.wrap(e))?;
        let folder = T::draft_folder(&draft);

        let (_, files) = intake.into_parts();
        let assets = self
            .upload_all(&ctx, T::DESCRIPTOR.slots, &folder, files)
            .await?;
        let created = assets.refs();

        let record = match T::assemble(draft, assets) {
            Ok(record) => record,
            Err(e) => return Err(self.compensate(&ctx, &folder, ctx.wrap(e), created).await),
        };
        let ctx = ctx.with_record(record.id());

        // Nothing may run between the uploads and this write
        if let Err(e) = store.insert(&record).await {
            let primary = ctx.persistence(e);
            return Err(self.compensate(&ctx, &folder, primary, created).await);
        }

        info!(
            "{}: created with {} asset(s) in '{}'",
            ctx,
            created.len(),
            folder
        );
        Ok(record)
    }

    /// Apply field changes and swap any supplied assets.
    ///
    /// New assets are uploaded first; if that fails the record and its old
    /// assets are untouched. Assets the record stops referencing are deleted
    /// only after the updated record is persisted.
    pub async fn update<T, S>(&self, store: &S, id: Uuid, intake: UploadIntake) -> Result<T>
    where
        T: AssetEntity,
        S: RecordStore<T> + ?Sized,
    {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::Update).with_record(id);

        T::DESCRIPTOR
            .validate_files(&intake)
            .map_err(|e| ctx.wrap(e))?;
        let patch = T::parse_patch(&intake).map_err(|e| ctx.wrap(e))?;

        let mut record: T = self.load(&ctx, store, id).await?;
        let folder = record.folder();
        let before: Vec<AssetRef> = record.owned_assets().into_iter().cloned().collect();

        let (_, files) = intake.into_parts();
        let assets = self
            .upload_all(&ctx, T::DESCRIPTOR.slots, &folder, files)
            .await?;
        let created = assets.refs();

        if let Err(e) = record.apply(patch, assets) {
            return Err(self.compensate(&ctx, &folder, ctx.wrap(e), created).await);
        }

        match store.update(&record).await {
            Ok(true) => {}
            Ok(false) => {
                let primary = ctx.not_found();
                return Err(self.compensate(&ctx, &folder, primary, created).await);
            }
            Err(e) => {
                let primary = ctx.persistence(e);
                return Err(self.compensate(&ctx, &folder, primary, created).await);
            }
        }

        let still_owned: HashSet<String> = record
            .owned_assets()
            .into_iter()
            .map(|a| a.storage_id.clone())
            .collect();
        let displaced: Vec<AssetRef> = before
            .into_iter()
            .filter(|a| !still_owned.contains(&a.storage_id))
            .collect();
        let orphans = self.delete_assets(&ctx, &folder, displaced).await;

        info!(
            "{}: updated, {} new asset(s), {} orphan(s)",
            ctx,
            created.len(),
            orphans
        );

        // Elements pushed or pulled while this update ran are only in the stored copy
        match store.find_by_id(id).await {
            Ok(Some(stored)) => Ok(stored),
            Ok(None) => Ok(record),
            Err(e) => {
                debug!("{}: re-read after update failed: {}", ctx, e);
                Ok(record)
            }
        }
    }

    /// Replace the asset in one slot with a newly staged file
    pub async fn replace_asset<T, S>(
        &self,
        store: &S,
        id: Uuid,
        slot: &str,
        file: StagedFile,
    ) -> Result<T>
    where
        T: AssetEntity,
        S: RecordStore<T> + ?Sized,
    {
        let Some(slot) = T::DESCRIPTOR.slot(slot) else {
            let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::Update).with_record(id);
            return Err(ctx.wrap(AppError::Validation(format!(
                "unknown asset slot '{}'",
                slot
            ))));
        };

        let intake = UploadIntake::default().with_file(slot.name, file);
        self.update(store, id, intake).await
    }

    /// Delete a record and every asset it owns, embedded elements included.
    ///
    /// Assets are deleted first. A failed asset delete is logged and does not
    /// stop the others or the record delete.
    pub async fn delete<T, S>(&self, store: &S, id: Uuid) -> Result<T>
    where
        T: AssetEntity,
        S: RecordStore<T> + ?Sized,
    {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::Delete).with_record(id);

        let record: T = self.load(&ctx, store, id).await?;
        let folder = record.folder();
        let assets: Vec<AssetRef> = record.owned_assets().into_iter().cloned().collect();
        let total = assets.len();
        let orphans = self.delete_assets(&ctx, &folder, assets).await;

        match store.delete_by_id(id).await {
            Ok(true) => {
                info!(
                    "{}: deleted with {} asset(s), {} orphan(s)",
                    ctx, total, orphans
                );
                Ok(record)
            }
            Ok(false) => Err(ctx.not_found()),
            Err(e) => Err(ctx.persistence(format!(
                "assets already deleted but record remains: {}",
                e
            ))),
        }
    }

    /// Upload one element and append it to the parent's array
    pub async fn append_element<T, S>(
        &self,
        store: &S,
        parent_id: Uuid,
        intake: UploadIntake,
    ) -> Result<T::Element>
    where
        T: ElementOwner,
        S: ElementStore<T> + ?Sized,
    {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::AppendElement)
            .with_record(parent_id);
        let slot = T::ELEMENT.slot;

        T::ELEMENT.validate(&intake).map_err(|e| ctx.wrap(e))?;
        let draft = T::parse_element(&intake).map_err(|e| ctx.wrap(e))?;

        let parent: T = self.load(&ctx, store, parent_id).await?;
        let folder = parent.element_folder();

        let (_, files) = intake.into_parts();
        let mut assets = self
            .upload_all(&ctx, std::slice::from_ref(&slot), &folder, files)
            .await?;
        let created = assets.refs();

        let asset = match assets.require(slot.name) {
            Ok(asset) => asset,
            Err(e) => return Err(self.compensate(&ctx, &folder, ctx.wrap(e), created).await),
        };
        let element = T::assemble_element(draft, asset);

        match store.push_element(parent_id, &element).await {
            Ok(true) => {
                info!(
                    "{}: appended element {}",
                    ctx,
                    T::element_id(&element)
                );
                Ok(element)
            }
            Ok(false) => {
                let primary = ctx.not_found();
                Err(self.compensate(&ctx, &folder, primary, created).await)
            }
            Err(e) => {
                let primary = ctx.persistence(e);
                Err(self.compensate(&ctx, &folder, primary, created).await)
            }
        }
    }

    /// Delete an element's asset and pull the element from the parent's array
    pub async fn remove_element<T, S>(
        &self,
        store: &S,
        parent_id: Uuid,
        element_id: Uuid,
    ) -> Result<T::Element>
    where
        T: ElementOwner,
        S: ElementStore<T> + ?Sized,
    {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::RemoveElement)
            .with_record(parent_id);

        let parent: T = self.load(&ctx, store, parent_id).await?;
        let element = parent.find_element(element_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("{}: element {} does not exist", ctx, element_id))
        })?;

        let asset = T::element_asset(&element).clone();
        self.delete_assets(&ctx, &parent.element_folder(), vec![asset])
            .await;

        match store.pull_element(parent_id, element_id).await {
            Ok(true) => {
                info!("{}: removed element {}", ctx, element_id);
                Ok(element)
            }
            Ok(false) => Err(AppError::NotFound(format!(
                "{}: element {} does not exist",
                ctx, element_id
            ))),
            Err(e) => Err(ctx.persistence(e)),
        }
    }

    async fn load<T, S>(&self, ctx: &OpContext, store: &S, id: Uuid) -> Result<T>
    where
        T: AssetEntity,
        S: RecordStore<T> + ?Sized,
    {
        store
            .find_by_id(id)
            .await
            .map_err(|e| ctx.persistence(e))?
            .ok_or_else(|| ctx.not_found())
    }

    /// Upload every staged file into `folder`.
    ///
    /// Each staged file is released right after its upload attempt, and any
    /// files not reached are released before returning. On the first failure
    /// all objects uploaded by this call are deleted again.
    async fn upload_all(
        &self,
        ctx: &OpContext,
        slots: &[AssetSlot],
        folder: &str,
        files: Vec<(String, StagedFile)>,
    ) -> Result<AssetSet> {
        let mut uploaded = AssetSet::default();
        let mut failure = None;
        let mut pending = files.into_iter();

        for (field, file) in pending.by_ref() {
            let Some(slot) = slots.iter().find(|s| s.name == field) else {
                debug!("{}: ignoring file for unknown slot '{}'", ctx, field);
                file.release().await;
                continue;
            };

            let result = self.blobs.upload(file.path(), folder, slot.kind).await;
            file.release().await;

            match result {
                Ok(stored) => {
                    debug!(
                        "{}: uploaded '{}' as {}",
                        ctx, slot.name, stored.storage_id
                    );
                    uploaded.insert(slot.name, stored.into());
                }
                Err(e) => {
                    failure = Some(ctx.storage(format!("upload of '{}' failed: {}", slot.name, e)));
                    break;
                }
            }
        }

        for (_, file) in pending {
            file.release().await;
        }

        match failure {
            None => Ok(uploaded),
            Some(primary) => Err(self
                .compensate(ctx, folder, primary, uploaded.refs())
                .await),
        }
    }

    /// Delete objects created by a failed operation.
    ///
    /// Returns `primary` unchanged when every delete succeeds, otherwise
    /// wraps it together with the storage ids left behind.
    async fn compensate(
        &self,
        ctx: &OpContext,
        folder: &str,
        primary: AppError,
        created: Vec<AssetRef>,
    ) -> AppError {
        if created.is_empty() {
            return primary;
        }

        let results = join_all(
            created
                .iter()
                .map(|asset| self.blobs.remove(&asset.storage_id, asset.kind)),
        )
        .await;

        let orphans: Vec<String> = created
            .iter()
            .zip(results)
            .filter_map(|(asset, result)| match result {
                Ok(()) => {
                    debug!("{}: compensated upload {}", ctx, asset.storage_id);
                    None
                }
                Err(e) => {
                    error!(
                        entity = ctx.entity,
                        storage_id = %asset.storage_id,
                        folder = %folder,
                        record_id = ?ctx.record_id,
                        "Compensating delete failed, object orphaned: {}",
                        e
                    );
                    Some(asset.storage_id.clone())
                }
            })
            .collect();

        if orphans.is_empty() {
            primary
        } else {
            AppError::Compensation {
                primary: Box::new(primary),
                secondary: format!("{}: orphaned objects {}", ctx, orphans.join(", ")),
            }
        }
    }

    /// Best-effort delete of assets a record no longer needs.
    /// Failures are logged as orphans; returns how many were left behind.
    async fn delete_assets(&self, ctx: &OpContext, folder: &str, assets: Vec<AssetRef>) -> usize {
        let results = join_all(
            assets
                .iter()
                .map(|asset| self.blobs.remove(&asset.storage_id, asset.kind)),
        )
        .await;

        let mut orphans = 0;
        for (asset, result) in assets.iter().zip(results) {
            if let Err(e) = result {
                orphans += 1;
                warn!(
                    entity = ctx.entity,
                    storage_id = %asset.storage_id,
                    folder = %folder,
                    record_id = ?ctx.record_id,
                    "Asset delete failed, object orphaned: {}",
                    e
                );
            }
        }
        orphans
    }
}
