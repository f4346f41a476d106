use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::assets::coordinator::AssetCoordinator;
use crate::features::assets::entity::{AssetEntity, ElementOwner};
use crate::features::assets::models::{OpContext, Operation};
use crate::modules::records::{ElementStore, Filter, RecordStore, Sort};
use crate::modules::staging::{StagedFile, UploadIntake};

/// Service for one entity kind: reads go straight to the record store,
/// writes go through the asset coordinator.
pub struct EntityService<T, S: ?Sized> {
    store: Arc<S>,
    coordinator: Arc<AssetCoordinator>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> EntityService<T, S>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized,
{
    pub fn new(store: Arc<S>, coordinator: Arc<AssetCoordinator>) -> Self {
        Self {
            store,
            coordinator,
            _entity: PhantomData,
        }
    }

    pub async fn list(&self, filter: &Filter, sort: &Sort) -> Result<Vec<T>> {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::List);
        let records = self
            .store
            .find(filter, sort)
            .await
            .map_err(|e| ctx.persistence(e))?;

        debug!("{}: {} record(s)", ctx, records.len());
        Ok(records)
    }

    pub async fn get(&self, id: Uuid) -> Result<T> {
        let ctx = OpContext::new(T::DESCRIPTOR.entity, Operation::Get).with_record(id);
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| ctx.persistence(e))?
            .ok_or_else(|| ctx.not_found())
    }

    pub async fn create(&self, intake: UploadIntake) -> Result<T> {
        self.coordinator.create(self.store.as_ref(), intake).await
    }

    /// Patch fields and replace any assets supplied with the request
    pub async fn update(&self, id: Uuid, intake: UploadIntake) -> Result<T> {
        self.coordinator.update(self.store.as_ref(), id, intake).await
    }

    pub async fn replace_asset(&self, id: Uuid, slot: &str, file: StagedFile) -> Result<T> {
        self.coordinator
            .replace_asset(self.store.as_ref(), id, slot, file)
            .await
    }

    /// Delete the record and every asset it owns
    pub async fn delete(&self, id: Uuid) -> Result<T> {
        self.coordinator.delete(self.store.as_ref(), id).await
    }
}

impl<T, S> EntityService<T, S>
where
    T: ElementOwner,
    S: ElementStore<T> + ?Sized,
{
    pub async fn add_element(&self, parent_id: Uuid, intake: UploadIntake) -> Result<T::Element> {
        self.coordinator
            .append_element(self.store.as_ref(), parent_id, intake)
            .await
    }

    pub async fn remove_element(&self, parent_id: Uuid, element_id: Uuid) -> Result<T::Element> {
        self.coordinator
            .remove_element(self.store.as_ref(), parent_id, element_id)
            .await
    }
}
