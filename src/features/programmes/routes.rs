use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::programmes::models::Programme;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

pub fn routes<S>(service: Arc<EntityService<Programme, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<Programme> + ?Sized + 'static,
{
    entity_routes("/api/programmes", EntityState::new(service, staging))
}
