use axum::Router;
use std::sync::Arc;

use crate::features::achievements::models::Achievement;
use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

/// Create routes for the achievements feature
pub fn routes<S>(service: Arc<EntityService<Achievement, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<Achievement> + ?Sized + 'static,
{
    entity_routes("/api/achievements", EntityState::new(service, staging))
}
