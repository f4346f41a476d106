use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::faculty::models::Faculty;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

/// Faculty profile routes; `PUT /api/faculty/{id}/assets/photo` swaps the photo
pub fn routes<S>(service: Arc<EntityService<Faculty, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<Faculty> + ?Sized + 'static,
{
    entity_routes("/api/faculty", EntityState::new(service, staging))
}
