use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::study_materials::models::StudyMaterial;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

/// Study material routes. A material carries either an uploaded file or a link.
pub fn routes<S>(service: Arc<EntityService<StudyMaterial, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<StudyMaterial> + ?Sized + 'static,
{
    entity_routes("/api/study-materials", EntityState::new(service, staging))
}
