use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::syllabi::models::Syllabus;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

pub fn routes<S>(service: Arc<EntityService<Syllabus, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<Syllabus> + ?Sized + 'static,
{
    entity_routes("/api/syllabi", EntityState::new(service, staging))
}
