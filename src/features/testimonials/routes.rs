use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::testimonials::models::Testimonial;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

/// Create routes for the testimonials feature
pub fn routes<S>(service: Arc<EntityService<Testimonial, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<Testimonial> + ?Sized + 'static,
{
    entity_routes("/api/testimonials", EntityState::new(service, staging))
}
