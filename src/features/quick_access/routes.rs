use axum::Router;
use std::sync::Arc;

use crate::features::assets::{entity_routes, EntityService, EntityState};
use crate::features::quick_access::models::QuickAccessItem;
use crate::modules::records::RecordStore;
use crate::modules::staging::StagingArea;

/// Create routes for the quick-access feature
pub fn routes<S>(service: Arc<EntityService<QuickAccessItem, S>>, staging: StagingArea) -> Router
where
    S: RecordStore<QuickAccessItem> + ?Sized + 'static,
{
    entity_routes("/api/quick-access", EntityState::new(service, staging))
}
