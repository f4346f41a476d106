use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::features::assets::entity::{AssetEntity, ElementOwner};
use crate::features::assets::handlers::{
    add_element, create_record, delete_record, get_record, list_records, remove_element,
    replace_record_asset, update_record, EntityState,
};
use crate::modules::records::{ElementStore, RecordStore};

/// CRUD routes for one entity kind under `base`, e.g. `/api/faculty`
pub fn entity_routes<T, S>(base: &str, state: EntityState<T, S>) -> Router
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    Router::new()
        .route(base, get(list_records::<T, S>).post(create_record::<T, S>))
        .route(
            &format!("{}/{{id}}", base),
            get(get_record::<T, S>)
                .put(update_record::<T, S>)
                .delete(delete_record::<T, S>),
        )
        .route(
            &format!("{}/{{id}}/assets/{{slot}}", base),
            put(replace_record_asset::<T, S>),
        )
        .with_state(state)
}

/// Element routes of a collection-owning entity, e.g. `/api/albums/{id}/photos`
pub fn element_routes<T, S>(base: &str, elements: &str, state: EntityState<T, S>) -> Router
where
    T: ElementOwner,
    S: ElementStore<T> + ?Sized + 'static,
{
    Router::new()
        .route(
            &format!("{}/{{id}}/{}", base, elements),
            post(add_element::<T, S>),
        )
        .route(
            &format!("{}/{{id}}/{}/{{element_id}}", base, elements),
            delete(remove_element::<T, S>),
        )
        .with_state(state)
}
