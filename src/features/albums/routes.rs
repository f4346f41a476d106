use axum::Router;
use std::sync::Arc;

use crate::features::albums::models::Album;
use crate::features::assets::{element_routes, entity_routes, EntityService, EntityState};
use crate::modules::records::ElementStore;
use crate::modules::staging::StagingArea;

/// Album CRUD plus `/api/albums/{id}/photos` for adding and removing photos
pub fn routes<S>(service: Arc<EntityService<Album, S>>, staging: StagingArea) -> Router
where
    S: ElementStore<Album> + ?Sized + 'static,
{
    let state = EntityState::new(service, staging);

    Router::new()
        .merge(entity_routes("/api/albums", state.clone()))
        .merge(element_routes("/api/albums", "photos", state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::shared::test_helpers::{
        coordinator, staged_count, staging_area, MemoryBlobStore, MemoryRecordStore,
    };

    fn image_part(name: &str) -> Part {
        Part::bytes(b"jpeg-bytes".to_vec())
            .file_name(name)
            .mime_type("image/jpeg")
    }

    #[tokio::test]
    async fn test_album_photo_lifecycle_over_http() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = Arc::new(MemoryRecordStore::<Album>::new());
        let service = Arc::new(EntityService::new(
            store.clone(),
            Arc::new(coordinator(&blobs)),
        ));
        let (_dir, staging) = staging_area();
        let server = TestServer::new(routes(service, staging.clone())).unwrap();

        let form = MultipartForm::new()
            .add_text("title", "Convocation 2024")
            .add_text("category", "Events")
            .add_part("cover", image_part("cover.jpg"));
        let response = server.post("/api/albums").multipart(form).await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let album_id = body["data"]["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new()
            .add_text("caption", "Stage")
            .add_part("image", image_part("stage.jpg"));
        let response = server
            .post(&format!("/api/albums/{}/photos", album_id))
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        let photo: Value = response.json();
        let photo_id = photo["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(blobs.object_count(), 2);

        server
            .delete(&format!("/api/albums/{}/photos/{}", album_id, photo_id))
            .await
            .assert_status_ok();
        server
            .delete(&format!("/api/albums/{}/photos/{}", album_id, photo_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .delete(&format!("/api/albums/{}", album_id))
            .await
            .assert_status_ok();

        assert_eq!(blobs.object_count(), 0);
        assert_eq!(store.len(), 0);
        assert_eq!(staged_count(&staging), 0);
    }

    #[tokio::test]
    async fn test_disallowed_file_type_is_bad_request() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = Arc::new(MemoryRecordStore::<Album>::new());
        let service = Arc::new(EntityService::new(store, Arc::new(coordinator(&blobs))));
        let (_dir, staging) = staging_area();
        let server = TestServer::new(routes(service, staging.clone())).unwrap();

        let form = MultipartForm::new()
            .add_text("title", "Convocation 2024")
            .add_text("category", "Events")
            .add_part(
                "cover",
                Part::bytes(b"MZ".to_vec())
                    .file_name("setup.exe")
                    .mime_type("application/x-msdownload"),
            );
        let response = server.post("/api/albums").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(blobs.upload_calls(), 0);
        assert_eq!(staged_count(&staging), 0);
    }
}
