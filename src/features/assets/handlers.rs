use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::assets::entity::{AssetEntity, ElementOwner};
use crate::features::assets::service::EntityService;
use crate::modules::records::{ElementStore, Filter, RecordStore, Sort};
use crate::modules::staging::{FormFields, StagingArea, UploadHandle, UploadIntake};
use crate::shared::constants::{is_mime_type_allowed, ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
use crate::shared::types::{ApiResponse, Meta};

/// Router state shared by the handlers of one entity kind
pub struct EntityState<T, S: ?Sized> {
    pub service: Arc<EntityService<T, S>>,
    pub staging: StagingArea,
}

impl<T, S: ?Sized> Clone for EntityState<T, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            staging: self.staging.clone(),
        }
    }
}

impl<T, S: ?Sized> EntityState<T, S> {
    pub fn new(service: Arc<EntityService<T, S>>, staging: StagingArea) -> Self {
        Self { service, staging }
    }
}

/// Read a multipart body into text fields and staged files.
///
/// Parts with a file name are size and MIME checked and staged; every other
/// part is a text field. On error the files staged so far are released when
/// the partial intake is dropped.
pub async fn read_intake(
    staging: &StagingArea,
    mut multipart: Multipart,
) -> Result<UploadIntake, AppError> {
    let mut intake = UploadIntake::new(FormFields::new());

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name.is_empty() {
            debug!("Ignoring unnamed multipart field");
            continue;
        }

        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            let text = field.text().await.map_err(|e| {
                AppError::BadRequest(format!("Failed to read field '{}': {}", field_name, e))
            })?;
            intake.fields.insert(field_name, text);
            continue;
        };

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::BadRequest(format!(
                "File '{}' too large. Maximum size is {} bytes ({} MB)",
                field_name,
                MAX_FILE_SIZE,
                MAX_FILE_SIZE / 1024 / 1024
            )));
        }

        if !is_mime_type_allowed(&content_type) {
            return Err(AppError::BadRequest(format!(
                "File type '{}' is not allowed. Allowed types: {}",
                content_type,
                ALLOWED_MIME_TYPES.join(", ")
            )));
        }

        let staged = staging
            .stage(UploadHandle {
                filename: file_name,
                content_type,
                bytes: data.to_vec(),
            })
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stage upload: {}", e)))?;

        intake.add_file(field_name, staged);
    }

    Ok(intake)
}

/// `sort` selects the order, every other query parameter is an equality filter
fn list_query(params: HashMap<String, String>) -> (Filter, Sort) {
    let mut filter = Filter::all();
    let mut sort = Sort::default();

    for (key, value) in params {
        if key == "sort" {
            sort = Sort::parse(&value);
        } else if !value.trim().is_empty() {
            filter = filter.eq(key, value);
        }
    }

    (filter, sort)
}

pub async fn list_records<T, S>(
    State(state): State<EntityState<T, S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<T>>>, AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let (filter, sort) = list_query(params);
    let records = state.service.list(&filter, &sort).await?;
    let total = records.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(records),
        None,
        Some(Meta { total }),
    )))
}

pub async fn get_record<T, S>(
    State(state): State<EntityState<T, S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<T>>, AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let record = state.service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(record), None, None)))
}

pub async fn create_record<T, S>(
    State(state): State<EntityState<T, S>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<T>>), AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let intake = read_intake(&state.staging, multipart).await?;
    let record = state.service.create(intake).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(record),
            Some(format!("{} created", T::DESCRIPTOR.entity)),
            None,
        )),
    ))
}

pub async fn update_record<T, S>(
    State(state): State<EntityState<T, S>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<T>>, AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let intake = read_intake(&state.staging, multipart).await?;
    let record = state.service.update(id, intake).await?;

    Ok(Json(ApiResponse::success(
        Some(record),
        Some(format!("{} updated", T::DESCRIPTOR.entity)),
        None,
    )))
}

/// Replace the asset in `slot` with the single file in the request body
pub async fn replace_record_asset<T, S>(
    State(state): State<EntityState<T, S>>,
    Path((id, slot)): Path<(Uuid, String)>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<T>>, AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let intake = read_intake(&state.staging, multipart).await?;
    let (_, mut files) = intake.into_parts();
    if files.len() != 1 {
        return Err(AppError::BadRequest(format!(
            "Expected exactly one file, got {}",
            files.len()
        )));
    }
    let (_, file) = files.remove(0);

    let record = state.service.replace_asset(id, &slot, file).await?;

    Ok(Json(ApiResponse::success(
        Some(record),
        Some(format!("{} '{}' replaced", T::DESCRIPTOR.entity, slot)),
        None,
    )))
}

pub async fn delete_record<T, S>(
    State(state): State<EntityState<T, S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<T>>, AppError>
where
    T: AssetEntity,
    S: RecordStore<T> + ?Sized + 'static,
{
    let record = state.service.delete(id).await?;

    Ok(Json(ApiResponse::success(
        Some(record),
        Some(format!("{} deleted", T::DESCRIPTOR.entity)),
        None,
    )))
}

pub async fn add_element<T, S>(
    State(state): State<EntityState<T, S>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<T::Element>>), AppError>
where
    T: ElementOwner,
    S: ElementStore<T> + ?Sized + 'static,
{
    let intake = read_intake(&state.staging, multipart).await?;
    let element = state.service.add_element(id, intake).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(element), None, None)),
    ))
}

pub async fn remove_element<T, S>(
    State(state): State<EntityState<T, S>>,
    Path((id, element_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<T::Element>>, AppError>
where
    T: ElementOwner,
    S: ElementStore<T> + ?Sized + 'static,
{
    let element = state.service.remove_element(id, element_id).await?;
    Ok(Json(ApiResponse::success(Some(element), None, None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_splits_sort_from_filter() {
        let params: HashMap<String, String> = [
            ("department".to_string(), "CS".to_string()),
            ("sort".to_string(), "oldest".to_string()),
            ("category".to_string(), " ".to_string()),
        ]
        .into_iter()
        .collect();

        let (filter, sort) = list_query(params);

        assert_eq!(sort, Sort::Oldest);
        assert_eq!(filter, Filter::all().eq("department", "CS"));
    }
}
