//! Postgres-backed document store
//!
//! Every entity type is a collection inside the `documents` table; the
//! record itself is the JSONB `body`.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::modules::records::document::{
    Collection, Document, ElementStore, Filter, RecordStore, Sort, StoreError,
};

pub struct PgRecordStore<T> {
    pool: PgPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> PgRecordStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

/// ORDER BY keys for a body field bound as `$3`.
///
/// Numeric values compare by value, everything else by its text.
fn field_order(descending: bool) -> String {
    let direction = if descending { "DESC" } else { "ASC" };
    format!(
        "CASE WHEN jsonb_typeof(body -> $3) = 'number' \
              THEN (body ->> $3)::numeric END {direction}, \
         body ->> $3 {direction}, created_at DESC"
    )
}

#[async_trait]
impl<T: Document> RecordStore<T> for PgRecordStore<T> {
    async fn find(&self, filter: &Filter, sort: &Sort) -> Result<Vec<T>, StoreError> {
        let base = "SELECT body FROM documents WHERE collection = $1 AND body @> $2";

        let rows: Vec<Json<T>> = match sort {
            Sort::Newest | Sort::Oldest => {
                let direction = if *sort == Sort::Newest { "DESC" } else { "ASC" };
                let sql = format!("{base} ORDER BY created_at {direction}, id");
                sqlx::query_scalar(&sql)
                    .bind(T::COLLECTION)
                    .bind(Json(filter.as_json()))
                    .fetch_all(&self.pool)
                    .await?
            }
            Sort::Field { name, descending } => {
                let sql = format!("{base} ORDER BY {}", field_order(*descending));
                sqlx::query_scalar(&sql)
                    .bind(T::COLLECTION)
                    .bind(Json(filter.as_json()))
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let row: Option<Json<T>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE id = $1 AND collection = $2")
                .bind(id)
                .bind(T::COLLECTION)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn insert(&self, document: &T) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(document.id())
            .bind(T::COLLECTION)
            .bind(Json(document))
            .execute(&self.pool)
            .await?;

        debug!("Inserted {} document {}", T::COLLECTION, document.id());
        Ok(())
    }

    async fn update(&self, document: &T) -> Result<bool, StoreError> {
        let query = match T::ELEMENT_ARRAY {
            // Concurrent push/pull on the array must survive this write
            Some(field) => sqlx::query(
                r#"
                UPDATE documents
                SET body = $3 || jsonb_build_object($4::text, COALESCE(body -> $4, '[]'::jsonb)),
                    updated_at = NOW()
                WHERE id = $1 AND collection = $2
                "#,
            )
            .bind(document.id())
            .bind(T::COLLECTION)
            .bind(Json(document))
            .bind(field),
            None => sqlx::query(
                r#"
                UPDATE documents
                SET body = $3, updated_at = NOW()
                WHERE id = $1 AND collection = $2
                "#,
            )
            .bind(document.id())
            .bind(T::COLLECTION)
            .bind(Json(document)),
        };

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND collection = $2")
            .bind(id)
            .bind(T::COLLECTION)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl<T: Collection> ElementStore<T> for PgRecordStore<T> {
    async fn push_element(
        &self,
        parent_id: Uuid,
        element: &T::Element,
    ) -> Result<bool, StoreError> {
        let element = serde_json::to_value(element)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                    body,
                    ARRAY[$3::text],
                    COALESCE(body -> $3, '[]'::jsonb) || jsonb_build_array($4::jsonb)
                ),
                updated_at = NOW()
            WHERE id = $1 AND collection = $2
            "#,
        )
        .bind(parent_id)
        .bind(T::COLLECTION)
        .bind(T::ELEMENTS_FIELD)
        .bind(Json(element))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pull_element(&self, parent_id: Uuid, element_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                    body,
                    ARRAY[$3::text],
                    COALESCE(
                        (
                            SELECT jsonb_agg(e ORDER BY i)
                            FROM jsonb_array_elements(body -> $3) WITH ORDINALITY AS t(e, i)
                            WHERE e ->> 'id' <> $4
                        ),
                        '[]'::jsonb
                    )
                ),
                updated_at = NOW()
            WHERE id = $1
              AND collection = $2
              AND body -> $3 @> jsonb_build_array(jsonb_build_object('id', $4::text))
            "#,
        )
        .bind(parent_id)
        .bind(T::COLLECTION)
        .bind(T::ELEMENTS_FIELD)
        .bind(element_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_ranks_numbers_by_value_first() {
        let order = field_order(true);

        let numeric = order.find("(body ->> $3)::numeric END DESC").unwrap();
        let text = order.find("body ->> $3 DESC, created_at DESC").unwrap();
        assert!(numeric < text);
        assert!(field_order(false).contains("::numeric END ASC"));
    }
}
