//! Boxes repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BoxStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::item_box::{BoxPatch, ItemBox, NewBox},
};

#[async_trait]
impl BoxStore for Repository {
    async fn box_list(&self) -> AppResult<Vec<ItemBox>> {
        let boxes = sqlx::query_as::<_, ItemBox>("SELECT * FROM boxes ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(boxes)
    }

    async fn box_get(&self, id: Uuid) -> AppResult<ItemBox> {
        sqlx::query_as::<_, ItemBox>("SELECT * FROM boxes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Box with id {} not found", id)))
    }

    async fn box_insert(&self, data: &NewBox, now: DateTime<Utc>) -> AppResult<ItemBox> {
        let created = sqlx::query_as::<_, ItemBox>(
            r#"
            INSERT INTO boxes (id, name, box_type, cover_image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.box_type)
        .bind(&data.cover_image_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn box_update(&self, id: Uuid, patch: &BoxPatch, now: DateTime<Utc>) -> AppResult<ItemBox> {
        sqlx::query_as::<_, ItemBox>(
            r#"
            UPDATE boxes SET
                name = COALESCE($2, name),
                box_type = COALESCE($3, box_type),
                cover_image_url = COALESCE($4, cover_image_url),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.box_type)
        .bind(&patch.cover_image_url)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Box with id {} not found", id)))
    }

    async fn box_delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM items WHERE box_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM boxes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Box with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
