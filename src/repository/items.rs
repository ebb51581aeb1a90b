//! Items repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ItemStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{item_box::NewItem, Item, ItemStatus},
};

#[async_trait]
impl ItemStore for Repository {
    async fn item_list(&self, box_id: Option<Uuid>) -> AppResult<Vec<Item>> {
        let items = match box_id {
            Some(box_id) => {
                sqlx::query_as::<_, Item>("SELECT * FROM items WHERE box_id = $1 ORDER BY created_at, name")
                    .bind(box_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY created_at, name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(items)
    }

    async fn item_insert(&self, items: &[NewItem], now: DateTime<Utc>) -> AppResult<Vec<Item>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(items.len());

        for item in items {
            let row = sqlx::query_as::<_, Item>(
                r#"
                INSERT INTO items (id, box_id, name, status, image_url, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(item.box_id)
            .bind(&item.name)
            .bind(ItemStatus::Available)
            .bind(&item.image_url)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn item_set_status(&self, ids: &[Uuid], status: ItemStatus, now: DateTime<Utc>) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("UPDATE items SET status = $2, updated_at = $3 WHERE id = ANY($1)")
            .bind(ids)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn item_set_image(&self, id: Uuid, image_url: &str, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query("UPDATE items SET image_url = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(image_url)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }
        Ok(())
    }

    async fn item_delete(&self, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM items WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
