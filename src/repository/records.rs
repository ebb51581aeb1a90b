//! Borrow records repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{RecordStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        record::{NewBorrow, RecordQuery, RecordUpdate},
        BorrowRecord, ItemStatus, RecordStatus,
    },
};

#[async_trait]
impl RecordStore for Repository {
    async fn record_list(&self, query: &RecordQuery) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR box_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND (NOT $4 OR status <> $5)
            ORDER BY borrowed_at, created_at
            "#,
        )
        .bind(query.user_id)
        .bind(query.box_id)
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.active_only)
        .bind(RecordStatus::Returned)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn record_get(&self, id: Uuid) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record with id {} not found", id)))
    }

    async fn record_borrow_available(&self, borrow: &NewBorrow, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        let mut tx = self.pool.begin().await?;

        // Concurrent borrowers block on the row locks and re-check the status
        let item_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE items SET status = $3, updated_at = $4
            WHERE box_id = $1 AND status = $2
            RETURNING id
            "#,
        )
        .bind(borrow.box_id)
        .bind(ItemStatus::Available)
        .bind(ItemStatus::Borrowing)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            let row = sqlx::query_as::<_, BorrowRecord>(
                r#"
                INSERT INTO borrow_records (
                    id, user_id, user_name, user_email, user_phone, box_id, item_id,
                    status, days_borrowed, borrowed_at, proof_image_url, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(borrow.user_id)
            .bind(&borrow.user_name)
            .bind(&borrow.user_email)
            .bind(&borrow.user_phone)
            .bind(borrow.box_id)
            .bind(item_id)
            .bind(RecordStatus::Borrowing)
            .bind(borrow.days_borrowed)
            .bind(borrow.borrowed_at)
            .bind(&borrow.proof_image_url)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn record_update(&self, id: Uuid, update: &RecordUpdate) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records SET
                status = $2,
                return_request_date = $3,
                returned_at = $4,
                proof_image_url = $5,
                admin_note = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status)
        .bind(update.return_request_date)
        .bind(update.returned_at)
        .bind(&update.proof_image_url)
        .bind(&update.admin_note)
        .bind(update.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record with id {} not found", id)))
    }

    async fn record_delete(&self, ids: &[Uuid], now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, BorrowRecord>("DELETE FROM borrow_records WHERE id = ANY($1) RETURNING *")
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;

        let freed: Vec<Uuid> = deleted
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.item_id)
            .collect();

        if !freed.is_empty() {
            sqlx::query("UPDATE items SET status = $2, updated_at = $3 WHERE id = ANY($1)")
                .bind(&freed)
                .bind(ItemStatus::Available)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

    async fn record_mark_due_soon_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE borrow_records SET due_soon_notified_at = $2 WHERE id = $1 AND due_soon_notified_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
