//! Admin notification feed persistence

use async_trait::async_trait;
use uuid::Uuid;

use super::{AdminNotificationStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{AdminNotificationFilter, NewAdminNotification},
        AdminNotification,
    },
};

#[async_trait]
impl AdminNotificationStore for Repository {
    async fn admin_notification_list(&self, filter: AdminNotificationFilter) -> AppResult<Vec<AdminNotification>> {
        let rows = sqlx::query_as::<_, AdminNotification>(
            r#"
            SELECT * FROM admin_notifications
            WHERE ($1::uuid IS NULL OR admin_id IS NULL OR admin_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.visible_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn admin_notification_insert_if_absent(&self, notification: &NewAdminNotification) -> AppResult<bool> {
        // Conflict target is the unique index on (type, borrow_id, COALESCE(admin_id, nil))
        let result = sqlx::query(
            r#"
            INSERT INTO admin_notifications (id, admin_id, borrow_id, type, title, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.admin_id)
        .bind(notification.borrow_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn admin_notification_mark_read(&self, id: Uuid, filter: AdminNotificationFilter) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE admin_notifications SET is_read = TRUE
            WHERE id = $1
              AND ($2::uuid IS NULL OR admin_id IS NULL OR admin_id = $2)
            "#,
        )
        .bind(id)
        .bind(filter.visible_to)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification with id {} not found", id)));
        }
        Ok(())
    }

    async fn admin_notification_mark_all_read(&self, filter: AdminNotificationFilter) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE admin_notifications SET is_read = TRUE
            WHERE is_read = FALSE
              AND ($1::uuid IS NULL OR admin_id IS NULL OR admin_id = $1)
            "#,
        )
        .bind(filter.visible_to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn admin_notification_clear(&self, filter: AdminNotificationFilter) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM admin_notifications WHERE ($1::uuid IS NULL OR admin_id IS NULL OR admin_id = $1)",
        )
        .bind(filter.visible_to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
