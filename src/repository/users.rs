//! Users repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Repository, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, UpdateProfile, User},
};

#[async_trait]
impl UserStore for Repository {
    /// Get user by ID
    async fn user_get(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email, case insensitive
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn user_list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn user_insert(&self, user: &NewUser, now: DateTime<Utc>) -> AppResult<User> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(&user.email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, phone, email, role, password_hash, created_at,
                               notify_on_borrow, notify_on_return, notify_on_rejected)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, TRUE, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Conflict("Email already registered".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(created)
    }

    async fn user_update_profile(&self, id: Uuid, profile: &UpdateProfile) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                avatar_url = COALESCE($4, avatar_url),
                notify_on_borrow = COALESCE($5, notify_on_borrow),
                notify_on_return = COALESCE($6, notify_on_return),
                notify_on_rejected = COALESCE($7, notify_on_rejected)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.avatar_url)
        .bind(profile.notify_on_borrow)
        .bind(profile.notify_on_return)
        .bind(profile.notify_on_rejected)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn user_set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    async fn user_delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
