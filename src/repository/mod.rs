//! Repository layer: store traits and their backends
//!
//! Services depend on `dyn Store`. `Repository` persists to PostgreSQL;
//! `MemoryStore` keeps everything in process.

pub mod admin_notifications;
pub mod boxes;
pub mod items;
pub mod memory;
pub mod records;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        item_box::{BoxPatch, NewBox, NewItem},
        notification::{AdminNotificationFilter, NewAdminNotification},
        record::{NewBorrow, RecordQuery, RecordUpdate},
        user::{NewUser, UpdateProfile},
        AdminNotification, BorrowRecord, Item, ItemBox, ItemStatus, User,
    },
};

pub use memory::MemoryStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_get(&self, id: Uuid) -> AppResult<User>;
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn user_list(&self) -> AppResult<Vec<User>>;
    /// Fails with `Conflict` when the email is taken
    async fn user_insert(&self, user: &NewUser, now: DateTime<Utc>) -> AppResult<User>;
    async fn user_update_profile(&self, id: Uuid, profile: &UpdateProfile) -> AppResult<User>;
    async fn user_set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;
    /// Returns false when no such user existed
    async fn user_delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait BoxStore: Send + Sync {
    async fn box_list(&self) -> AppResult<Vec<ItemBox>>;
    async fn box_get(&self, id: Uuid) -> AppResult<ItemBox>;
    async fn box_insert(&self, data: &NewBox, now: DateTime<Utc>) -> AppResult<ItemBox>;
    async fn box_update(&self, id: Uuid, patch: &BoxPatch, now: DateTime<Utc>) -> AppResult<ItemBox>;
    /// Deletes the box and its items; records are kept
    async fn box_delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn item_list(&self, box_id: Option<Uuid>) -> AppResult<Vec<Item>>;
    async fn item_insert(&self, items: &[NewItem], now: DateTime<Utc>) -> AppResult<Vec<Item>>;
    async fn item_set_status(&self, ids: &[Uuid], status: ItemStatus, now: DateTime<Utc>) -> AppResult<()>;
    async fn item_set_image(&self, id: Uuid, image_url: &str, now: DateTime<Utc>) -> AppResult<()>;
    async fn item_delete(&self, ids: &[Uuid]) -> AppResult<()>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records ordered by borrow time, oldest first
    async fn record_list(&self, query: &RecordQuery) -> AppResult<Vec<BorrowRecord>>;
    async fn record_get(&self, id: Uuid) -> AppResult<BorrowRecord>;
    /// Claims every available item of the box and inserts one borrowing
    /// record per claimed item in one step; empty when nothing was free
    async fn record_borrow_available(&self, borrow: &NewBorrow, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>>;
    async fn record_update(&self, id: Uuid, update: &RecordUpdate) -> AppResult<BorrowRecord>;
    /// Deletes the records and frees the items of those still active in one
    /// step; returns the deleted rows, unknown ids are ignored
    async fn record_delete(&self, ids: &[Uuid], now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>>;
    /// Sets `due_soon_notified_at` if unset; true when this call set it
    async fn record_mark_due_soon_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;
}

#[async_trait]
pub trait AdminNotificationStore: Send + Sync {
    /// Newest first
    async fn admin_notification_list(&self, filter: AdminNotificationFilter) -> AppResult<Vec<AdminNotification>>;
    /// Stores the notification unless one with the same (type, borrow id, admin id)
    /// exists; true when a row was written
    async fn admin_notification_insert_if_absent(&self, notification: &NewAdminNotification) -> AppResult<bool>;
    /// `NotFound` when the row does not exist or is not visible under `filter`
    async fn admin_notification_mark_read(&self, id: Uuid, filter: AdminNotificationFilter) -> AppResult<()>;
    async fn admin_notification_mark_all_read(&self, filter: AdminNotificationFilter) -> AppResult<u64>;
    async fn admin_notification_clear(&self, filter: AdminNotificationFilter) -> AppResult<u64>;
}

/// Complete record store
#[async_trait]
pub trait Store: UserStore + BoxStore + ItemStore + RecordStore + AdminNotificationStore {
    fn backend_name(&self) -> &'static str;

    /// Cheap connectivity check
    async fn ping(&self) -> AppResult<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for Repository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
