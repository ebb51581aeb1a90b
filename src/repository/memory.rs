//! In-process store
//!
//! Everything lives behind a single `RwLock`, so each operation is atomic
//! with respect to the others. Rows keep insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AdminNotificationStore, BoxStore, ItemStore, RecordStore, Store, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        item_box::{BoxPatch, NewBox, NewItem},
        notification::{AdminNotificationFilter, NewAdminNotification},
        record::{NewBorrow, RecordQuery, RecordUpdate},
        user::{NewUser, UpdateProfile},
        AdminNotification, BorrowRecord, Item, ItemBox, ItemStatus, RecordStatus, User,
    },
};

#[derive(Default)]
struct Tables {
    users: IndexMap<Uuid, User>,
    boxes: IndexMap<Uuid, ItemBox>,
    items: IndexMap<Uuid, Item>,
    records: IndexMap<Uuid, BorrowRecord>,
    admin_notifications: IndexMap<Uuid, AdminNotification>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn visible(filter: &AdminNotificationFilter, notification: &AdminNotification) -> bool {
    filter.visible_to.map_or(true, |admin| notification.is_visible_to(admin))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_get(&self, id: Uuid) -> AppResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_list(&self) -> AppResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn user_insert(&self, user: &NewUser, now: DateTime<Utc>) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            role: user.role,
            password_hash: user.password_hash.clone(),
            avatar_url: None,
            created_at: now,
            notify_on_borrow: true,
            notify_on_return: true,
            notify_on_rejected: true,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_update_profile(&self, id: Uuid, profile: &UpdateProfile) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        if let Some(name) = &profile.name {
            user.name = name.clone();
        }
        if let Some(phone) = &profile.phone {
            user.phone = phone.clone();
        }
        if let Some(avatar_url) = &profile.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        if let Some(flag) = profile.notify_on_borrow {
            user.notify_on_borrow = flag;
        }
        if let Some(flag) = profile.notify_on_return {
            user.notify_on_return = flag;
        }
        if let Some(flag) = profile.notify_on_rejected {
            user.notify_on_rejected = flag;
        }

        Ok(user.clone())
    }

    async fn user_set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn user_delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.users.shift_remove(&id).is_some())
    }
}

#[async_trait]
impl BoxStore for MemoryStore {
    async fn box_list(&self) -> AppResult<Vec<ItemBox>> {
        Ok(self.tables.read().await.boxes.values().cloned().collect())
    }

    async fn box_get(&self, id: Uuid) -> AppResult<ItemBox> {
        self.tables
            .read()
            .await
            .boxes
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Box with id {} not found", id)))
    }

    async fn box_insert(&self, data: &NewBox, now: DateTime<Utc>) -> AppResult<ItemBox> {
        let created = ItemBox {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            box_type: data.box_type.clone(),
            cover_image_url: data.cover_image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.boxes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn box_update(&self, id: Uuid, patch: &BoxPatch, now: DateTime<Utc>) -> AppResult<ItemBox> {
        let mut tables = self.tables.write().await;
        let item_box = tables
            .boxes
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Box with id {} not found", id)))?;

        if let Some(name) = &patch.name {
            item_box.name = name.clone();
        }
        if let Some(box_type) = &patch.box_type {
            item_box.box_type = box_type.clone();
        }
        if let Some(cover) = &patch.cover_image_url {
            item_box.cover_image_url = cover.clone();
        }
        item_box.updated_at = now;

        Ok(item_box.clone())
    }

    async fn box_delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.boxes.shift_remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Box with id {} not found", id)));
        }
        tables.items.retain(|_, item| item.box_id != id);
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn item_list(&self, box_id: Option<Uuid>) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| box_id.map_or(true, |id| i.box_id == id))
            .cloned()
            .collect())
    }

    async fn item_insert(&self, items: &[NewItem], now: DateTime<Utc>) -> AppResult<Vec<Item>> {
        let mut tables = self.tables.write().await;
        let mut created = Vec::with_capacity(items.len());

        for item in items {
            let row = Item {
                id: Uuid::new_v4(),
                box_id: item.box_id,
                name: item.name.clone(),
                status: ItemStatus::Available,
                image_url: item.image_url.clone(),
                created_at: now,
                updated_at: now,
            };
            tables.items.insert(row.id, row.clone());
            created.push(row);
        }

        Ok(created)
    }

    async fn item_set_status(&self, ids: &[Uuid], status: ItemStatus, now: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        for id in ids {
            if let Some(item) = tables.items.get_mut(id) {
                item.status = status;
                item.updated_at = now;
            }
        }
        Ok(())
    }

    async fn item_set_image(&self, id: Uuid, image_url: &str, now: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;
        item.image_url = image_url.to_string();
        item.updated_at = now;
        Ok(())
    }

    async fn item_delete(&self, ids: &[Uuid]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.items.retain(|id, _| !ids.contains(id));
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn record_list(&self, query: &RecordQuery) -> AppResult<Vec<BorrowRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<BorrowRecord> = tables
            .records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.borrowed_at, r.created_at));
        Ok(records)
    }

    async fn record_get(&self, id: Uuid) -> AppResult<BorrowRecord> {
        self.tables
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Record with id {} not found", id)))
    }

    async fn record_borrow_available(&self, borrow: &NewBorrow, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        let mut tables = self.tables.write().await;
        let Tables { items, records, .. } = &mut *tables;
        let mut created = Vec::new();

        for item in items
            .values_mut()
            .filter(|i| i.box_id == borrow.box_id && i.status == ItemStatus::Available)
        {
            item.status = ItemStatus::Borrowing;
            item.updated_at = now;

            let row = BorrowRecord {
                id: Uuid::new_v4(),
                user_id: borrow.user_id,
                user_name: borrow.user_name.clone(),
                user_email: borrow.user_email.clone(),
                user_phone: borrow.user_phone.clone(),
                box_id: borrow.box_id,
                item_id: item.id,
                status: RecordStatus::Borrowing,
                days_borrowed: borrow.days_borrowed,
                borrowed_at: borrow.borrowed_at,
                return_request_date: None,
                returned_at: None,
                proof_image_url: borrow.proof_image_url.clone(),
                admin_note: None,
                created_at: now,
                updated_at: now,
                due_soon_notified_at: None,
            };
            records.insert(row.id, row.clone());
            created.push(row);
        }

        Ok(created)
    }

    async fn record_update(&self, id: Uuid, update: &RecordUpdate) -> AppResult<BorrowRecord> {
        let mut tables = self.tables.write().await;
        let record = tables
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Record with id {} not found", id)))?;

        record.status = update.status;
        record.return_request_date = update.return_request_date;
        record.returned_at = update.returned_at;
        record.proof_image_url = update.proof_image_url.clone();
        record.admin_note = update.admin_note.clone();
        record.updated_at = update.updated_at;

        Ok(record.clone())
    }

    async fn record_delete(&self, ids: &[Uuid], now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        let mut tables = self.tables.write().await;
        let deleted: Vec<BorrowRecord> = ids.iter().filter_map(|id| tables.records.shift_remove(id)).collect();

        for record in deleted.iter().filter(|r| r.status.is_active()) {
            if let Some(item) = tables.items.get_mut(&record.item_id) {
                item.status = ItemStatus::Available;
                item.updated_at = now;
            }
        }

        Ok(deleted)
    }

    async fn record_mark_due_soon_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.records.get_mut(&id) {
            Some(record) if record.due_soon_notified_at.is_none() => {
                record.due_soon_notified_at = Some(at);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::NotFound(format!("Record with id {} not found", id))),
        }
    }
}

#[async_trait]
impl AdminNotificationStore for MemoryStore {
    async fn admin_notification_list(&self, filter: AdminNotificationFilter) -> AppResult<Vec<AdminNotification>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AdminNotification> = tables
            .admin_notifications
            .values()
            .filter(|n| visible(&filter, n))
            .cloned()
            .collect();
        // stable sort keeps later inserts first among equal timestamps
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn admin_notification_insert_if_absent(&self, notification: &NewAdminNotification) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let key = notification.key();
        if tables.admin_notifications.values().any(|n| n.key() == key) {
            return Ok(false);
        }

        let row = AdminNotification {
            id: Uuid::new_v4(),
            admin_id: notification.admin_id,
            borrow_id: notification.borrow_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            is_read: false,
            created_at: notification.created_at,
        };
        tables.admin_notifications.insert(row.id, row);
        Ok(true)
    }

    async fn admin_notification_mark_read(&self, id: Uuid, filter: AdminNotificationFilter) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .admin_notifications
            .get_mut(&id)
            .filter(|row| visible(&filter, row))
            .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))?;
        row.is_read = true;
        Ok(())
    }

    async fn admin_notification_mark_all_read(&self, filter: AdminNotificationFilter) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for row in tables.admin_notifications.values_mut() {
            if !row.is_read && visible(&filter, row) {
                row.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn admin_notification_clear(&self, filter: AdminNotificationFilter) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.admin_notifications.len();
        tables.admin_notifications.retain(|_, row| !visible(&filter, row));
        Ok((before - tables.admin_notifications.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
