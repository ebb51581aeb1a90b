//! Borrow record lifecycle service
//!
//! borrowing -> pendingReturn (return request) -> returned (approval), with
//! rejection sending the record back to borrowing with an admin note. Each
//! transition keeps the linked item's status in step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    bus::{ChangeBus, ChangedEntity},
    email::EmailService,
    notifications::NotificationsService,
};
use crate::{
    clock::Clock,
    config::BorrowingConfig,
    error::{AppError, AppResult},
    models::{
        notification::NewAdminNotification,
        record::{
            BatchReturnRequest, BatchStatusUpdate, BorrowRequest, DeleteRecords, NewBorrow, OverrideStatus,
            RecordQuery, RecordUpdate, ReturnRequest, ReviewReturn,
        },
        AdminNotificationType, BorrowRecord, ItemStatus, RecordStatus, User, UserClaims,
    },
    repository::{BoxStore, ItemStore, RecordStore, Store, UserStore},
};

const DEFAULT_REJECTION_NOTE: &str = "Rejected by admin";

#[derive(Clone)]
pub struct RecordsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    bus: ChangeBus,
    email: EmailService,
    notifications: NotificationsService,
    config: BorrowingConfig,
}

impl RecordsService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        bus: ChangeBus,
        email: EmailService,
        notifications: NotificationsService,
        config: BorrowingConfig,
    ) -> Self {
        Self {
            store,
            clock,
            bus,
            email,
            notifications,
            config,
        }
    }

    fn publish_changes(&self, now: DateTime<Utc>) {
        self.bus.publish(ChangedEntity::Records, now);
        self.bus.publish(ChangedEntity::Items, now);
    }

    async fn box_title(&self, box_id: Uuid, fallback: &str) -> String {
        match self.store.box_get(box_id).await {
            Ok(item_box) => item_box.name,
            Err(_) => fallback.to_string(),
        }
    }

    /// Admin notices are best effort; the transition already happened
    async fn notify_admins(&self, notification: NewAdminNotification) {
        if let Err(e) = self.notifications.record(notification).await {
            tracing::warn!(error = %e, "Failed to record admin notification");
        }
    }

    /// Borrower's own records; admins may list everyone's
    pub async fn list(&self, claims: &UserClaims, mut query: RecordQuery) -> AppResult<Vec<BorrowRecord>> {
        if !claims.is_admin() {
            query.user_id = Some(claims.user_id);
        }
        self.store.record_list(&query).await
    }

    pub async fn get(&self, claims: &UserClaims, record_id: Uuid) -> AppResult<BorrowRecord> {
        let record = self.store.record_get(record_id).await?;
        claims.require_self_or_admin(record.user_id)?;
        Ok(record)
    }

    /// Borrow every available item of a box, one record per item
    pub async fn borrow(&self, claims: &UserClaims, box_id: Uuid, request: BorrowRequest) -> AppResult<Vec<BorrowRecord>> {
        if request.days < 1 || request.days > self.config.max_days {
            return Err(AppError::Validation(format!(
                "Borrow duration must be between 1 and {} days",
                self.config.max_days
            )));
        }

        let user = self.store.user_get(claims.user_id).await?;
        let item_box = self.store.box_get(box_id).await?;

        let now = self.clock.now();
        let borrow = NewBorrow {
            user_id: user.id,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            user_phone: user.phone.clone(),
            box_id,
            days_borrowed: request.days,
            borrowed_at: now,
            proof_image_url: request.proof_image_url,
        };

        let records = self.store.record_borrow_available(&borrow, now).await?;
        if records.is_empty() {
            return Err(AppError::BusinessRule("No items available in this box".to_string()));
        }

        tracing::info!(
            user_id = %user.id,
            box_id = %box_id,
            items = records.len(),
            days = request.days,
            "Box borrowed"
        );

        if let Some(first) = records.first() {
            self.notify_admins(NewAdminNotification::broadcast(
                AdminNotificationType::BorrowCreated,
                first.id,
                item_box.name.clone(),
                format!("{} borrowed a new box", user.name),
                now,
            ))
            .await;
        }

        if user.notify_on_borrow {
            if let Err(e) = self
                .email
                .send_borrow_confirmation(&user.email, &user.name, &item_box.name, records.len(), request.days, now)
                .await
            {
                tracing::warn!(user_id = %user.id, error = %e, "Borrow confirmation email failed");
            }
        }

        self.publish_changes(now);
        Ok(records)
    }

    fn pending_return(record: &BorrowRecord, proof_image_url: &str, now: DateTime<Utc>) -> RecordUpdate {
        RecordUpdate {
            status: RecordStatus::PendingReturn,
            return_request_date: Some(now),
            proof_image_url: Some(proof_image_url.to_string()),
            admin_note: None,
            updated_at: now,
            ..RecordUpdate::from(record)
        }
    }

    fn ensure_returnable(claims: &UserClaims, record: &BorrowRecord) -> AppResult<()> {
        claims.require_self_or_admin(record.user_id)?;
        if record.status != RecordStatus::Borrowing {
            return Err(AppError::BusinessRule(format!(
                "Record {} is {}, only borrowed items can be returned",
                record.id, record.status
            )));
        }
        Ok(())
    }

    fn return_notice(
        was_rejected: bool,
        borrow_id: Uuid,
        title: String,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> NewAdminNotification {
        if was_rejected {
            NewAdminNotification::broadcast(
                AdminNotificationType::ReturnRejectedNewRequest,
                borrow_id,
                title,
                format!("{} submitted a new return request after a rejection", user_name),
                now,
            )
        } else {
            NewAdminNotification::broadcast(
                AdminNotificationType::ReturnRequested,
                borrow_id,
                title,
                format!("{} requested a return", user_name),
                now,
            )
        }
    }

    /// Submit a return with photo proof
    pub async fn request_return(
        &self,
        claims: &UserClaims,
        record_id: Uuid,
        request: ReturnRequest,
    ) -> AppResult<BorrowRecord> {
        let record = self.store.record_get(record_id).await?;
        Self::ensure_returnable(claims, &record)?;

        let was_rejected = record.admin_note.is_some();
        let now = self.clock.now();
        let updated = self
            .store
            .record_update(record_id, &Self::pending_return(&record, &request.proof_image_url, now))
            .await?;
        self.store
            .item_set_status(&[record.item_id], ItemStatus::PendingReturn, now)
            .await?;

        tracing::info!(record_id = %record_id, resubmission = was_rejected, "Return requested");

        let title = self.box_title(record.box_id, "Return Request").await;
        self.notify_admins(Self::return_notice(was_rejected, record.id, title, &record.user_name, now))
            .await;

        self.publish_changes(now);
        Ok(updated)
    }

    /// Submit one return for several records; nothing changes unless every
    /// record can be returned
    pub async fn request_return_batch(
        &self,
        claims: &UserClaims,
        request: BatchReturnRequest,
    ) -> AppResult<Vec<BorrowRecord>> {
        let mut records = Vec::with_capacity(request.record_ids.len());
        for id in &request.record_ids {
            let record = self.store.record_get(*id).await?;
            Self::ensure_returnable(claims, &record)?;
            records.push(record);
        }

        let Some(first) = records.first().cloned() else {
            return Err(AppError::Validation("At least one record is required".to_string()));
        };

        let was_rejected = records.iter().any(|r| r.admin_note.is_some());
        let now = self.clock.now();

        let mut updated = Vec::with_capacity(records.len());
        for record in &records {
            updated.push(
                self.store
                    .record_update(record.id, &Self::pending_return(record, &request.proof_image_url, now))
                    .await?,
            );
        }
        let item_ids: Vec<Uuid> = records.iter().map(|r| r.item_id).collect();
        self.store
            .item_set_status(&item_ids, ItemStatus::PendingReturn, now)
            .await?;

        tracing::info!(records = updated.len(), resubmission = was_rejected, "Batch return requested");

        let title = self.box_title(first.box_id, "Return Request").await;
        self.notify_admins(Self::return_notice(was_rejected, first.id, title, &first.user_name, now))
            .await;

        self.publish_changes(now);
        Ok(updated)
    }

    /// Approve or reject a pending return
    pub async fn review(&self, claims: &UserClaims, record_id: Uuid, review: ReviewReturn) -> AppResult<BorrowRecord> {
        claims.require_admin()?;
        let record = self.store.record_get(record_id).await?;
        if record.status != RecordStatus::PendingReturn {
            return Err(AppError::BusinessRule(format!(
                "Record {} has no pending return request",
                record_id
            )));
        }

        let now = self.clock.now();
        let update = if review.approved {
            RecordUpdate {
                status: RecordStatus::Returned,
                returned_at: Some(now),
                admin_note: None,
                updated_at: now,
                ..RecordUpdate::from(&record)
            }
        } else {
            let note = review
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string());
            RecordUpdate {
                status: RecordStatus::Borrowing,
                return_request_date: None,
                admin_note: Some(note),
                updated_at: now,
                ..RecordUpdate::from(&record)
            }
        };

        let updated = self.store.record_update(record_id, &update).await?;
        self.store
            .item_set_status(&[record.item_id], updated.status.item_status(), now)
            .await?;

        tracing::info!(record_id = %record_id, approved = review.approved, reviewer = %claims.user_id, "Return reviewed");

        match self.store.user_get(record.user_id).await {
            Ok(user) => self.send_review_email(&user, &updated, review.approved).await,
            Err(e) => tracing::debug!(record_id = %record_id, error = %e, "Borrower not found, no review email"),
        }

        self.publish_changes(now);
        Ok(updated)
    }

    async fn send_review_email(&self, user: &User, record: &BorrowRecord, approved: bool) {
        let item_name = self
            .store
            .item_list(Some(record.box_id))
            .await
            .ok()
            .and_then(|items| items.into_iter().find(|i| i.id == record.item_id))
            .map(|i| i.name)
            .unwrap_or_else(|| "item".to_string());

        let result = if approved && user.notify_on_return {
            self.email.send_return_approved(&user.email, &user.name, &item_name).await
        } else if !approved && user.notify_on_rejected {
            let reason = record.admin_note.as_deref().unwrap_or("-");
            self.email
                .send_return_rejected(&user.email, &user.name, &item_name, reason)
                .await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            tracing::warn!(record_id = %record.id, error = %e, "Review email failed");
        }
    }

    /// Force records into borrowing or returned; unknown ids are skipped
    pub async fn batch_override(&self, claims: &UserClaims, request: BatchStatusUpdate) -> AppResult<Vec<BorrowRecord>> {
        claims.require_admin()?;
        let now = self.clock.now();
        let mut updated = Vec::new();

        for id in &request.record_ids {
            let record = match self.store.record_get(*id).await {
                Ok(record) => record,
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(record_id = %id, "Skipping unknown record");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let update = match request.status {
                OverrideStatus::Returned => RecordUpdate {
                    status: RecordStatus::Returned,
                    returned_at: record.returned_at.or(Some(now)),
                    return_request_date: None,
                    admin_note: None,
                    updated_at: now,
                    ..RecordUpdate::from(&record)
                },
                OverrideStatus::Borrowing => RecordUpdate {
                    status: RecordStatus::Borrowing,
                    returned_at: None,
                    return_request_date: None,
                    updated_at: now,
                    ..RecordUpdate::from(&record)
                },
            };

            let saved = self.store.record_update(*id, &update).await?;
            self.store
                .item_set_status(&[saved.item_id], saved.status.item_status(), now)
                .await?;
            updated.push(saved);
        }

        tracing::info!(records = updated.len(), status = ?request.status, "Record status overridden");
        self.publish_changes(now);
        Ok(updated)
    }

    /// Delete records, freeing the items of those still active
    pub async fn delete_records(&self, claims: &UserClaims, request: DeleteRecords) -> AppResult<u64> {
        claims.require_admin()?;
        let now = self.clock.now();

        let deleted = self.store.record_delete(&request.record_ids, now).await?;
        let freed = deleted.iter().filter(|r| r.status.is_active()).count();

        tracing::info!(deleted = deleted.len(), freed_items = freed, "Records deleted");
        self.publish_changes(now);
        Ok(deleted.len() as u64)
    }
}
