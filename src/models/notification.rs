//! Admin notification feed and derived user notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{AdminNotificationType, UserRole};

/// Persisted admin notification
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminNotification {
    pub id: Uuid,
    /// None broadcasts to every admin
    pub admin_id: Option<Uuid>,
    pub borrow_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: AdminNotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminNotification {
    /// The deduplication key of the feed
    pub fn key(&self) -> (AdminNotificationType, Uuid, Option<Uuid>) {
        (self.kind, self.borrow_id, self.admin_id)
    }

    pub fn is_visible_to(&self, admin_id: Uuid) -> bool {
        self.admin_id.map_or(true, |id| id == admin_id)
    }
}

/// Notification to record, identity and timestamp assigned by the store
#[derive(Debug, Clone)]
pub struct NewAdminNotification {
    pub admin_id: Option<Uuid>,
    pub borrow_id: Uuid,
    pub kind: AdminNotificationType,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NewAdminNotification {
    /// A notice for all admins
    pub fn broadcast(
        kind: AdminNotificationType,
        borrow_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            admin_id: None,
            borrow_id,
            kind,
            title: title.into(),
            message: message.into(),
            created_at,
        }
    }

    pub fn key(&self) -> (AdminNotificationType, Uuid, Option<Uuid>) {
        (self.kind, self.borrow_id, self.admin_id)
    }
}

/// Kinds of notices derived for borrowers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserNotificationType {
    Overdue,
    DueSoon,
    ReturnRejected,
}

/// Derived notice, recomputed on every refresh
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    pub id: String,
    pub record_id: Uuid,
    pub box_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: UserNotificationType,
    pub days_left: Option<i64>,
    pub is_read: bool,
}

/// Notification feed as seen by the caller: admins get the persisted feed,
/// borrowers get notices derived from their records
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub audience: UserRole,
    pub unread_count: usize,
    pub admin_notifications: Vec<AdminNotification>,
    pub user_notifications: Vec<UserNotification>,
}

impl NotificationFeed {
    pub fn for_admin(notifications: Vec<AdminNotification>) -> Self {
        Self {
            audience: UserRole::Admin,
            unread_count: notifications.iter().filter(|n| !n.is_read).count(),
            admin_notifications: notifications,
            user_notifications: Vec::new(),
        }
    }

    pub fn for_user(notifications: Vec<UserNotification>) -> Self {
        Self {
            audience: UserRole::User,
            unread_count: notifications.iter().filter(|n| !n.is_read).count(),
            admin_notifications: Vec::new(),
            user_notifications: notifications,
        }
    }
}

/// Admin feed filter
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminNotificationFilter {
    /// Restrict to rows visible to this admin (own plus broadcast)
    pub visible_to: Option<Uuid>,
}
