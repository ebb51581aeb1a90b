//! Borrow record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::RecordStatus;

/// One borrowed item and its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub box_id: Uuid,
    pub item_id: Uuid,
    pub status: RecordStatus,
    pub days_borrowed: i32,
    pub borrowed_at: DateTime<Utc>,
    pub return_request_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub proof_image_url: Option<String>,
    /// Set on rejection, cleared on resubmission or approval
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Guards against sending the due-soon reminder twice
    pub due_soon_notified_at: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    /// Whether an admin rejected the last return request and it was not resubmitted yet
    pub fn is_rejected(&self) -> bool {
        self.status == RecordStatus::Borrowing && self.admin_note.is_some()
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.borrowed_at + chrono::Duration::days(self.days_borrowed as i64)
    }
}

/// Borrower and terms shared by every record of one borrow
#[derive(Debug, Clone)]
pub struct NewBorrow {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub box_id: Uuid,
    pub days_borrowed: i32,
    pub borrowed_at: DateTime<Utc>,
    pub proof_image_url: Option<String>,
}

/// Mutable lifecycle fields written back after a transition
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub status: RecordStatus,
    pub return_request_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub proof_image_url: Option<String>,
    pub admin_note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BorrowRecord> for RecordUpdate {
    fn from(record: &BorrowRecord) -> Self {
        Self {
            status: record.status,
            return_request_date: record.return_request_date,
            returned_at: record.returned_at,
            proof_image_url: record.proof_image_url.clone(),
            admin_note: record.admin_note.clone(),
            updated_at: record.updated_at,
        }
    }
}

/// Record listing filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    pub user_id: Option<Uuid>,
    pub box_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
    /// Exclude returned records
    #[serde(default)]
    pub active_only: bool,
}

impl RecordQuery {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &BorrowRecord) -> bool {
        self.user_id.map_or(true, |id| record.user_id == id)
            && self.box_id.map_or(true, |id| record.box_id == id)
            && self.status.map_or(true, |s| record.status == s)
            && (!self.active_only || record.status.is_active())
    }
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[validate(range(min = 1, message = "Borrow at least one day"))]
    pub days: i32,
    pub proof_image_url: Option<String>,
}

/// Return request for one record
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(length(min = 1, message = "Proof image is required"))]
    pub proof_image_url: String,
}

/// Return request for several records of the same box
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchReturnRequest {
    #[validate(length(min = 1, message = "At least one record is required"))]
    pub record_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "Proof image is required"))]
    pub proof_image_url: String,
}

/// Admin decision on a pending return
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReturn {
    pub approved: bool,
    pub note: Option<String>,
}

/// Statuses an admin may force records into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum OverrideStatus {
    Borrowing,
    Returned,
}

/// Admin override of several records
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusUpdate {
    #[validate(length(min = 1, message = "At least one record is required"))]
    pub record_ids: Vec<Uuid>,
    pub status: OverrideStatus,
}

/// Admin bulk delete
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecords {
    pub record_ids: Vec<Uuid>,
}
