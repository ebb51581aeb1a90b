//! Per-user notice derivation
//!
//! Records are grouped by box. Each box yields at most one rejection notice
//! and at most one due/overdue notice, whatever the number of items borrowed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use super::due::{should_show_due_notification, DueStatus};
use crate::models::{
    notification::{UserNotification, UserNotificationType},
    BorrowRecord,
};

const REJECTED_MESSAGE: &str = "Your latest return request was not approved";

/// Derive the notices for one borrower.
///
/// `records` may contain other users' records; only `user_id`'s active
/// records are considered. Records whose box is missing from `box_names`
/// are skipped. Boxes appear in the order of their first record.
pub fn build_user_notifications(
    user_id: Uuid,
    records: &[BorrowRecord],
    box_names: &HashMap<Uuid, String>,
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<UserNotification> {
    let mut by_box: IndexMap<Uuid, Vec<&BorrowRecord>> = IndexMap::new();

    for record in records
        .iter()
        .filter(|r| r.user_id == user_id && r.status.is_active())
    {
        if !box_names.contains_key(&record.box_id) {
            tracing::debug!(record_id = %record.id, box_id = %record.box_id, "Skipping record of a missing box");
            continue;
        }
        by_box.entry(record.box_id).or_default().push(record);
    }

    let mut notices = Vec::new();

    for (box_id, group) in by_box {
        let title = box_names.get(&box_id).cloned().unwrap_or_default();

        if let Some(rejected) = group
            .iter()
            .filter(|r| r.is_rejected())
            .max_by_key(|r| r.updated_at)
        {
            notices.push(UserNotification {
                id: format!("rejected-{}-{}", rejected.id, rejected.updated_at.timestamp_millis()),
                record_id: rejected.id,
                box_id,
                title: title.clone(),
                message: REJECTED_MESSAGE.to_string(),
                kind: UserNotificationType::ReturnRejected,
                days_left: None,
                is_read: false,
            });
        }

        // Overdue records have negative days left, so the smallest value is
        // also the worst status; ties keep the first record.
        let worst = group
            .iter()
            .filter(|r| should_show_due_notification(r, now, window_days))
            .map(|r| (*r, DueStatus::of(r, now)))
            .min_by_key(|(_, status)| status.days_left());

        if let Some((record, status)) = worst {
            let kind = if status.is_overdue() {
                UserNotificationType::Overdue
            } else {
                UserNotificationType::DueSoon
            };
            notices.push(UserNotification {
                id: format!("due-{}", record.id),
                record_id: record.id,
                box_id,
                title,
                message: status.describe(),
                kind,
                days_left: Some(status.days_left()),
                is_read: false,
            });
        }
    }

    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn record(user_id: Uuid, box_id: Uuid, days_ago: i64, days: i32) -> BorrowRecord {
        let borrowed_at = now() - Duration::days(days_ago);
        BorrowRecord {
            id: Uuid::new_v4(),
            user_id,
            user_name: "General User".to_string(),
            user_email: "user@example.com".to_string(),
            user_phone: "0898765432".to_string(),
            box_id,
            item_id: Uuid::new_v4(),
            status: RecordStatus::Borrowing,
            days_borrowed: days,
            borrowed_at,
            return_request_date: None,
            returned_at: None,
            proof_image_url: None,
            admin_note: None,
            created_at: borrowed_at,
            updated_at: borrowed_at,
            due_soon_notified_at: None,
        }
    }

    fn names(ids: &[Uuid]) -> HashMap<Uuid, String> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| (*id, format!("Box {}", i)))
            .collect()
    }

    #[test]
    fn test_nothing_for_records_far_from_due() {
        let (user, b) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![record(user, b, 1, 14)];
        assert!(build_user_notifications(user, &records, &names(&[b]), now(), 3).is_empty());
    }

    #[test]
    fn test_one_due_notice_per_box_picks_worst() {
        let (user, b) = (Uuid::new_v4(), Uuid::new_v4());
        let soon = record(user, b, 5, 7);
        let late = record(user, b, 10, 7);
        let later = record(user, b, 9, 7);
        let records = vec![soon, late.clone(), later];

        let notices = build_user_notifications(user, &records, &names(&[b]), now(), 3);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, UserNotificationType::Overdue);
        assert_eq!(notices[0].record_id, late.id);
        assert_eq!(notices[0].days_left, Some(-3));
        assert_eq!(notices[0].message, "Overdue by 3 days");
        assert_eq!(notices[0].id, format!("due-{}", late.id));
    }

    #[test]
    fn test_rejected_and_overdue_yield_one_of_each() {
        let (user, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rejected_a = record(user, b, 9, 7);
        rejected_a.admin_note = Some("Missing charger".to_string());
        let mut rejected_b = record(user, b, 9, 7);
        rejected_b.admin_note = Some("Broken".to_string());
        rejected_b.updated_at = now() - Duration::hours(1);
        let overdue = record(user, b, 12, 7);
        let records = vec![rejected_a, rejected_b.clone(), overdue.clone()];

        let notices = build_user_notifications(user, &records, &names(&[b]), now(), 3);
        let rejected: Vec<_> = notices
            .iter()
            .filter(|n| n.kind == UserNotificationType::ReturnRejected)
            .collect();
        let due: Vec<_> = notices
            .iter()
            .filter(|n| n.kind != UserNotificationType::ReturnRejected)
            .collect();

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].record_id, rejected_b.id);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].record_id, overdue.id);
    }

    #[test]
    fn test_due_today_is_due_soon_not_overdue() {
        let (user, b) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![record(user, b, 7, 7)];
        let notices = build_user_notifications(user, &records, &names(&[b]), now(), 3);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, UserNotificationType::DueSoon);
        assert_eq!(notices[0].message, "Due today");
    }

    #[test]
    fn test_separate_boxes_in_first_seen_order() {
        let (user, b1, b2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let records = vec![record(user, b2, 6, 7), record(user, b1, 8, 7)];
        let notices = build_user_notifications(user, &records, &names(&[b1, b2]), now(), 3);
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].box_id, b2);
        assert_eq!(notices[1].box_id, b1);
    }

    #[test]
    fn test_skips_other_users_returned_and_orphaned_records() {
        let (user, other, b, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut returned = record(user, b, 9, 7);
        returned.status = RecordStatus::Returned;
        returned.returned_at = Some(now());
        let records = vec![returned, record(other, b, 9, 7), record(user, gone, 9, 7)];

        assert!(build_user_notifications(user, &records, &names(&[b]), now(), 3).is_empty());
    }

    #[test]
    fn test_pending_return_still_counts_as_due() {
        let (user, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut pending = record(user, b, 9, 7);
        pending.status = RecordStatus::PendingReturn;
        pending.admin_note = None;
        let notices = build_user_notifications(user, &[pending], &names(&[b]), now(), 3);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, UserNotificationType::Overdue);
    }
}
