//! End-to-end service flows on the in-memory store

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use uuid::Uuid;

use boxbox_server::{
    clock::{Clock, FixedClock},
    config::AppConfig,
    models::{
        item_box::{CreateBox, ItemSpec, UpdateBox},
        notification::UserNotificationType,
        record::{
            BatchReturnRequest, BatchStatusUpdate, BorrowRequest, DeleteRecords, OverrideStatus, RecordQuery,
            ReturnRequest, ReviewReturn,
        },
        user::RegisterUser,
        AdminNotificationType, ItemStatus, PopulatedBox, RecordStatus, User, UserClaims,
    },
    repository::{AdminNotificationStore, ItemStore, MemoryStore},
    services::Services,
    AppError,
};

struct Harness {
    services: Services,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));
    let services = Services::new(store.clone(), clock.clone(), &AppConfig::default());
    Harness { services, store, clock }
}

fn claims_for(user: &User) -> UserClaims {
    UserClaims {
        sub: user.email.clone(),
        user_id: user.id,
        role: user.role,
        exp: i64::MAX,
        iat: 0,
    }
}

fn registration(name: &str, email: &str) -> RegisterUser {
    RegisterUser {
        name: name.to_string(),
        phone: "0612345678".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
    }
}

async fn borrower(h: &Harness, email: &str) -> UserClaims {
    let (_, user) = h.services.users.register(registration("Alice", email)).await.unwrap();
    claims_for(&user)
}

async fn main_admin(h: &Harness) -> UserClaims {
    h.services.users.ensure_default_admin().await.unwrap();
    let (_, admin) = h
        .services
        .users
        .authenticate("admin@example.com", "admin1234")
        .await
        .unwrap();
    claims_for(&admin)
}

async fn create_box(h: &Harness, items: &[(&str, u32)]) -> PopulatedBox {
    h.services
        .boxes
        .create(CreateBox {
            name: "Craft box".to_string(),
            box_type: "crafts".to_string(),
            cover_image_url: None,
            items: items
                .iter()
                .map(|(name, quantity)| ItemSpec {
                    name: name.to_string(),
                    image_url: String::new(),
                    quantity: *quantity,
                })
                .collect(),
        })
        .await
        .unwrap()
}

fn borrow_for(days: i32) -> BorrowRequest {
    BorrowRequest {
        days,
        proof_image_url: None,
    }
}

fn proof() -> ReturnRequest {
    ReturnRequest {
        proof_image_url: "https://img.example.com/proof.jpg".to_string(),
    }
}

async fn notices_of(h: &Harness, kind: AdminNotificationType) -> usize {
    h.store
        .admin_notification_list(Default::default())
        .await
        .unwrap()
        .iter()
        .filter(|n| n.kind == kind)
        .count()
}

#[tokio::test]
async fn test_borrow_marks_items_and_notifies_admins_once() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 2), ("glue", 1)]).await;
    assert_eq!(item_box.available_count, 3);

    let records = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == RecordStatus::Borrowing));

    let items = h.store.item_list(Some(item_box.item_box.id)).await.unwrap();
    assert!(items.iter().all(|i| i.status == ItemStatus::Borrowing));
    assert_eq!(notices_of(&h, AdminNotificationType::BorrowCreated).await, 1);

    let err = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

#[tokio::test]
async fn test_borrow_rejects_out_of_range_days() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;

    let err = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_rejected_return_resubmission_flags_admins() {
    let h = harness();
    let admin = main_admin(&h).await;
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let record = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap()
        .remove(0);

    h.services.records.request_return(&user, record.id, proof()).await.unwrap();
    assert_eq!(notices_of(&h, AdminNotificationType::ReturnRequested).await, 1);

    let rejected = h
        .services
        .records
        .review(
            &admin,
            record.id,
            ReviewReturn {
                approved: false,
                note: Some("Photo is blurry".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, RecordStatus::Borrowing);
    assert_eq!(rejected.admin_note.as_deref(), Some("Photo is blurry"));
    assert!(rejected.return_request_date.is_none());

    let resubmitted = h.services.records.request_return(&user, record.id, proof()).await.unwrap();
    assert_eq!(resubmitted.status, RecordStatus::PendingReturn);
    assert!(resubmitted.admin_note.is_none());
    assert_eq!(notices_of(&h, AdminNotificationType::ReturnRejectedNewRequest).await, 1);
}

#[tokio::test]
async fn test_approved_return_frees_item() {
    let h = harness();
    let admin = main_admin(&h).await;
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let record = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap()
        .remove(0);

    h.services.records.request_return(&user, record.id, proof()).await.unwrap();
    let returned = h
        .services
        .records
        .review(
            &admin,
            record.id,
            ReviewReturn {
                approved: true,
                note: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(returned.status, RecordStatus::Returned);
    assert!(returned.returned_at.is_some());
    let items = h.store.item_list(Some(item_box.item_box.id)).await.unwrap();
    assert_eq!(items[0].status, ItemStatus::Available);
}

#[tokio::test]
async fn test_return_by_other_borrower_forbidden() {
    let h = harness();
    let alice = borrower(&h, "alice@example.com").await;
    let bob = borrower(&h, "bob@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let record = h
        .services
        .records
        .borrow(&alice, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap()
        .remove(0);

    let err = h
        .services
        .records
        .request_return(&bob, record.id, proof())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let own = h
        .services
        .records
        .list(&bob, RecordQuery::default())
        .await
        .unwrap();
    assert!(own.is_empty());
}

#[tokio::test]
async fn test_deleting_active_record_reclaims_item() {
    let h = harness();
    let admin = main_admin(&h).await;
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let record = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap()
        .remove(0);

    let deleted = h
        .services
        .records
        .delete_records(
            &admin,
            DeleteRecords {
                record_ids: vec![record.id],
            },
        )
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let refreshed = h.services.boxes.get(item_box.item_box.id).await.unwrap();
    assert_eq!(refreshed.available_count, 1);
}

#[tokio::test]
async fn test_box_update_keeps_borrowed_items() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let box_id = item_box.item_box.id;
    h.services.records.borrow(&user, box_id, borrow_for(7)).await.unwrap();

    let updated = h
        .services
        .boxes
        .update(
            box_id,
            UpdateBox {
                name: Some("Craft box v2".to_string()),
                box_type: None,
                cover_image_url: None,
                items: vec![
                    ItemSpec {
                        name: "scissors".to_string(),
                        image_url: String::new(),
                        quantity: 0,
                    },
                    ItemSpec {
                        name: "tape".to_string(),
                        image_url: String::new(),
                        quantity: 2,
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.item_box.name, "Craft box v2");
    assert_eq!(updated.item_count, 3);
    assert_eq!(updated.available_count, 2);
}

#[tokio::test]
async fn test_due_soon_sweep_reminds_once() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    h.services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(2))
        .await
        .unwrap();

    let early = h.services.notifications.run_due_soon_sweep().await;
    assert_eq!(early.emails_sent, 0);

    h.clock.advance(Duration::hours(25));

    let first = h.services.notifications.run_due_soon_sweep().await;
    assert_eq!(first.emails_sent, 1);
    assert_eq!(first.admin_notices_created, 1);
    assert_eq!(first.failures, 0);

    let second = h.services.notifications.run_due_soon_sweep().await;
    assert_eq!(second.emails_sent, 0);
    assert_eq!(second.admin_notices_created, 0);
    assert_eq!(notices_of(&h, AdminNotificationType::BorrowDueSoon).await, 1);
}

#[tokio::test]
async fn test_borrower_feed_lists_due_records() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    h.services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(2))
        .await
        .unwrap();

    let feed = h.services.notifications.feed(&user).await.unwrap();
    assert!(feed.admin_notifications.is_empty());
    assert_eq!(feed.user_notifications.len(), 1);

    let err = h.services.notifications.mark_all_read(&user).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[tokio::test]
async fn test_main_admin_protected_from_other_admins() {
    let h = harness();
    let main = main_admin(&h).await;
    let other = h
        .services
        .users
        .create_admin(&main, registration("Second", "second@example.com"))
        .await
        .unwrap();
    let other_claims = claims_for(&other);

    let err = h
        .services
        .users
        .admin_delete_user(&other_claims, main.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    h.services.users.admin_delete_user(&main, other.id).await.unwrap();
    assert!(h.services.users.get_by_id(other.id).await.is_err());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let h = harness();
    borrower(&h, "alice@example.com").await;

    let err = h
        .services
        .users
        .register(registration("Alice again", "ALICE@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

fn reject(note: &str) -> ReviewReturn {
    ReviewReturn {
        approved: false,
        note: Some(note.to_string()),
    }
}

#[tokio::test]
async fn test_batch_return_after_rejection_sends_one_resubmission_notice() {
    let h = harness();
    let admin = main_admin(&h).await;
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 2)]).await;
    let records = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap();
    let (first, second) = (records[0].id, records[1].id);

    h.services.records.request_return(&user, second, proof()).await.unwrap();
    h.services.records.review(&admin, second, reject("Missing blade")).await.unwrap();

    let returned = h
        .services
        .records
        .request_return_batch(
            &user,
            BatchReturnRequest {
                record_ids: vec![first, second],
                proof_image_url: "https://img.example.com/both.jpg".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(returned
        .iter()
        .all(|r| r.status == RecordStatus::PendingReturn && r.admin_note.is_none()));

    let resubmissions: Vec<_> = h
        .store
        .admin_notification_list(Default::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == AdminNotificationType::ReturnRejectedNewRequest)
        .collect();
    assert_eq!(resubmissions.len(), 1);
    assert_eq!(resubmissions[0].borrow_id, first);

    let items = h.store.item_list(Some(item_box.item_box.id)).await.unwrap();
    assert!(items.iter().all(|i| i.status == ItemStatus::PendingReturn));
}

#[tokio::test]
async fn test_batch_return_changes_nothing_when_one_record_is_not_borrowed() {
    let h = harness();
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 2)]).await;
    let records = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap();
    let (first, second) = (records[0].id, records[1].id);
    h.services.records.request_return(&user, second, proof()).await.unwrap();

    let err = h
        .services
        .records
        .request_return_batch(
            &user,
            BatchReturnRequest {
                record_ids: vec![first, second],
                proof_image_url: "https://img.example.com/both.jpg".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));

    let untouched = h.services.records.get(&user, first).await.unwrap();
    assert_eq!(untouched.status, RecordStatus::Borrowing);
    assert!(untouched.return_request_date.is_none());
    let item = h
        .store
        .item_list(Some(item_box.item_box.id))
        .await
        .unwrap()
        .into_iter()
        .find(|i| i.id == untouched.item_id)
        .unwrap();
    assert_eq!(item.status, ItemStatus::Borrowing);
}

#[tokio::test]
async fn test_override_to_returned_clears_rejection_note() {
    let h = harness();
    let admin = main_admin(&h).await;
    let user = borrower(&h, "alice@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let record = h
        .services
        .records
        .borrow(&user, item_box.item_box.id, borrow_for(7))
        .await
        .unwrap()
        .remove(0);
    h.services.records.request_return(&user, record.id, proof()).await.unwrap();
    h.services.records.review(&admin, record.id, reject("Broken")).await.unwrap();

    let forced = h
        .services
        .records
        .batch_override(
            &admin,
            BatchStatusUpdate {
                record_ids: vec![record.id, Uuid::new_v4()],
                status: OverrideStatus::Returned,
            },
        )
        .await
        .unwrap();
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0].status, RecordStatus::Returned);
    assert_eq!(forced[0].returned_at, Some(h.clock.now()));
    assert!(forced[0].admin_note.is_none());
    let items = h.store.item_list(Some(item_box.item_box.id)).await.unwrap();
    assert_eq!(items[0].status, ItemStatus::Available);

    let reopened = h
        .services
        .records
        .batch_override(
            &admin,
            BatchStatusUpdate {
                record_ids: vec![record.id],
                status: OverrideStatus::Borrowing,
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened[0].status, RecordStatus::Borrowing);
    assert!(reopened[0].returned_at.is_none());

    let feed = h.services.notifications.feed(&user).await.unwrap();
    assert!(feed
        .user_notifications
        .iter()
        .all(|n| n.kind != UserNotificationType::ReturnRejected));
}

#[tokio::test]
async fn test_concurrent_borrows_lend_each_item_once() {
    let h = harness();
    let alice = borrower(&h, "alice@example.com").await;
    let bob = borrower(&h, "bob@example.com").await;
    let item_box = create_box(&h, &[("scissors", 1)]).await;
    let box_id = item_box.item_box.id;

    let (a, b) = tokio::join!(
        h.services.records.borrow(&alice, box_id, borrow_for(7)),
        h.services.records.borrow(&bob, box_id, borrow_for(7)),
    );
    let lent: usize = [a, b].into_iter().filter_map(Result::ok).map(|r| r.len()).sum();
    assert_eq!(lent, 1);

    let active = h
        .services
        .records
        .list(&main_admin(&h).await, RecordQuery::active())
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}
