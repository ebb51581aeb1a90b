//! Notification feeds and the due-soon sweep

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    bus::{ChangeBus, ChangedEntity},
    email::EmailService,
};
use crate::{
    clock::Clock,
    config::NotificationsConfig,
    error::{AppError, AppResult},
    models::{
        notification::{AdminNotificationFilter, NewAdminNotification},
        record::RecordQuery,
        AdminNotificationType, BorrowRecord, NotificationFeed, UserClaims,
    },
    notifications::{build_user_notifications, is_due_tomorrow},
    repository::{AdminNotificationStore, BoxStore, RecordStore, Store, UserStore},
};

/// Outcome of one due-soon sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub emails_sent: usize,
    pub admin_notices_created: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct NotificationsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    bus: ChangeBus,
    email: EmailService,
    config: NotificationsConfig,
}

fn admin_filter(claims: &UserClaims) -> AppResult<AdminNotificationFilter> {
    claims.require_admin()?;
    Ok(AdminNotificationFilter {
        visible_to: Some(claims.user_id),
    })
}

impl NotificationsService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        bus: ChangeBus,
        email: EmailService,
        config: NotificationsConfig,
    ) -> Self {
        Self {
            store,
            clock,
            bus,
            email,
            config,
        }
    }

    async fn box_names(&self) -> AppResult<HashMap<Uuid, String>> {
        Ok(self
            .store
            .box_list()
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect())
    }

    /// Persisted feed for admins, derived notices for borrowers
    pub async fn feed(&self, claims: &UserClaims) -> AppResult<NotificationFeed> {
        if claims.is_admin() {
            let rows = self.store.admin_notification_list(admin_filter(claims)?).await?;
            return Ok(NotificationFeed::for_admin(rows));
        }

        let query = RecordQuery {
            user_id: Some(claims.user_id),
            ..RecordQuery::active()
        };
        let records = self.store.record_list(&query).await?;
        let names = self.box_names().await?;

        Ok(NotificationFeed::for_user(build_user_notifications(
            claims.user_id,
            &records,
            &names,
            self.clock.now(),
            self.config.due_window_days,
        )))
    }

    pub async fn mark_read(&self, claims: &UserClaims, id: Uuid) -> AppResult<()> {
        self.store.admin_notification_mark_read(id, admin_filter(claims)?).await?;
        self.bus.publish(ChangedEntity::AdminNotifications, self.clock.now());
        Ok(())
    }

    pub async fn mark_all_read(&self, claims: &UserClaims) -> AppResult<u64> {
        let changed = self.store.admin_notification_mark_all_read(admin_filter(claims)?).await?;
        self.bus.publish(ChangedEntity::AdminNotifications, self.clock.now());
        Ok(changed)
    }

    pub async fn clear(&self, claims: &UserClaims) -> AppResult<u64> {
        let removed = self.store.admin_notification_clear(admin_filter(claims)?).await?;
        tracing::info!(admin_id = %claims.user_id, removed, "Admin notifications cleared");
        self.bus.publish(ChangedEntity::AdminNotifications, self.clock.now());
        Ok(removed)
    }

    /// Record an admin notice unless the same (type, borrow, admin) exists
    pub async fn record(&self, notification: NewAdminNotification) -> AppResult<bool> {
        let inserted = self.store.admin_notification_insert_if_absent(&notification).await?;
        if inserted {
            self.bus.publish(ChangedEntity::AdminNotifications, notification.created_at);
        } else {
            tracing::debug!(
                kind = %notification.kind,
                borrow_id = %notification.borrow_id,
                "Skipped duplicate admin notification"
            );
        }
        Ok(inserted)
    }

    /// Remind borrowers whose records fall due within the next day.
    ///
    /// Each record gets at most one reminder email. A deduplicated
    /// `BORROW_DUE_SOON` admin notice is attempted on every run. Failures on
    /// one record are logged and counted without stopping the sweep.
    pub async fn run_due_soon_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let loaded = async {
            let records = self.store.record_list(&RecordQuery::active()).await?;
            let names = self.box_names().await?;
            Ok::<_, AppError>((records, names))
        }
        .await;

        let (records, names) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "Due-soon sweep aborted: could not load records");
                return report;
            }
        };

        for record in records.iter().filter(|r| is_due_tomorrow(r, now)) {
            let box_name = names.get(&record.box_id).map(String::as_str);

            match self.remind_borrower(record, box_name).await {
                Ok(true) => report.emails_sent += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(record_id = %record.id, error = %e, "Due-soon reminder failed");
                }
            }

            let notice = NewAdminNotification::broadcast(
                AdminNotificationType::BorrowDueSoon,
                record.id,
                box_name.unwrap_or("Due Soon"),
                "This box is due in 1 day",
                now,
            );
            match self.record(notice).await {
                Ok(true) => report.admin_notices_created += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(record_id = %record.id, error = %e, "Due-soon admin notice failed");
                }
            }
        }
        report.scanned = records.len();

        if report.emails_sent > 0 {
            self.bus.publish(ChangedEntity::Records, now);
        }
        tracing::info!(
            scanned = report.scanned,
            emails_sent = report.emails_sent,
            admin_notices_created = report.admin_notices_created,
            failures = report.failures,
            "Due-soon sweep finished"
        );
        report
    }

    /// Claim the record's reminder flag and email the borrower; false when
    /// already reminded or the borrower no longer exists
    async fn remind_borrower(&self, record: &BorrowRecord, box_name: Option<&str>) -> AppResult<bool> {
        if record.due_soon_notified_at.is_some() {
            return Ok(false);
        }

        let user = match self.store.user_get(record.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        if !self
            .store
            .record_mark_due_soon_notified(record.id, self.clock.now())
            .await?
        {
            return Ok(false);
        }

        self.email
            .send_due_soon(&user.email, &user.name, box_name.unwrap_or("your items"), record.due_at())
            .await?;
        Ok(true)
    }

    /// Run the sweep every `sweep_interval_minutes`; None when disabled
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        if self.config.sweep_interval_minutes == 0 {
            return None;
        }

        let period = Duration::from_secs(self.config.sweep_interval_minutes * 60);
        let service = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.run_due_soon_sweep().await;
            }
        }))
    }
}
