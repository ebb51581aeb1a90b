//! Due date arithmetic for borrow records

use chrono::{DateTime, Utc};

use crate::models::{BorrowRecord, RecordStatus};

/// Milliseconds in one day
pub const DAY_MS: i64 = 86_400_000;

/// Milliseconds from `now` until the record is due; negative once overdue.
pub fn millis_until_due(borrowed_at: DateTime<Utc>, days_borrowed: i32, now: DateTime<Utc>) -> i64 {
    let due = borrowed_at.timestamp_millis() + days_borrowed as i64 * DAY_MS;
    due - now.timestamp_millis()
}

/// Whole days left before the due date, rounded up.
///
/// Any part of a day counts as a full day, so a record due in 3 hours has
/// one day left and a record 3 hours late has zero.
pub fn days_left(borrowed_at: DateTime<Utc>, days_borrowed: i32, now: DateTime<Utc>) -> i64 {
    ceil_days(millis_until_due(borrowed_at, days_borrowed, now))
}

fn ceil_days(millis: i64) -> i64 {
    let days = millis.div_euclid(DAY_MS);
    if millis.rem_euclid(DAY_MS) > 0 {
        days + 1
    } else {
        days
    }
}

/// Due classification of a record relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue { days_late: i64 },
    DueToday,
    Remaining { days: i64 },
}

impl DueStatus {
    pub fn from_days_left(days_left: i64) -> Self {
        match days_left {
            d if d < 0 => DueStatus::Overdue { days_late: -d },
            0 => DueStatus::DueToday,
            d => DueStatus::Remaining { days: d },
        }
    }

    pub fn of(record: &BorrowRecord, now: DateTime<Utc>) -> Self {
        Self::from_days_left(days_left(record.borrowed_at, record.days_borrowed, now))
    }

    pub fn days_left(&self) -> i64 {
        match *self {
            DueStatus::Overdue { days_late } => -days_late,
            DueStatus::DueToday => 0,
            DueStatus::Remaining { days } => days,
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, DueStatus::Overdue { .. })
    }

    /// Short human readable description
    pub fn describe(&self) -> String {
        match *self {
            DueStatus::Overdue { days_late } => format!("Overdue by {} {}", days_late, plural_days(days_late)),
            DueStatus::DueToday => "Due today".to_string(),
            DueStatus::Remaining { days } => format!("Due in {} {}", days, plural_days(days)),
        }
    }
}

fn plural_days(n: i64) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

/// Whether a record should surface a due/overdue notice: not returned and
/// due within `window_days` (overdue records always qualify).
pub fn should_show_due_notification(record: &BorrowRecord, now: DateTime<Utc>, window_days: i64) -> bool {
    record.status != RecordStatus::Returned
        && days_left(record.borrowed_at, record.days_borrowed, now) <= window_days
}

/// Whether the record falls due within the next day and is not yet late.
pub fn is_due_tomorrow(record: &BorrowRecord, now: DateTime<Utc>) -> bool {
    let millis = millis_until_due(record.borrowed_at, record.days_borrowed, now);
    millis > 0 && ceil_days(millis) == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_overdue_by_two_days() {
        let borrowed = now() - Duration::days(9);
        assert_eq!(days_left(borrowed, 7, now()), -2);
        assert_eq!(
            DueStatus::from_days_left(days_left(borrowed, 7, now())),
            DueStatus::Overdue { days_late: 2 }
        );
    }

    #[test]
    fn test_due_tomorrow() {
        let borrowed = now() - Duration::days(6);
        assert_eq!(days_left(borrowed, 7, now()), 1);
    }

    #[test]
    fn test_partial_days_round_up() {
        let borrowed = now() - Duration::days(6) - Duration::hours(21);
        assert_eq!(days_left(borrowed, 7, now()), 1);

        // three hours late still counts as due today
        let borrowed = now() - Duration::days(7) - Duration::hours(3);
        assert_eq!(days_left(borrowed, 7, now()), 0);

        let borrowed = now() - Duration::days(8) - Duration::hours(1);
        assert_eq!(days_left(borrowed, 7, now()), -1);
    }

    #[test]
    fn test_zero_days_left_is_due_today() {
        for hours_late in 0..24 {
            let borrowed = now() - Duration::days(7) - Duration::hours(hours_late);
            let status = DueStatus::from_days_left(days_left(borrowed, 7, now()));
            assert_eq!(status, DueStatus::DueToday, "{} hours late", hours_late);
            assert!(!status.is_overdue());
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(DueStatus::Overdue { days_late: 1 }.describe(), "Overdue by 1 day");
        assert_eq!(DueStatus::Remaining { days: 3 }.describe(), "Due in 3 days");
        assert_eq!(DueStatus::DueToday.describe(), "Due today");
        assert_eq!(DueStatus::Overdue { days_late: 4 }.days_left(), -4);
    }
}
