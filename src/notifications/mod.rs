//! Notification derivation: due-date classification and per-user notices

pub mod builder;
pub mod due;

pub use builder::build_user_notifications;
pub use due::{days_left, is_due_tomorrow, should_show_due_notification, DueStatus};
