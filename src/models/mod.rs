//! Data models for BoxBox

pub mod enums;
pub mod item_box;
pub mod notification;
pub mod record;
pub mod user;

// Re-export commonly used types
pub use enums::{AdminNotificationType, ItemStatus, RecordStatus, UserRole};
pub use item_box::{Item, ItemBox, PopulatedBox};
pub use notification::{AdminNotification, NotificationFeed, UserNotification};
pub use record::BorrowRecord;
pub use user::{User, UserClaims};
