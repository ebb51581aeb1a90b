//! Shared domain enums, stored as TEXT columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements string conversion and the sqlx TEXT mapping for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UserRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

text_enum!(UserRole {
    User => "user",
    Admin => "admin",
});

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Physical item availability, mirrors the lifecycle of its active record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Available,
    Borrowing,
    PendingReturn,
}

text_enum!(ItemStatus {
    Available => "available",
    Borrowing => "borrowing",
    PendingReturn => "pendingReturn",
});

// ---------------------------------------------------------------------------
// RecordStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    Borrowing,
    PendingReturn,
    Returned,
}

text_enum!(RecordStatus {
    Borrowing => "borrowing",
    PendingReturn => "pendingReturn",
    Returned => "returned",
});

impl RecordStatus {
    /// Item status matching a record in this state
    pub fn item_status(&self) -> ItemStatus {
        match self {
            RecordStatus::Borrowing => ItemStatus::Borrowing,
            RecordStatus::PendingReturn => ItemStatus::PendingReturn,
            RecordStatus::Returned => ItemStatus::Available,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, RecordStatus::Returned)
    }
}

// ---------------------------------------------------------------------------
// AdminNotificationType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminNotificationType {
    BorrowCreated,
    ReturnRequested,
    ReturnRejectedNewRequest,
    BorrowDueSoon,
}

text_enum!(AdminNotificationType {
    BorrowCreated => "BORROW_CREATED",
    ReturnRequested => "RETURN_REQUESTED",
    ReturnRejectedNewRequest => "RETURN_REJECTED_NEW_REQUEST",
    BorrowDueSoon => "BORROW_DUE_SOON",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_matches_serde() {
        let status: RecordStatus = "pendingReturn".parse().unwrap();
        assert_eq!(status, RecordStatus::PendingReturn);
        assert_eq!(
            serde_json::to_string(&RecordStatus::PendingReturn).unwrap(),
            format!("\"{}\"", RecordStatus::PendingReturn.as_str())
        );
        assert_eq!(
            serde_json::to_string(&AdminNotificationType::ReturnRejectedNewRequest).unwrap(),
            "\"RETURN_REJECTED_NEW_REQUEST\""
        );
    }

    #[test]
    fn test_unknown_text_rejected() {
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_record_status_item_mapping() {
        assert_eq!(RecordStatus::Returned.item_status(), ItemStatus::Available);
        assert!(!RecordStatus::Returned.is_active());
        assert!(RecordStatus::PendingReturn.is_active());
    }
}
