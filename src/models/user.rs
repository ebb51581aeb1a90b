//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::UserRole;
use crate::error::AppError;

/// User model from the store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub notify_on_borrow: bool,
    pub notify_on_return: bool,
    pub notify_on_rejected: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Data needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 6, max = 20, message = "Phone must be 6-20 characters"))]
    pub phone: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Admin-only request to create another admin
pub type CreateAdmin = RegisterUser;

/// Update own profile request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 6, max = 20, message = "Phone must be 6-20 characters"))]
    pub phone: Option<String>,
    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar_url: Option<String>,
    pub notify_on_borrow: Option<bool>,
    pub notify_on_return: Option<bool>,
    pub notify_on_rejected: Option<bool>,
}

/// Change password request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub old_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Admin message to a user, delivered by email
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserMessage {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Allow the owner of a resource, or any admin
    pub fn require_self_or_admin(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Not the owner of this record".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let claims = UserClaims {
            sub: "user@example.com".to_string(),
            user_id: Uuid::new_v4(),
            role: UserRole::User,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, claims.user_id);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_ownership_checks() {
        let owner = Uuid::new_v4();
        let claims = UserClaims {
            sub: "u".to_string(),
            user_id: owner,
            role: UserRole::User,
            exp: 0,
            iat: 0,
        };
        assert!(claims.require_self_or_admin(owner).is_ok());
        assert!(claims.require_self_or_admin(Uuid::new_v4()).is_err());
        assert!(claims.require_admin().is_err());
    }
}
