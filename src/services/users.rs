//! Authentication and user management service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;

use super::{
    bus::{ChangeBus, ChangedEntity},
    email::EmailService,
};
use crate::{
    clock::Clock,
    config::{AuthConfig, UsersConfig},
    error::{AppError, AppResult},
    models::{
        user::{ChangePassword, CreateAdmin, NewUser, RegisterUser, UpdateProfile, UserMessage},
        User, UserClaims, UserRole,
    },
    repository::{Store, UserStore},
};

const DEFAULT_ADMIN_PHONE: &str = "0000000000";

#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    bus: ChangeBus,
    email: EmailService,
    auth: AuthConfig,
    config: UsersConfig,
}

impl UsersService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        bus: ChangeBus,
        email: EmailService,
        auth: AuthConfig,
        config: UsersConfig,
    ) -> Self {
        Self {
            store,
            clock,
            bus,
            email,
            auth,
            config,
        }
    }

    /// Register a borrower account and log it in
    pub async fn register(&self, data: RegisterUser) -> AppResult<(String, User)> {
        let user = self.create(data, UserRole::User).await?;
        tracing::info!(user_id = %user.id, "User registered");
        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Authenticate user by email and return JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .store
            .user_find_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = self.clock.now().timestamp();
        let exp = now + (self.auth.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.auth.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    async fn create(&self, data: RegisterUser, role: UserRole) -> AppResult<User> {
        let new_user = NewUser {
            name: data.name.trim().to_string(),
            phone: data.phone.trim().to_string(),
            email: data.email.trim().to_string(),
            role,
            password_hash: self.hash_password(&data.password)?,
        };

        let user = self.store.user_insert(&new_user, self.clock.now()).await?;
        self.bus.publish(ChangedEntity::Users, self.clock.now());
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.store.user_get(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.store.user_list().await
    }

    pub async fn update_profile(&self, user_id: Uuid, profile: UpdateProfile) -> AppResult<User> {
        let user = self.store.user_update_profile(user_id, &profile).await?;
        self.bus.publish(ChangedEntity::Users, self.clock.now());
        Ok(user)
    }

    pub async fn change_password(&self, user_id: Uuid, request: ChangePassword) -> AppResult<()> {
        let user = self.store.user_get(user_id).await?;
        if !self.verify_password(&user, &request.old_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = self.hash_password(&request.new_password)?;
        self.store.user_set_password(user_id, &hash).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Delete the caller's own account
    pub async fn delete_account(&self, user_id: Uuid) -> AppResult<()> {
        if !self.store.user_delete(user_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        tracing::info!(user_id = %user_id, "Account deleted");
        self.bus.publish(ChangedEntity::Users, self.clock.now());
        Ok(())
    }

    pub async fn create_admin(&self, requester: &UserClaims, data: CreateAdmin) -> AppResult<User> {
        requester.require_admin()?;
        let admin = self.create(data, UserRole::Admin).await?;
        tracing::info!(admin_id = %admin.id, created_by = %requester.user_id, "Admin created");
        Ok(admin)
    }

    /// Delete another user; only the main admin may delete the main admin
    pub async fn admin_delete_user(&self, requester: &UserClaims, target_id: Uuid) -> AppResult<()> {
        requester.require_admin()?;
        let target = self.store.user_get(target_id).await?;

        let main_admin = &self.config.default_admin_email;
        if target.email.eq_ignore_ascii_case(main_admin) && !requester.sub.eq_ignore_ascii_case(main_admin) {
            return Err(AppError::Authorization("The main administrator cannot be deleted".to_string()));
        }

        if !self.store.user_delete(target_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", target_id)));
        }
        tracing::info!(user_id = %target_id, deleted_by = %requester.user_id, "User deleted");
        self.bus.publish(ChangedEntity::Users, self.clock.now());
        Ok(())
    }

    /// Email a user on behalf of an admin
    pub async fn send_message(&self, requester: &UserClaims, user_id: Uuid, message: UserMessage) -> AppResult<()> {
        requester.require_admin()?;
        let user = self.store.user_get(user_id).await?;
        self.email
            .send_admin_message(&user.email, &message.subject, &message.message)
            .await
    }

    /// Seed the main admin account when it does not exist yet
    pub async fn ensure_default_admin(&self) -> AppResult<()> {
        if self
            .store
            .user_find_by_email(&self.config.default_admin_email)
            .await?
            .is_some()
        {
            return Ok(());
        }

        tracing::info!(email = %self.config.default_admin_email, "Creating default admin user");
        self.create(
            RegisterUser {
                name: self.config.default_admin_name.clone(),
                phone: DEFAULT_ADMIN_PHONE.to_string(),
                email: self.config.default_admin_email.clone(),
                password: self.config.default_admin_password.clone(),
            },
            UserRole::Admin,
        )
        .await?;
        Ok(())
    }
}
