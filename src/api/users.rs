//! User management endpoints (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{CreateAdmin, User, UserMessage},
    AppState,
};

use super::AuthenticatedUser;

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of users", body = Vec<User>),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require_admin()?;

    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Create another administrator
#[utoipa::path(
    post,
    path = "/users/admins",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = crate::models::user::RegisterUser,
    responses(
        (status = 201, description = "Admin created", body = User),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_admin(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateAdmin>,
) -> AppResult<(StatusCode, Json<User>)> {
    request.validate()?;

    let admin = state.services.users.create_admin(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not allowed to delete this user", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.users.admin_delete_user(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send an email to a user
#[utoipa::path(
    post,
    path = "/users/{id}/message",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UserMessage,
    responses(
        (status = 204, description = "Message sent"),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(message): Json<UserMessage>,
) -> AppResult<StatusCode> {
    message.validate()?;

    state.services.users.send_message(&claims, id, message).await?;
    Ok(StatusCode::NO_CONTENT)
}
