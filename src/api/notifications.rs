//! Notification endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppResult, models::NotificationFeed, services::notifications::SweepReport, AppState};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct AffectedResponse {
    pub affected: u64,
}

/// Notification feed of the caller
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Admin feed for admins, derived notices for borrowers", body = NotificationFeed)
    )
)]
pub async fn get_feed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<NotificationFeed>> {
    let feed = state.services.notifications.feed(&claims).await?;
    Ok(Json(feed))
}

/// Mark one admin notification read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.notifications.mark_read(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark every visible admin notification read
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications marked read", body = AffectedResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<AffectedResponse>> {
    let affected = state.services.notifications.mark_all_read(&claims).await?;
    Ok(Json(AffectedResponse { affected }))
}

/// Delete every visible admin notification
#[utoipa::path(
    delete,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications cleared", body = AffectedResponse)
    )
)]
pub async fn clear(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<AffectedResponse>> {
    let affected = state.services.notifications.clear(&claims).await?;
    Ok(Json(AffectedResponse { affected }))
}

/// Run the due-soon sweep now
#[utoipa::path(
    post,
    path = "/notifications/sweep",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorResponse)
    )
)]
pub async fn run_sweep(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepReport>> {
    claims.require_admin()?;

    let report = state.services.notifications.run_due_soon_sweep().await;
    Ok(Json(report))
}
