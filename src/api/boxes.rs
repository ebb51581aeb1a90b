//! Box and item endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        item_box::{CreateBox, UpdateBox},
        Item, PopulatedBox,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List boxes with item counts
#[utoipa::path(
    get,
    path = "/boxes",
    tag = "boxes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Boxes with item and availability counts", body = Vec<PopulatedBox>)
    )
)]
pub async fn list_boxes(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<PopulatedBox>>> {
    let boxes = state.services.boxes.list().await?;
    Ok(Json(boxes))
}

/// Create a box and its items
#[utoipa::path(
    post,
    path = "/boxes",
    tag = "boxes",
    security(("bearer_auth" = [])),
    request_body = CreateBox,
    responses(
        (status = 201, description = "Box created", body = PopulatedBox),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_box(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBox>,
) -> AppResult<(StatusCode, Json<PopulatedBox>)> {
    claims.require_admin()?;
    request.validate()?;

    let created = state.services.boxes.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Items of one box
#[utoipa::path(
    get,
    path = "/boxes/{id}/items",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Box ID")
    ),
    responses(
        (status = 200, description = "Items in the box", body = Vec<Item>),
        (status = 404, description = "Box not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_box_items(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.boxes.items(id).await?;
    Ok(Json(items))
}

/// Update a box; `items` is the complete desired item configuration
#[utoipa::path(
    put,
    path = "/boxes/{id}",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Box ID")
    ),
    request_body = UpdateBox,
    responses(
        (status = 200, description = "Box updated", body = PopulatedBox),
        (status = 404, description = "Box not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_box(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBox>,
) -> AppResult<Json<PopulatedBox>> {
    claims.require_admin()?;
    request.validate()?;

    let updated = state.services.boxes.update(id, request).await?;
    Ok(Json(updated))
}

/// Delete a box and its items
#[utoipa::path(
    delete,
    path = "/boxes/{id}",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Box ID")
    ),
    responses(
        (status = 204, description = "Box deleted"),
        (status = 404, description = "Box not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_box(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.boxes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All items of every box
#[utoipa::path(
    get,
    path = "/items",
    tag = "boxes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All items", body = Vec<Item>)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.boxes.all_items().await?;
    Ok(Json(items))
}
