//! Borrowing and return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        record::{
            BatchReturnRequest, BatchStatusUpdate, BorrowRequest, DeleteRecords, RecordQuery, ReturnRequest,
            ReviewReturn,
        },
        BorrowRecord,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Result of a borrow action
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowResponse {
    /// Number of items borrowed
    pub borrowed: usize,
    pub records: Vec<BorrowRecord>,
}

/// Result of a bulk delete
#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Borrow all available items of a box
#[utoipa::path(
    post,
    path = "/boxes/{id}/borrow",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Box ID")
    ),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Box borrowed", body = BorrowResponse),
        (status = 400, description = "Invalid duration", body = crate::error::ErrorResponse),
        (status = 404, description = "Box not found", body = crate::error::ErrorResponse),
        (status = 422, description = "No items available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_box(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    request.validate()?;

    let records = state.services.records.borrow(&claims, id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            borrowed: records.len(),
            records,
        }),
    ))
}

/// List borrow records; borrowers only see their own
#[utoipa::path(
    get,
    path = "/records",
    tag = "records",
    security(("bearer_auth" = [])),
    params(RecordQuery),
    responses(
        (status = 200, description = "Borrow records", body = Vec<BorrowRecord>)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.records.list(&claims, query).await?;
    Ok(Json(records))
}

/// Request the return of one record
#[utoipa::path(
    post,
    path = "/records/{id}/return-request",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Record ID")
    ),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Return requested", body = BorrowRecord),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 422, description = "Record is not borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<BorrowRecord>> {
    request.validate()?;

    let record = state.services.records.request_return(&claims, id, request).await?;
    Ok(Json(record))
}

/// Request the return of several records with one proof
#[utoipa::path(
    post,
    path = "/records/return-request",
    tag = "records",
    security(("bearer_auth" = [])),
    request_body = BatchReturnRequest,
    responses(
        (status = 200, description = "Returns requested", body = Vec<BorrowRecord>),
        (status = 422, description = "A record is not borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_return_batch(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BatchReturnRequest>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    request.validate()?;

    let records = state.services.records.request_return_batch(&claims, request).await?;
    Ok(Json(records))
}

/// Approve or reject a pending return
#[utoipa::path(
    post,
    path = "/records/{id}/review",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Record ID")
    ),
    request_body = ReviewReturn,
    responses(
        (status = 200, description = "Return reviewed", body = BorrowRecord),
        (status = 422, description = "No pending return", body = crate::error::ErrorResponse)
    )
)]
pub async fn review_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewReturn>,
) -> AppResult<Json<BorrowRecord>> {
    let record = state.services.records.review(&claims, id, review).await?;
    Ok(Json(record))
}

/// Force records into borrowing or returned
#[utoipa::path(
    post,
    path = "/records/status",
    tag = "records",
    security(("bearer_auth" = [])),
    request_body = BatchStatusUpdate,
    responses(
        (status = 200, description = "Updated records", body = Vec<BorrowRecord>)
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BatchStatusUpdate>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    request.validate()?;

    let records = state.services.records.batch_override(&claims, request).await?;
    Ok(Json(records))
}

/// Delete records, returning active items to the shelf
#[utoipa::path(
    post,
    path = "/records/delete",
    tag = "records",
    security(("bearer_auth" = [])),
    request_body = DeleteRecords,
    responses(
        (status = 200, description = "Records deleted", body = DeleteResponse)
    )
)]
pub async fn delete_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<DeleteRecords>,
) -> AppResult<Json<DeleteResponse>> {
    let deleted = state.services.records.delete_records(&claims, request).await?;
    Ok(Json(DeleteResponse { deleted }))
}
