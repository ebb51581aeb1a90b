//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, boxes, events, health, notifications, records, users};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BoxBox API",
        version = "0.3.0",
        description = "Shared item box borrowing and return tracking REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::update_profile,
        auth::change_password,
        auth::delete_account,
        // Users
        users::list_users,
        users::create_admin,
        users::delete_user,
        users::send_message,
        // Boxes
        boxes::list_boxes,
        boxes::create_box,
        boxes::list_box_items,
        boxes::update_box,
        boxes::delete_box,
        boxes::list_items,
        // Records
        records::borrow_box,
        records::list_records,
        records::request_return,
        records::request_return_batch,
        records::review_return,
        records::update_status,
        records::delete_records,
        // Notifications
        notifications::get_feed,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::clear,
        notifications::run_sweep,
        // Events
        events::stream_events,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::User,
            crate::models::UserRole,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateProfile,
            crate::models::user::ChangePassword,
            crate::models::user::UserMessage,
            // Boxes
            crate::models::ItemBox,
            crate::models::PopulatedBox,
            crate::models::Item,
            crate::models::ItemStatus,
            crate::models::item_box::ItemSpec,
            crate::models::item_box::CreateBox,
            crate::models::item_box::UpdateBox,
            // Records
            crate::models::BorrowRecord,
            crate::models::RecordStatus,
            crate::models::record::RecordQuery,
            crate::models::record::BorrowRequest,
            crate::models::record::ReturnRequest,
            crate::models::record::BatchReturnRequest,
            crate::models::record::ReviewReturn,
            crate::models::record::OverrideStatus,
            crate::models::record::BatchStatusUpdate,
            crate::models::record::DeleteRecords,
            records::BorrowResponse,
            records::DeleteResponse,
            // Notifications
            crate::models::AdminNotification,
            crate::models::AdminNotificationType,
            crate::models::UserNotification,
            crate::models::notification::UserNotificationType,
            crate::models::NotificationFeed,
            crate::services::notifications::SweepReport,
            notifications::AffectedResponse,
            // Events
            crate::services::bus::ChangeEvent,
            crate::services::bus::ChangedEntity,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and own account"),
        (name = "users", description = "User management"),
        (name = "boxes", description = "Boxes and items"),
        (name = "records", description = "Borrowing and returns"),
        (name = "notifications", description = "Notification feeds and due-soon sweep"),
        (name = "events", description = "Change event stream")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_borrow_and_sweep_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/boxes/{id}/borrow"));
        assert!(doc.paths.paths.contains_key("/notifications/sweep"));
        assert!(doc
            .components
            .as_ref()
            .map_or(false, |c| c.security_schemes.contains_key("bearer_auth")));
    }
}
