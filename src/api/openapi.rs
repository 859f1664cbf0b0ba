//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, health, items, requests, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ShareIt API",
        version = "1.0.0",
        description = "Item sharing service REST API"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Items
        items::list_owner_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::search_items,
        items::add_comment,
        // Bookings
        bookings::create_booking,
        bookings::respond_booking,
        bookings::get_booking,
        bookings::list_booker_bookings,
        bookings::list_owner_bookings,
        // Requests
        requests::create_request,
        requests::list_own_requests,
        requests::list_other_requests,
        requests::get_request,
    ),
    components(
        schemas(
            // Users
            crate::models::user::UserDto,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Items
            crate::models::item::ItemDto,
            crate::models::item::ItemWithBookingsDto,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::comment::CommentDto,
            crate::models::comment::CreateComment,
            // Bookings
            crate::models::booking::BookingDto,
            crate::models::booking::BookingStatus,
            crate::models::booking::BookingState,
            crate::models::booking::CreateBooking,
            // Requests
            crate::models::request::ItemRequestDto,
            crate::models::request::ItemForRequestDto,
            crate::models::request::CreateItemRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User directory"),
        (name = "items", description = "Item catalog and comments"),
        (name = "bookings", description = "Booking lifecycle"),
        (name = "requests", description = "Item request board")
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
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/users/{id}",
            "/items/search",
            "/items/{id}/comment",
            "/bookings/owner",
            "/requests/all",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
