//! API handlers for ShareIt REST endpoints

pub mod bookings;
pub mod health;
pub mod items;
pub mod openapi;
pub mod requests;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::get,
    Router,
};

use crate::{error::AppError, AppState};

/// Header carrying the id of the calling user
pub const SHARER_USER_ID: &str = "X-Sharer-User-Id";

/// Extractor for the caller's user id
pub struct SharerUserId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for SharerUserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SHARER_USER_ID)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", SHARER_USER_ID)))?;

        match raw.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(SharerUserId(id)),
            _ => Err(AppError::BadRequest(format!(
                "Invalid {} header: {}",
                SHARER_USER_ID, raw
            ))),
        }
    }
}

/// JSON body whose rejections answer with the usual error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections answer with the usual error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejections answer with the usual error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Items
        .route("/items", get(items::list_owner_items).post(items::create_item))
        .route("/items/search", get(items::search_items))
        .route("/items/:id", get(items::get_item).patch(items::update_item))
        .route("/items/:id/comment", axum::routing::post(items::add_comment))
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_booker_bookings).post(bookings::create_booking),
        )
        .route("/bookings/owner", get(bookings::list_owner_bookings))
        .route(
            "/bookings/:id",
            get(bookings::get_booking).patch(bookings::respond_booking),
        )
        // Item requests
        .route(
            "/requests",
            get(requests::list_own_requests).post(requests::create_request),
        )
        .route("/requests/all", get(requests::list_other_requests))
        .route("/requests/:id", get(requests::get_request))
        .with_state(state);

    routes.merge(openapi::create_openapi_router())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::AppConfig, test_support::memory_services};

    fn app() -> Router {
        let (services, _) = memory_services();
        create_router(AppState {
            config: Arc::new(AppConfig::default()),
            services: Arc::new(services),
        })
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(SHARER_USER_ID, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, name: &str) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/users",
            None,
            Some(json!({ "name": name, "email": format!("{}@example.org", name.to_lowercase()) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = send(&app, "GET", "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_identity_header_is_required() {
        let app = app();

        let (status, body) = send(&app, "GET", "/items", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");

        let request = Request::builder()
            .uri("/items")
            .header(SHARER_USER_ID, "abc")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_endpoints() {
        let app = app();
        let anna = register(&app, "Anna").await;

        let (status, body) = send(
            &app,
            "POST",
            "/users",
            None,
            Some(json!({ "name": "Copy", "email": "ANNA@example.org" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Duplicate");

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/users/{}", anna),
            None,
            Some(json!({ "name": "Annie" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Annie");

        let (status, _) = send(&app, "DELETE", &format!("/users/{}", anna), None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/users/{}", anna), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_booking_flow() {
        let app = app();
        let anna = register(&app, "Anna").await;
        let bob = register(&app, "Bob").await;

        let (status, item) = send(
            &app,
            "POST",
            "/items",
            Some(anna),
            Some(json!({ "name": "Drill", "description": "Cordless drill", "available": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_i64().unwrap();

        let (status, found) = send(&app, "GET", "/items/search?text=dRiLl", Some(bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().map(Vec::len), Some(1));

        let (status, booking) = send(
            &app,
            "POST",
            "/bookings",
            Some(bob),
            Some(json!({
                "itemId": item_id,
                "start": "2025-06-02T10:00:00Z",
                "end": "2025-06-03T10:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booking["status"], "WAITING");
        let booking_id = booking["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/bookings/{}?approved=true", booking_id),
            Some(bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, answered) = send(
            &app,
            "PATCH",
            &format!("/bookings/{}?approved=true", booking_id),
            Some(anna),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["status"], "APPROVED");

        let (status, listed) = send(&app, "GET", "/bookings/owner?state=future", Some(anna), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["id"], booking_id);

        let (status, body) = send(&app, "GET", "/bookings?state=UNSUPPORTED_STATUS", Some(bob), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unknown state: UNSUPPORTED_STATUS");
    }

    #[tokio::test]
    async fn test_extractor_rejections_use_error_body() {
        let app = app();
        let anna = register(&app, "Anna").await;

        let (status, body) =
            send(&app, "POST", "/users", None, Some(json!({ "name": "Nameless" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 7);
        assert_eq!(body["error"], "BadValue");

        let (status, body) = send(
            &app,
            "PATCH",
            "/bookings/1?approved=maybe",
            Some(anna),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");

        let (status, body) = send(&app, "GET", "/users/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_fields_are_camel_case() {
        let app = app();
        let anna = register(&app, "Anna").await;
        let bob = register(&app, "Bob").await;

        let (_, request) = send(
            &app,
            "POST",
            "/requests",
            Some(bob),
            Some(json!({ "description": "Need a ladder" })),
        )
        .await;
        let request_id = request["id"].as_i64().unwrap();

        let (status, item) = send(
            &app,
            "POST",
            "/items",
            Some(anna),
            Some(json!({
                "name": "Ladder",
                "description": "Three metres",
                "available": true,
                "requestId": request_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["requestId"], request_id);

        let (status, _) = send(
            &app,
            "POST",
            "/items",
            Some(anna),
            Some(json!({
                "name": "Ghost",
                "description": "Answers nothing",
                "available": true,
                "requestId": 99
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, fetched) = send(&app, "GET", &format!("/requests/{}", request_id), Some(bob), None).await;
        assert_eq!(fetched["items"][0]["ownerId"], anna);

        let (_, owned) = send(&app, "GET", &format!("/items/{}", item["id"]), Some(anna), None).await;
        assert!(owned.get("lastBooking").is_some());
        assert!(owned.get("nextBooking").is_some());
        assert!(owned.get("last_booking").is_none());
    }

    #[tokio::test]
    async fn test_request_endpoints() {
        let app = app();
        let bob = register(&app, "Bob").await;

        let (status, created) = send(
            &app,
            "POST",
            "/requests",
            Some(bob),
            Some(json!({ "description": "Need a ladder" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/requests/{}", created["id"]);
        let (status, fetched) = send(&app, "GET", &uri, Some(bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, others) = send(&app, "GET", "/requests/all", Some(bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(others, json!([]));
    }
}
