//! Item request endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::request::{CreateItemRequest, ItemRequestDto},
    AppState,
};

use super::{ApiJson, ApiPath, SharerUserId};

/// Post a request for an item
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Requestor user ID")
    ),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Request created", body = ItemRequestDto),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiJson(request): ApiJson<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ItemRequestDto>)> {
    let created = state.services.requests.create(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List the caller's requests with answering items
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Requestor user ID")
    ),
    responses(
        (status = 200, description = "Own requests, oldest first", body = Vec<ItemRequestDto>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_own_requests(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
) -> AppResult<Json<Vec<ItemRequestDto>>> {
    let requests = state.services.requests.list_own(user_id).await?;
    Ok(Json(requests))
}

/// List requests posted by other users
#[utoipa::path(
    get,
    path = "/requests/all",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Other users' requests, oldest first", body = Vec<ItemRequestDto>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_other_requests(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
) -> AppResult<Json<Vec<ItemRequestDto>>> {
    let requests = state.services.requests.list_others(user_id).await?;
    Ok(Json(requests))
}

/// Get a request by ID
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    params(
        ("id" = i64, Path, description = "Request ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Request with answering items", body = ItemRequestDto),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    SharerUserId(_user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ItemRequestDto>> {
    let request = state.services.requests.get(id).await?;
    Ok(Json(request))
}
