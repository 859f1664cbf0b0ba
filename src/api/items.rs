//! Item catalog endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        comment::{CommentDto, CreateComment},
        item::{CreateItem, ItemDto, ItemWithBookingsDto, UpdateItem},
    },
    AppState,
};

use super::{ApiJson, ApiPath, ApiQuery, SharerUserId};

/// Query parameters for item search
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Text to look for in names and descriptions
    pub text: Option<String>,
}

/// List the caller's items with their booking dates
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Owned items ordered by id", body = Vec<ItemWithBookingsDto>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_owner_items(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
) -> AppResult<Json<Vec<ItemWithBookingsDto>>> {
    let items = state.services.items.list_owner_items(user_id).await?;
    Ok(Json(items))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Item details; booking dates only for the owner", body = ItemWithBookingsDto),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ItemWithBookingsDto>> {
    let item = state.services.items.get(user_id, id).await?;
    Ok(Json(item))
}

/// List a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Owner user ID")
    ),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ItemDto),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "User or request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiJson(item): ApiJson<CreateItem>,
) -> AppResult<(StatusCode, Json<ItemDto>)> {
    let created = state.services.items.create(user_id, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partially update an item
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Owner user ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = ItemDto),
        (status = 403, description = "Caller does not own the item", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UpdateItem>,
) -> AppResult<Json<ItemDto>> {
    let updated = state.services.items.update(user_id, id, update).await?;
    Ok(Json(updated))
}

/// Search available items
#[utoipa::path(
    get,
    path = "/items/search",
    tag = "items",
    params(
        SearchQuery,
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Matching available items", body = Vec<ItemDto>)
    )
)]
pub async fn search_items(
    State(state): State<AppState>,
    SharerUserId(_user_id): SharerUserId,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<ItemDto>>> {
    let items = state.services.items.search(query.text.as_deref()).await?;
    Ok(Json(items))
}

/// Comment on a borrowed item
#[utoipa::path(
    post,
    path = "/items/{id}/comment",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Author user ID")
    ),
    request_body = CreateComment,
    responses(
        (status = 201, description = "Comment added", body = CommentDto),
        (status = 404, description = "User or item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No finished booking of the item", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ApiJson(comment): ApiJson<CreateComment>,
) -> AppResult<(StatusCode, Json<CommentDto>)> {
    let created = state.services.items.add_comment(user_id, id, comment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
