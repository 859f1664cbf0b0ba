//! Booking endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::booking::{BookingDto, BookingState, CreateBooking},
    AppState,
};

use super::{ApiJson, ApiPath, ApiQuery, SharerUserId};

/// Query parameters for booking listings
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StateQuery {
    /// ALL, PAST, CURRENT, FUTURE, REJECTED or WAITING (case-insensitive)
    pub state: Option<String>,
}

impl StateQuery {
    fn parse(&self) -> AppResult<BookingState> {
        match self.state.as_deref() {
            Some(state) => state.parse(),
            None => Ok(BookingState::All),
        }
    }
}

/// Owner's answer to a booking
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RespondQuery {
    pub approved: bool,
}

/// Book an item
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Booker user ID")
    ),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created, waiting for approval", body = BookingDto),
        (status = 400, description = "Invalid dates", body = crate::error::ErrorResponse),
        (status = 403, description = "Owner cannot book own item", body = crate::error::ErrorResponse),
        (status = 404, description = "User or item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiJson(booking): ApiJson<CreateBooking>,
) -> AppResult<(StatusCode, Json<BookingDto>)> {
    let created = state.services.bookings.create(user_id, booking).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Approve or reject a booking
#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i64, Path, description = "Booking ID"),
        RespondQuery,
        ("X-Sharer-User-Id" = i64, Header, description = "Item owner user ID")
    ),
    responses(
        (status = 200, description = "Booking answered", body = BookingDto),
        (status = 403, description = "Caller does not own the item", body = crate::error::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Booking already answered", body = crate::error::ErrorResponse)
    )
)]
pub async fn respond_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RespondQuery>,
) -> AppResult<Json<BookingDto>> {
    let booking = state
        .services
        .bookings
        .respond(user_id, id, query.approved)
        .await?;
    Ok(Json(booking))
}

/// Get a booking as its booker or item owner
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i64, Path, description = "Booking ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Caller user ID")
    ),
    responses(
        (status = 200, description = "Booking details", body = BookingDto),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<BookingDto>> {
    let booking = state.services.bookings.get(user_id, id).await?;
    Ok(Json(booking))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    params(
        StateQuery,
        ("X-Sharer-User-Id" = i64, Header, description = "Booker user ID")
    ),
    responses(
        (status = 200, description = "Bookings ordered by start", body = Vec<BookingDto>),
        (status = 400, description = "Unknown state", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_booker_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(query): ApiQuery<StateQuery>,
) -> AppResult<Json<Vec<BookingDto>>> {
    let bookings = state
        .services
        .bookings
        .list_for_booker(user_id, query.parse()?)
        .await?;
    Ok(Json(bookings))
}

/// List bookings of the caller's items
#[utoipa::path(
    get,
    path = "/bookings/owner",
    tag = "bookings",
    params(
        StateQuery,
        ("X-Sharer-User-Id" = i64, Header, description = "Owner user ID")
    ),
    responses(
        (status = 200, description = "Bookings ordered by start", body = Vec<BookingDto>),
        (status = 400, description = "Unknown state", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_owner_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(query): ApiQuery<StateQuery>,
) -> AppResult<Json<Vec<BookingDto>>> {
    let bookings = state
        .services
        .bookings
        .list_for_owned_items(user_id, query.parse()?)
        .await?;
    Ok(Json(bookings))
}
