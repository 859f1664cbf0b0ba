//! Booking model, status workflow and time buckets

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::item::ItemDto;
use super::user::UserDto;
use crate::error::AppError;

/// Approval status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
        }
    }

    /// Status reached when the owner answers a waiting booking
    pub fn answered(approved: bool) -> Self {
        if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WAITING" => Ok(BookingStatus::Waiting),
            "APPROVED" => Ok(BookingStatus::Approved),
            "REJECTED" => Ok(BookingStatus::Rejected),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

// Stored as text
impl sqlx::Type<Postgres> for BookingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for BookingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Filter applied when listing bookings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingState {
    #[default]
    All,
    Past,
    Current,
    Future,
    Rejected,
    Waiting,
}

impl std::str::FromStr for BookingState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ALL" => Ok(BookingState::All),
            "PAST" => Ok(BookingState::Past),
            "CURRENT" => Ok(BookingState::Current),
            "FUTURE" => Ok(BookingState::Future),
            "REJECTED" => Ok(BookingState::Rejected),
            "WAITING" => Ok(BookingState::Waiting),
            _ => Err(AppError::Validation(format!("Unknown state: {}", s))),
        }
    }
}

impl BookingState {
    /// Whether a booking falls into this bucket at `now`
    pub fn matches(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        match self {
            BookingState::All => true,
            BookingState::Past => booking.end < now,
            BookingState::Current => booking.start <= now && booking.end > now,
            BookingState::Future => booking.start > now,
            BookingState::Rejected => booking.status == BookingStatus::Rejected,
            BookingState::Waiting => booking.status == BookingStatus::Waiting,
        }
    }
}

/// Booking model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    #[sqlx(rename = "start_date")]
    pub start: DateTime<Utc>,
    #[sqlx(rename = "end_date")]
    pub end: DateTime<Utc>,
    pub item_id: i64,
    pub booker_id: i64,
    pub status: BookingStatus,
}

/// Booking projection with the booked item and the booker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub item: ItemDto,
    pub booker: UserDto,
}

impl BookingDto {
    pub fn new(booking: &Booking, item: ItemDto, booker: UserDto) -> Self {
        Self {
            id: booking.id,
            start: booking.start,
            end: booking.end,
            status: booking.status,
            item,
            booker,
        }
    }
}

/// Create booking request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[validate(range(min = 1, message = "Item id must be positive"))]
    pub item_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CreateBooking {
    /// Date rules that depend on the current time
    pub fn check_dates(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.start < now {
            return Err(AppError::Validation(
                "Booking start cannot be in the past".to_string(),
            ));
        }
        if self.end <= now {
            return Err(AppError::Validation(
                "Booking end must be in the future".to_string(),
            ));
        }
        if self.end <= self.start {
            return Err(AppError::Validation(
                "Booking end must be after its start".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub item_id: i64,
    pub booker_id: i64,
}

/// Bookings surrounding `now` for a single item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingAggregate {
    /// Finished booking with the latest end
    pub last: Option<Booking>,
    /// Upcoming, non-rejected booking with the earliest start
    pub next: Option<Booking>,
}

/// Compute last/next booking per item from a batch of candidate bookings
pub fn booking_aggregates(
    bookings: &[Booking],
    now: DateTime<Utc>,
) -> HashMap<i64, BookingAggregate> {
    let mut map: HashMap<i64, BookingAggregate> = HashMap::new();

    for booking in bookings {
        if booking.end < now {
            let entry = map.entry(booking.item_id).or_default();
            let later = entry.last.as_ref().map_or(true, |last| booking.end > last.end);
            if later {
                entry.last = Some(booking.clone());
            }
        }
        if booking.start > now && booking.status != BookingStatus::Rejected {
            let entry = map.entry(booking.item_id).or_default();
            let sooner = entry.next.as_ref().map_or(true, |next| booking.start < next.start);
            if sooner {
                entry.next = Some(booking.clone());
            }
        }
    }

    map
}
