//! Bookings repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::booking::{Booking, BookingState, BookingStatus, NewBooking},
};

use super::{db::Db, BookingRepository};

const BOOKING_COLUMNS: &str =
    "b.id, b.start_date, b.end_date, b.item_id, b.booker_id, b.status";

#[derive(Clone)]
pub struct BookingsRepository {
    db: Db,
}

impl BookingsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Shared listing query; `$1` is the user id and `$2` (when bound) is now
    async fn find_in_state(
        &self,
        filter: &str,
        user_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let (condition, uses_now) = state_condition(state);
        let query = format!(
            r#"
            SELECT {}
            FROM bookings b
            JOIN items i ON i.id = b.item_id
            WHERE {} {}
            ORDER BY b.start_date ASC, b.id ASC
            "#,
            BOOKING_COLUMNS, filter, condition
        );

        let mut select = sqlx::query_as::<_, Booking>(&query).bind(user_id);
        if uses_now {
            select = select.bind(now);
        }
        let bookings = select.fetch_all(&mut *self.db.conn().await?).await?;
        Ok(bookings)
    }
}

/// SQL condition for a bucket and whether it references `$2`
fn state_condition(state: BookingState) -> (&'static str, bool) {
    match state {
        BookingState::All => ("", false),
        BookingState::Past => ("AND b.end_date < $2", true),
        BookingState::Current => ("AND b.start_date <= $2 AND b.end_date > $2", true),
        BookingState::Future => ("AND b.start_date > $2", true),
        BookingState::Rejected => ("AND b.status = 'REJECTED'", false),
        BookingState::Waiting => ("AND b.status = 'WAITING'", false),
    }
}

#[async_trait]
impl BookingRepository for BookingsRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {} FROM bookings b WHERE b.id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.db.conn().await?)
        .await?;
        Ok(booking)
    }

    async fn create(&self, booking: NewBooking) -> AppResult<Booking> {
        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, start_date, end_date, item_id, booker_id, status
            "#,
        )
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.item_id)
        .bind(booking.booker_id)
        .bind(BookingStatus::Waiting)
        .fetch_one(&mut *self.db.conn().await?)
        .await?;
        Ok(created)
    }

    async fn answer(&self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>> {
        let answered = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING id, start_date, end_date, item_id, booker_id, status
            "#,
        )
        .bind(status)
        .bind(id)
        .bind(BookingStatus::Waiting)
        .fetch_optional(&mut *self.db.conn().await?)
        .await?;
        Ok(answered)
    }

    async fn find_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        self.find_in_state("b.booker_id = $1", booker_id, state, now).await
    }

    async fn find_by_item_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        self.find_in_state("i.owner_id = $1", owner_id, state, now).await
    }

    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE booker_id = $1 AND item_id = $2 AND end_date < $3
            )
            "#,
        )
        .bind(booker_id)
        .bind(item_id)
        .bind(now)
        .fetch_one(&mut *self.db.conn().await?)
        .await?;
        Ok(exists)
    }

    async fn find_for_owned_items(&self, owner_id: i64, item_ids: &[i64]) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {}
            FROM bookings b
            JOIN items i ON i.id = b.item_id
            WHERE i.owner_id = $1 AND i.id = ANY($2)
            ORDER BY b.start_date ASC, b.id ASC
            "#,
            BOOKING_COLUMNS
        ))
        .bind(owner_id)
        .bind(item_ids)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(bookings)
    }
}
