//! Booking lifecycle service

use std::collections::HashMap;
use std::sync::Arc;

use mockable::Clock;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingDto, BookingState, BookingStatus, CreateBooking, NewBooking},
        item::{comments_by_item, Item, ItemDto},
        user::UserDto,
    },
    repository::{Access, Repository},
};

use super::ensure_user;

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl BookingsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Book an item for a period; the booking waits for the owner's answer
    pub async fn create(&self, booker_id: i64, booking: CreateBooking) -> AppResult<BookingDto> {
        booking.validate()?;
        booking.check_dates(self.clock.utc())?;
        let uow = self.repository.begin(Access::ReadWrite).await?;
        ensure_user(&uow.repository, booker_id).await?;

        let item = find_item(&uow.repository, booking.item_id).await?;
        if item.owner_id == booker_id {
            return Err(AppError::Forbidden(format!(
                "Item {} belongs to user {}",
                item.id, booker_id
            )));
        }
        if !item.available {
            return Err(AppError::Conflict(format!("Item {} is not available", item.id)));
        }

        let created = uow
            .repository
            .bookings
            .create(NewBooking {
                start: booking.start,
                end: booking.end,
                item_id: item.id,
                booker_id,
            })
            .await?;
        let dto = to_dto(&uow.repository, created).await?;
        uow.commit().await?;

        tracing::info!(booking_id = dto.id, item_id = item.id, booker_id, "Booking created");
        Ok(dto)
    }

    /// Approve or reject a waiting booking of one of the owner's items
    pub async fn respond(&self, owner_id: i64, booking_id: i64, approve: bool) -> AppResult<BookingDto> {
        let uow = self.repository.begin(Access::ReadWrite).await?;
        let booking = find_booking(&uow.repository, booking_id).await?;
        let item = find_item(&uow.repository, booking.item_id).await?;

        if item.owner_id != owner_id {
            return Err(AppError::Forbidden(format!(
                "User {} does not own item {}",
                owner_id, item.id
            )));
        }
        if booking.status != BookingStatus::Waiting {
            return Err(AppError::Conflict(format!(
                "Booking {} was already answered ({})",
                booking_id, booking.status
            )));
        }

        let status = BookingStatus::answered(approve);
        // the transition itself only matches a WAITING row
        let updated = uow
            .repository
            .bookings
            .answer(booking_id, status)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Booking {} was already answered", booking_id))
            })?;
        let dto = to_dto(&uow.repository, updated).await?;
        uow.commit().await?;

        tracing::info!(booking_id, status = %status, "Booking answered");
        Ok(dto)
    }

    /// A booking as seen by its booker or by the item owner
    pub async fn get(&self, user_id: i64, booking_id: i64) -> AppResult<BookingDto> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let booking = find_booking(&uow.repository, booking_id).await?;
        if booking.booker_id != user_id {
            let item = find_item(&uow.repository, booking.item_id).await?;
            if item.owner_id != user_id {
                return Err(AppError::NotFound(format!(
                    "Booking with id {} not found",
                    booking_id
                )));
            }
        }
        let dto = to_dto(&uow.repository, booking).await?;
        uow.commit().await?;
        Ok(dto)
    }

    /// Bookings made by the user
    pub async fn list_for_booker(&self, user_id: i64, state: BookingState) -> AppResult<Vec<BookingDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        ensure_user(&uow.repository, user_id).await?;
        let bookings = uow
            .repository
            .bookings
            .find_by_booker(user_id, state, self.clock.utc())
            .await?;
        let dtos = to_dtos(&uow.repository, bookings).await?;
        uow.commit().await?;
        Ok(dtos)
    }

    /// Bookings of the items the user owns
    pub async fn list_for_owned_items(
        &self,
        user_id: i64,
        state: BookingState,
    ) -> AppResult<Vec<BookingDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        ensure_user(&uow.repository, user_id).await?;
        let bookings = uow
            .repository
            .bookings
            .find_by_item_owner(user_id, state, self.clock.utc())
            .await?;
        let dtos = to_dtos(&uow.repository, bookings).await?;
        uow.commit().await?;
        Ok(dtos)
    }
}

async fn find_booking(repository: &Repository, booking_id: i64) -> AppResult<Booking> {
    repository
        .bookings
        .find_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))
}

async fn find_item(repository: &Repository, item_id: i64) -> AppResult<Item> {
    repository
        .items
        .find_by_id(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
}

/// Resolve items, their comments and bookers for a batch of bookings
async fn to_dtos(repository: &Repository, bookings: Vec<Booking>) -> AppResult<Vec<BookingDto>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let mut item_ids: Vec<i64> = bookings.iter().map(|b| b.item_id).collect();
    item_ids.sort_unstable();
    item_ids.dedup();
    let mut booker_ids: Vec<i64> = bookings.iter().map(|b| b.booker_id).collect();
    booker_ids.sort_unstable();
    booker_ids.dedup();

    let items = repository.items.find_by_ids(&item_ids).await?;
    let comments = comments_by_item(repository.comments.find_by_item_ids(&item_ids).await?);
    let items: HashMap<i64, ItemDto> = items
        .iter()
        .map(|item| {
            let item_comments = comments.get(&item.id).map(Vec::as_slice).unwrap_or_default();
            (item.id, ItemDto::new(item, item_comments))
        })
        .collect();
    let bookers: HashMap<i64, UserDto> = repository
        .users
        .find_by_ids(&booker_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, UserDto::from(user)))
        .collect();

    bookings
        .iter()
        .map(|booking| {
            let item = items.get(&booking.item_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Item {} of booking {} is missing", booking.item_id, booking.id))
            })?;
            let booker = bookers.get(&booking.booker_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Booker {} of booking {} is missing", booking.booker_id, booking.id))
            })?;
            Ok(BookingDto::new(booking, item, booker))
        })
        .collect()
}

async fn to_dto(repository: &Repository, booking: Booking) -> AppResult<BookingDto> {
    let booking_id = booking.id;
    to_dtos(repository, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{CreateItem, CreateUser};
    use crate::repository::MockBookingRepository;
    use crate::services::Services;
    use crate::test_support::{epoch, memory_services};

    struct Scenario {
        services: Services,
        clock: Arc<crate::test_support::MutableClock>,
        anna: i64,
        bob: i64,
        drill: i64,
    }

    /// Anna owns a drill, Bob wants to borrow it
    async fn scenario() -> Scenario {
        let (services, clock) = memory_services();
        let mut ids = Vec::new();
        for name in ["Anna", "Bob"] {
            let user = services
                .users
                .create(CreateUser {
                    name: name.to_string(),
                    email: format!("{}@example.org", name.to_lowercase()),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let drill = services
            .items
            .create(
                ids[0],
                CreateItem {
                    name: "Drill".to_string(),
                    description: "Cordless drill".to_string(),
                    available: Some(true),
                    request_id: None,
                },
            )
            .await
            .unwrap();

        Scenario {
            services,
            clock,
            anna: ids[0],
            bob: ids[1],
            drill: drill.id,
        }
    }

    fn period(item_id: i64, from_h: i64, to_h: i64) -> CreateBooking {
        CreateBooking {
            item_id,
            start: epoch() + Duration::hours(from_h),
            end: epoch() + Duration::hours(to_h),
        }
    }

    #[tokio::test]
    async fn test_booking_lifecycle() {
        let s = scenario().await;

        let booking = s.services.bookings.create(s.bob, period(s.drill, 24, 48)).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Waiting);
        assert_eq!(booking.item.name, "Drill");
        assert_eq!(booking.booker.name, "Bob");

        let approved = s.services.bookings.respond(s.anna, booking.id, true).await.unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);

        let again = s.services.bookings.respond(s.anna, booking.id, false).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let by_owner = s.services.bookings.get(s.anna, booking.id).await.unwrap();
        let by_booker = s.services.bookings.get(s.bob, booking.id).await.unwrap();
        assert_eq!(by_owner, by_booker);
    }

    #[tokio::test]
    async fn test_respond_loses_race_to_other_answer() {
        let repository = Repository::in_memory();
        let anna = repository
            .users
            .create(&CreateUser {
                name: "Anna".to_string(),
                email: "anna@example.org".to_string(),
            })
            .await
            .unwrap();
        let drill = repository
            .items
            .create(crate::models::item::NewItem {
                name: "Drill".to_string(),
                description: "Cordless drill".to_string(),
                available: true,
                owner_id: anna.id,
                request_id: None,
            })
            .await
            .unwrap();

        // the row still reads WAITING, but another answer lands first
        let waiting = Booking {
            id: 7,
            start: epoch() + Duration::hours(24),
            end: epoch() + Duration::hours(48),
            item_id: drill.id,
            booker_id: anna.id + 1,
            status: BookingStatus::Waiting,
        };
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(waiting.clone())));
        bookings.expect_answer().times(1).returning(|_, _| Ok(None));

        let mut repository = repository;
        repository.bookings = Arc::new(bookings);
        let service = BookingsService::new(
            repository,
            Arc::new(crate::test_support::MutableClock::new(epoch())),
        );

        let result = service.respond(anna.id, 7, true).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_rules() {
        let s = scenario().await;

        let own = s.services.bookings.create(s.anna, period(s.drill, 1, 2)).await;
        assert!(matches!(own, Err(AppError::Forbidden(_))));

        let past = s.services.bookings.create(s.bob, period(s.drill, -2, 2)).await;
        assert!(matches!(past, Err(AppError::Validation(_))));

        let reversed = s.services.bookings.create(s.bob, period(s.drill, 5, 2)).await;
        assert!(matches!(reversed, Err(AppError::Validation(_))));

        let missing_item = s.services.bookings.create(s.bob, period(999, 1, 2)).await;
        assert!(matches!(missing_item, Err(AppError::NotFound(_))));

        let missing_user = s.services.bookings.create(999, period(s.drill, 1, 2)).await;
        assert!(matches!(missing_user, Err(AppError::NotFound(_))));

        s.services
            .items
            .update(
                s.anna,
                s.drill,
                crate::models::UpdateItem {
                    available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let unavailable = s.services.bookings.create(s.bob, period(s.drill, 1, 2)).await;
        assert!(matches!(unavailable, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_overlapping_bookings_are_accepted() {
        let s = scenario().await;
        s.services.bookings.create(s.bob, period(s.drill, 1, 10)).await.unwrap();
        let overlapping = s.services.bookings.create(s.bob, period(s.drill, 5, 15)).await;
        assert!(overlapping.is_ok());
    }

    #[tokio::test]
    async fn test_only_owner_responds() {
        let s = scenario().await;
        let booking = s.services.bookings.create(s.bob, period(s.drill, 1, 2)).await.unwrap();

        let by_booker = s.services.bookings.respond(s.bob, booking.id, true).await;
        assert!(matches!(by_booker, Err(AppError::Forbidden(_))));

        let missing = s.services.bookings.respond(s.anna, 999, true).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_hides_booking_from_strangers() {
        let s = scenario().await;
        let carl = s
            .services
            .users
            .create(CreateUser {
                name: "Carl".to_string(),
                email: "carl@example.org".to_string(),
            })
            .await
            .unwrap();
        let booking = s.services.bookings.create(s.bob, period(s.drill, 1, 2)).await.unwrap();

        let result = s.services.bookings.get(carl.id, booking.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_listing_by_state() {
        let s = scenario().await;
        let early = s.services.bookings.create(s.bob, period(s.drill, 1, 3)).await.unwrap();
        let late = s.services.bookings.create(s.bob, period(s.drill, 24, 48)).await.unwrap();
        let rejected = s.services.bookings.create(s.bob, period(s.drill, 72, 96)).await.unwrap();
        s.services.bookings.respond(s.anna, rejected.id, false).await.unwrap();

        // now sits inside the early booking
        s.clock.advance(Duration::hours(2));

        let ids = |list: Vec<BookingDto>| list.into_iter().map(|b| b.id).collect::<Vec<_>>();
        let bookings = &s.services.bookings;

        assert_eq!(
            ids(bookings.list_for_booker(s.bob, BookingState::All).await.unwrap()),
            vec![early.id, late.id, rejected.id]
        );
        assert_eq!(
            ids(bookings.list_for_booker(s.bob, BookingState::Current).await.unwrap()),
            vec![early.id]
        );
        assert_eq!(
            ids(bookings.list_for_booker(s.bob, BookingState::Future).await.unwrap()),
            vec![late.id, rejected.id]
        );
        assert!(bookings
            .list_for_booker(s.bob, BookingState::Past)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            ids(bookings.list_for_owned_items(s.anna, BookingState::Rejected).await.unwrap()),
            vec![rejected.id]
        );
        assert_eq!(
            ids(bookings.list_for_owned_items(s.anna, BookingState::Waiting).await.unwrap()),
            vec![early.id, late.id]
        );
        assert!(bookings
            .list_for_owned_items(s.bob, BookingState::All)
            .await
            .unwrap()
            .is_empty());

        s.clock.advance_days(1);
        assert_eq!(
            ids(bookings.list_for_booker(s.bob, BookingState::Past).await.unwrap()),
            vec![early.id]
        );

        let missing = bookings.list_for_booker(999, BookingState::All).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
