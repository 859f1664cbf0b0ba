//! Business logic services

pub mod bookings;
pub mod items;
pub mod requests;
pub mod users;

use std::sync::Arc;

use mockable::Clock;

use crate::{error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub items: items::ItemsService,
    pub bookings: bookings::BookingsService,
    pub requests: requests::RequestsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository and time source
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: users::UsersService::new(repository.clone()),
            items: items::ItemsService::new(repository.clone(), clock.clone()),
            bookings: bookings::BookingsService::new(repository.clone(), clock.clone()),
            requests: requests::RequestsService::new(repository.clone(), clock),
            repository,
        }
    }

    /// Readiness probe for the backing store
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}

/// Fail with NotFound unless the user exists
pub(crate) async fn ensure_user(repository: &Repository, user_id: i64) -> AppResult<()> {
    if repository.users.exists_by_id(user_id).await? {
        Ok(())
    } else {
        Err(crate::error::AppError::NotFound(format!(
            "User with id {} not found",
            user_id
        )))
    }
}
