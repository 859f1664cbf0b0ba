//! Repository layer for database operations
//!
//! Each entity has a storage trait; [`Repository`] bundles one handle per
//! entity. PostgreSQL implementations live next to the traits, and
//! [`memory::MemoryStore`] backs all of them with in-process tables.
//! [`Repository::begin`] binds the PostgreSQL handles to one transaction.

pub mod bookings;
pub mod comments;
pub mod db;
pub mod items;
pub mod memory;
pub mod requests;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tokio::sync::Mutex;

pub use db::Access;
use db::{Db, SharedTransaction};

use crate::{
    error::AppResult,
    models::{
        booking::NewBooking,
        comment::NewComment,
        item::NewItem,
        request::NewItemRequest,
        Booking, BookingState, BookingStatus, Comment, CreateUser, Item, ItemRequest, User,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<User>>;

    async fn exists_by_id(&self, id: i64) -> AppResult<bool>;

    /// All users ordered by id
    async fn find_all(&self) -> AppResult<Vec<User>>;

    /// Case-insensitive email lookup, optionally ignoring one user
    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool>;

    async fn create(&self, user: &CreateUser) -> AppResult<User>;

    async fn update(&self, user: &User) -> AppResult<User>;

    /// Returns false when no user had this id
    async fn delete_by_id(&self, id: i64) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Item>>;

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Item>>;

    /// Items of an owner ordered by id
    async fn find_by_owner(&self, owner_id: i64) -> AppResult<Vec<Item>>;

    /// Available items whose name or description contains `text`, ignoring case
    async fn search(&self, text: &str) -> AppResult<Vec<Item>>;

    async fn create(&self, item: NewItem) -> AppResult<Item>;

    async fn update(&self, item: &Item) -> AppResult<Item>;

    /// Items answering any of the given requests, ordered by id
    async fn find_by_request_ids(&self, request_ids: &[i64]) -> AppResult<Vec<Item>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>>;

    /// Inserts a booking in the WAITING state
    async fn create(&self, booking: NewBooking) -> AppResult<Booking>;

    /// Moves a WAITING booking to `status`; None when the booking is gone or
    /// was already answered
    async fn answer(&self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>>;

    /// Bookings made by a user in a bucket, ordered by start
    async fn find_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>>;

    /// Bookings of the items a user owns in a bucket, ordered by start
    async fn find_by_item_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>>;

    /// Whether the user has a booking of the item that ended before `now`
    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Bookings of the given items, restricted to items owned by `owner_id`
    async fn find_for_owned_items(&self, owner_id: i64, item_ids: &[i64]) -> AppResult<Vec<Booking>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: NewComment) -> AppResult<Comment>;

    /// Comments of the given items ordered by creation time
    async fn find_by_item_ids(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRequestRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>>;

    async fn create(&self, request: NewItemRequest) -> AppResult<ItemRequest>;

    /// Requests posted by a user, oldest first
    async fn find_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>>;

    /// Requests posted by everyone but the user, oldest first
    async fn find_by_other_requestors(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>>;
}

/// Main repository struct holding one handle per entity
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UserRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub requests: Arc<dyn ItemRequestRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_db(Db::Pool(pool.clone()), Some(pool))
    }

    fn with_db(db: Db, pool: Option<Pool<Postgres>>) -> Self {
        Self {
            pool,
            users: Arc::new(users::UsersRepository::new(db.clone())),
            items: Arc::new(items::ItemsRepository::new(db.clone())),
            bookings: Arc::new(bookings::BookingsRepository::new(db.clone())),
            comments: Arc::new(comments::CommentsRepository::new(db.clone())),
            requests: Arc::new(requests::RequestsRepository::new(db)),
        }
    }

    /// Create a repository backed by in-process tables
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            pool: None,
            users: store.clone(),
            items: store.clone(),
            bookings: store.clone(),
            comments: store.clone(),
            requests: store,
        }
    }

    /// Open a unit of work. Against PostgreSQL every handle of the returned
    /// repository runs in one transaction; otherwise the handles are shared
    /// as they are.
    pub async fn begin(&self, access: Access) -> AppResult<UnitOfWork> {
        let Some(pool) = &self.pool else {
            return Ok(UnitOfWork {
                repository: self.clone(),
                transaction: None,
            });
        };

        let mut tx = pool.begin().await?;
        if let Some(sql) = access.set_transaction_sql() {
            sqlx::query(sql).execute(&mut *tx).await?;
        }

        let shared: SharedTransaction = Arc::new(Mutex::new(Some(tx)));
        Ok(UnitOfWork {
            repository: Self::with_db(Db::Transaction(shared.clone()), None),
            transaction: Some(shared),
        })
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Repository handles bound to one transaction.
///
/// Dropping it without [`UnitOfWork::commit`] rolls the transaction back.
pub struct UnitOfWork {
    pub repository: Repository,
    transaction: Option<SharedTransaction>,
}

impl UnitOfWork {
    pub async fn commit(self) -> AppResult<()> {
        if let Some(shared) = self.transaction {
            let taken = shared.lock().await.take();
            if let Some(tx) = taken {
                tx.commit().await?;
            }
        }
        Ok(())
    }
}
