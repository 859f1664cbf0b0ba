//! In-process store implementing every repository trait
//!
//! Tables are `BTreeMap`s keyed by id so iteration order matches id order.
//! Used by the test suites and by `database.url = "memory://"`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::NewBooking,
        comment::NewComment,
        item::NewItem,
        request::NewItemRequest,
        Booking, BookingState, BookingStatus, Comment, CreateUser, Item, ItemRequest, User,
    },
};

use super::{BookingRepository, CommentRepository, ItemRepository, ItemRequestRepository, UserRepository};

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    text: String,
    item_id: i64,
    author_id: i64,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    items: BTreeMap<i64, Item>,
    bookings: BTreeMap<i64, Booking>,
    comments: BTreeMap<i64, CommentRow>,
    requests: BTreeMap<i64, ItemRequest>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn comment(&self, row: &CommentRow) -> Comment {
        let author_name = self
            .users
            .get(&row.author_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        Comment {
            id: row.id,
            text: row.text.clone(),
            item_id: row.item_id,
            author_id: row.author_id,
            author_name,
            created: row.created,
        }
    }

    fn owner_of(&self, item_id: i64) -> Option<i64> {
        self.items.get(&item_id).map(|i| i.owner_id)
    }

    fn sorted_bookings<F>(&self, state: BookingState, now: DateTime<Utc>, filter: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut bookings: Vec<Booking> = self
            .bookings
            .values()
            .filter(|b| filter(b) && state.matches(b, now))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        bookings
    }
}

fn sorted_requests<'a>(requests: impl Iterator<Item = &'a ItemRequest>) -> Vec<ItemRequest> {
    let mut requests: Vec<ItemRequest> = requests.cloned().collect();
    requests.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
    requests
}

/// Email equality under the same folding as `LOWER(email)`
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn exists_by_id(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.read().await.users.contains_key(&id))
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .any(|u| Some(u.id) != exclude_id && same_email(&u.email, email)))
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(AppError::AlreadyExists("Email is already registered".to_string()));
        }
        let created = User {
            id: tables.next_id(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && same_email(&u.email, &user.email))
        {
            return Err(AppError::AlreadyExists("Email is already registered".to_string()));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;
        *stored = user.clone();
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        // mirror ON DELETE CASCADE
        let owned: Vec<i64> = tables
            .items
            .values()
            .filter(|i| i.owner_id == id)
            .map(|i| i.id)
            .collect();
        tables.items.retain(|_, i| i.owner_id != id);
        tables
            .bookings
            .retain(|_, b| b.booker_id != id && !owned.contains(&b.item_id));
        tables
            .comments
            .retain(|_, c| c.author_id != id && !owned.contains(&c.item_id));
        tables.requests.retain(|_, r| r.requestor_id != id);
        let requests = &tables.requests;
        let orphaned: Vec<i64> = tables
            .items
            .values()
            .filter(|i| i.request_id.is_some_and(|r| !requests.contains_key(&r)))
            .map(|i| i.id)
            .collect();
        for item_id in orphaned {
            if let Some(item) = tables.items.get_mut(&item_id) {
                item.request_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn find_by_owner(&self, owner_id: i64) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn search(&self, text: &str) -> AppResult<Vec<Item>> {
        let needle = text.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| {
                i.available
                    && (i.name.to_lowercase().contains(&needle)
                        || i.description.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, item: NewItem) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        let created = Item {
            id: tables.next_id(),
            name: item.name,
            description: item.description,
            available: item.available,
            owner_id: item.owner_id,
            request_id: item.request_id,
        };
        tables.items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, item: &Item) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .items
            .get_mut(&item.id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item.id)))?;
        stored.name = item.name.clone();
        stored.description = item.description.clone();
        stored.available = item.available;
        Ok(stored.clone())
    }

    async fn find_by_request_ids(&self, request_ids: &[i64]) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.request_id.is_some_and(|r| request_ids.contains(&r)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn create(&self, booking: NewBooking) -> AppResult<Booking> {
        let mut tables = self.tables.write().await;
        let created = Booking {
            id: tables.next_id(),
            start: booking.start,
            end: booking.end,
            item_id: booking.item_id,
            booker_id: booking.booker_id,
            status: BookingStatus::Waiting,
        };
        tables.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn answer(&self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&id) {
            Some(stored) if stored.status == BookingStatus::Waiting => {
                stored.status = status;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_bookings(state, now, |b| b.booker_id == booker_id))
    }

    async fn find_by_item_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_bookings(state, now, |b| tables.owner_of(b.item_id) == Some(owner_id)))
    }

    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .any(|b| b.booker_id == booker_id && b.item_id == item_id && b.end < now))
    }

    async fn find_for_owned_items(&self, owner_id: i64, item_ids: &[i64]) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| item_ids.contains(&b.item_id) && tables.owner_of(b.item_id) == Some(owner_id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        Ok(bookings)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: NewComment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        let row = CommentRow {
            id: tables.next_id(),
            text: comment.text,
            item_id: comment.item_id,
            author_id: comment.author_id,
            created: comment.created,
        };
        tables.comments.insert(row.id, row.clone());
        Ok(tables.comment(&row))
    }

    async fn find_by_item_ids(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| item_ids.contains(&c.item_id))
            .map(|c| tables.comment(c))
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments)
    }
}

#[async_trait]
impl ItemRequestRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn create(&self, request: NewItemRequest) -> AppResult<ItemRequest> {
        let mut tables = self.tables.write().await;
        let created = ItemRequest {
            id: tables.next_id(),
            description: request.description,
            requestor_id: request.requestor_id,
            created: request.created,
        };
        tables.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let tables = self.tables.read().await;
        Ok(sorted_requests(
            tables.requests.values().filter(|r| r.requestor_id == requestor_id),
        ))
    }

    async fn find_by_other_requestors(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let tables = self.tables.read().await;
        Ok(sorted_requests(
            tables.requests.values().filter(|r| r.requestor_id != requestor_id),
        ))
    }
}
