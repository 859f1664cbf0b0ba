//! Item catalog service: listings, search and comments

use std::sync::Arc;

use mockable::Clock;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::booking_aggregates,
        comment::{CommentDto, CreateComment, NewComment},
        item::{comments_by_item, CreateItem, Item, ItemDto, ItemWithBookingsDto, NewItem, UpdateItem},
    },
    repository::{Access, Repository},
};

use super::ensure_user;

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl ItemsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Owner, comments and last/next bookings for a batch of items
    async fn with_bookings(
        &self,
        repository: &Repository,
        user_id: i64,
        items: Vec<Item>,
    ) -> AppResult<Vec<ItemWithBookingsDto>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let now = self.clock.utc();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();

        let mut comments = comments_by_item(repository.comments.find_by_item_ids(&ids).await?);
        let bookings = repository.bookings.find_for_owned_items(user_id, &ids).await?;
        let mut aggregates = booking_aggregates(&bookings, now);

        Ok(items
            .iter()
            .map(|item| {
                ItemWithBookingsDto::new(
                    item,
                    &comments.remove(&item.id).unwrap_or_default(),
                    aggregates.remove(&item.id).unwrap_or_default(),
                )
            })
            .collect())
    }

    /// List a new item for the user, optionally answering a request
    pub async fn create(&self, user_id: i64, item: CreateItem) -> AppResult<ItemDto> {
        item.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;
        ensure_user(&uow.repository, user_id).await?;

        if let Some(request_id) = item.request_id {
            if uow.repository.requests.find_by_id(request_id).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "Request with id {} not found",
                    request_id
                )));
            }
        }

        let created = uow
            .repository
            .items
            .create(NewItem {
                name: item.name,
                description: item.description,
                available: item.available.unwrap_or_default(),
                owner_id: user_id,
                request_id: item.request_id,
            })
            .await?;
        uow.commit().await?;

        tracing::info!(item_id = created.id, owner_id = user_id, "Item created");
        Ok(ItemDto::new(&created, &[]))
    }

    /// Partially update an item; only its owner may do so
    pub async fn update(&self, user_id: i64, item_id: i64, update: UpdateItem) -> AppResult<ItemDto> {
        update.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;

        let mut item = find_item(&uow.repository, item_id).await?;
        if item.owner_id != user_id {
            return Err(AppError::Forbidden(format!(
                "User {} does not own item {}",
                user_id, item_id
            )));
        }

        item.apply_update(update);
        let updated = uow.repository.items.update(&item).await?;
        let mut dtos = with_comments(&uow.repository, vec![updated]).await?;
        uow.commit().await?;
        tracing::info!(item_id, "Item updated");

        dtos.pop()
            .ok_or_else(|| AppError::Internal("Updated item vanished".to_string()))
    }

    /// Item details; booking dates are only visible to the owner
    pub async fn get(&self, user_id: i64, item_id: i64) -> AppResult<ItemWithBookingsDto> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let item = find_item(&uow.repository, item_id).await?;
        let mut dtos = self.with_bookings(&uow.repository, user_id, vec![item]).await?;
        uow.commit().await?;

        dtos.pop()
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
    }

    /// Every item the user owns, ordered by id
    pub async fn list_owner_items(&self, user_id: i64) -> AppResult<Vec<ItemWithBookingsDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        ensure_user(&uow.repository, user_id).await?;
        let items = uow.repository.items.find_by_owner(user_id).await?;
        let dtos = self.with_bookings(&uow.repository, user_id, items).await?;
        uow.commit().await?;
        Ok(dtos)
    }

    /// Case-insensitive search over available items; blank text matches nothing
    pub async fn search(&self, text: Option<&str>) -> AppResult<Vec<ItemDto>> {
        let text = match text.map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(Vec::new()),
        };
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let items = uow.repository.items.search(text).await?;
        let dtos = with_comments(&uow.repository, items).await?;
        uow.commit().await?;
        Ok(dtos)
    }

    /// Comment on an item the user has finished borrowing
    pub async fn add_comment(
        &self,
        user_id: i64,
        item_id: i64,
        comment: CreateComment,
    ) -> AppResult<CommentDto> {
        comment.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;
        ensure_user(&uow.repository, user_id).await?;
        find_item(&uow.repository, item_id).await?;

        let now = self.clock.utc();
        if !uow
            .repository
            .bookings
            .has_finished_booking(user_id, item_id, now)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "User {} has no finished booking of item {}",
                user_id, item_id
            )));
        }

        let created = uow
            .repository
            .comments
            .create(NewComment {
                text: comment.text,
                item_id,
                author_id: user_id,
                created: now,
            })
            .await?;
        uow.commit().await?;

        tracing::info!(comment_id = created.id, item_id, author_id = user_id, "Comment added");
        Ok(CommentDto::from(&created))
    }
}

async fn find_item(repository: &Repository, item_id: i64) -> AppResult<Item> {
    repository
        .items
        .find_by_id(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
}

/// Attach comments to a batch of items, preserving their order
async fn with_comments(repository: &Repository, items: Vec<Item>) -> AppResult<Vec<ItemDto>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let mut comments = comments_by_item(repository.comments.find_by_item_ids(&ids).await?);

    Ok(items
        .iter()
        .map(|item| ItemDto::new(item, &comments.remove(&item.id).unwrap_or_default()))
        .collect())
}
