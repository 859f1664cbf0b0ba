//! Item (catalog) model and related types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::booking::BookingAggregate;
use super::comment::{Comment, CommentDto};

/// Item model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    pub request_id: Option<i64>,
}

/// Item projection with its comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
    pub comments: Vec<CommentDto>,
}

/// Item projection for its owner, with the surrounding bookings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithBookingsDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
    pub comments: Vec<CommentDto>,
    /// End of the most recent finished booking
    pub last_booking: Option<DateTime<Utc>>,
    /// Start of the nearest upcoming booking that was not rejected
    pub next_booking: Option<DateTime<Utc>>,
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(custom(function = "crate::models::not_blank"))]
    pub name: String,
    #[validate(custom(function = "crate::models::not_blank"))]
    pub description: String,
    #[validate(required(message = "Availability flag is required"))]
    pub available: Option<bool>,
    #[validate(range(min = 1, message = "Request id must be positive"))]
    pub request_id: Option<i64>,
}

/// Update item request; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    #[validate(custom(function = "crate::models::not_blank"))]
    pub name: Option<String>,
    #[validate(custom(function = "crate::models::not_blank"))]
    pub description: Option<String>,
    pub available: Option<bool>,
}

/// Item about to be inserted
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    pub request_id: Option<i64>,
}

impl Item {
    /// Apply the non-null fields of an update
    pub fn apply_update(&mut self, update: UpdateItem) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(available) = update.available {
            self.available = available;
        }
    }
}

impl ItemDto {
    pub fn new(item: &Item, comments: &[Comment]) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
            comments: comments.iter().map(CommentDto::from).collect(),
        }
    }
}

impl ItemWithBookingsDto {
    pub fn new(item: &Item, comments: &[Comment], aggregate: BookingAggregate) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
            comments: comments.iter().map(CommentDto::from).collect(),
            last_booking: aggregate.last.map(|b| b.end),
            next_booking: aggregate.next.map(|b| b.start),
        }
    }
}

/// Group comments by the item they belong to
pub fn comments_by_item(comments: Vec<Comment>) -> HashMap<i64, Vec<Comment>> {
    let mut map: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        map.entry(comment.item_id).or_default().push(comment);
    }
    map
}
