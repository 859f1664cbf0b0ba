//! Item requests: wanted items posted by users

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::item::Item;

/// Item request model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ItemRequest {
    pub id: i64,
    pub description: String,
    pub requestor_id: i64,
    pub created: DateTime<Utc>,
}

/// Item listed in answer to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemForRequestDto {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

impl From<&Item> for ItemForRequestDto {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            owner_id: item.owner_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequestDto {
    pub id: i64,
    pub description: String,
    pub created: DateTime<Utc>,
    pub items: Vec<ItemForRequestDto>,
}

impl ItemRequestDto {
    pub fn new(request: &ItemRequest, items: &[Item]) -> Self {
        Self {
            id: request.id,
            description: request.description.clone(),
            created: request.created,
            items: items.iter().map(ItemForRequestDto::from).collect(),
        }
    }
}

/// Create item request payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[validate(custom(function = "crate::models::not_blank"))]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewItemRequest {
    pub description: String,
    pub requestor_id: i64,
    pub created: DateTime<Utc>,
}

/// Group items by the request they answer; items without a request are skipped
pub fn items_by_request(items: Vec<Item>) -> HashMap<i64, Vec<Item>> {
    let mut map: HashMap<i64, Vec<Item>> = HashMap::new();
    for item in items {
        if let Some(request_id) = item.request_id {
            map.entry(request_id).or_default().push(item);
        }
    }
    map
}
