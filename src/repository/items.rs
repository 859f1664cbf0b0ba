//! Items repository for database operations

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::item::{Item, NewItem},
};

use super::{db::Db, ItemRepository};

const ITEM_COLUMNS: &str = "id, name, description, available, owner_id, request_id";

#[derive(Clone)]
pub struct ItemsRepository {
    db: Db,
}

impl ItemsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// Escape LIKE wildcards so user text matches literally
fn like_pattern(text: &str) -> String {
    let escaped = text
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl ItemRepository for ItemsRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.db.conn().await?)
        .await?;
        Ok(item)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ANY($1) ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(items)
    }

    async fn find_by_owner(&self, owner_id: i64) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE owner_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(items)
    }

    async fn search(&self, text: &str) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {}
            FROM items
            WHERE available = TRUE
              AND (LOWER(name) LIKE $1 ESCAPE '\' OR LOWER(description) LIKE $1 ESCAPE '\')
            ORDER BY id
            "#,
            ITEM_COLUMNS
        ))
        .bind(like_pattern(text))
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(items)
    }

    async fn create(&self, item: NewItem) -> AppResult<Item> {
        let created = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO items (name, description, available, owner_id, request_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.available)
        .bind(item.owner_id)
        .bind(item.request_id)
        .fetch_one(&mut *self.db.conn().await?)
        .await?;
        Ok(created)
    }

    async fn update(&self, item: &Item) -> AppResult<Item> {
        let updated = sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items SET name = $1, description = $2, available = $3
            WHERE id = $4
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.available)
        .bind(item.id)
        .fetch_optional(&mut *self.db.conn().await?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item.id)))?;
        Ok(updated)
    }

    async fn find_by_request_ids(&self, request_ids: &[i64]) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE request_id = ANY($1) ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(request_ids)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(items)
    }
}
