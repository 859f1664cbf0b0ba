//! Item requests repository for database operations

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::request::{ItemRequest, NewItemRequest},
};

use super::{db::Db, ItemRequestRepository};

#[derive(Clone)]
pub struct RequestsRepository {
    db: Db,
}

impl RequestsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRequestRepository for RequestsRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>> {
        let request = sqlx::query_as::<_, ItemRequest>(
            "SELECT id, description, requestor_id, created FROM item_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db.conn().await?)
        .await?;
        Ok(request)
    }

    async fn create(&self, request: NewItemRequest) -> AppResult<ItemRequest> {
        let created = sqlx::query_as::<_, ItemRequest>(
            r#"
            INSERT INTO item_requests (description, requestor_id, created)
            VALUES ($1, $2, $3)
            RETURNING id, description, requestor_id, created
            "#,
        )
        .bind(&request.description)
        .bind(request.requestor_id)
        .bind(request.created)
        .fetch_one(&mut *self.db.conn().await?)
        .await?;
        Ok(created)
    }

    async fn find_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let requests = sqlx::query_as::<_, ItemRequest>(
            r#"
            SELECT id, description, requestor_id, created
            FROM item_requests
            WHERE requestor_id = $1
            ORDER BY created ASC, id ASC
            "#,
        )
        .bind(requestor_id)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(requests)
    }

    async fn find_by_other_requestors(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let requests = sqlx::query_as::<_, ItemRequest>(
            r#"
            SELECT id, description, requestor_id, created
            FROM item_requests
            WHERE requestor_id != $1
            ORDER BY created ASC, id ASC
            "#,
        )
        .bind(requestor_id)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(requests)
    }
}
