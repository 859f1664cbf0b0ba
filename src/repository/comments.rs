//! Comments repository for database operations

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::comment::{Comment, NewComment},
};

use super::{db::Db, CommentRepository};

#[derive(Clone)]
pub struct CommentsRepository {
    db: Db,
}

impl CommentsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for CommentsRepository {
    async fn create(&self, comment: NewComment) -> AppResult<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (text, item_id, author_id, created)
                VALUES ($1, $2, $3, $4)
                RETURNING id, text, item_id, author_id, created
            )
            SELECT c.id, c.text, c.item_id, c.author_id, u.name AS author_name, c.created
            FROM inserted c
            JOIN users u ON u.id = c.author_id
            "#,
        )
        .bind(&comment.text)
        .bind(comment.item_id)
        .bind(comment.author_id)
        .bind(comment.created)
        .fetch_one(&mut *self.db.conn().await?)
        .await?;
        Ok(created)
    }

    async fn find_by_item_ids(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.item_id, c.author_id, u.name AS author_name, c.created
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.item_id = ANY($1)
            ORDER BY c.created ASC, c.id ASC
            "#,
        )
        .bind(item_ids)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(comments)
    }
}
