//! Users repository for database operations

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User},
};

use super::{db::Db, UserRepository};

#[derive(Clone)]
pub struct UsersRepository {
    db: Db,
}

impl UsersRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UsersRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db.conn().await?)
            .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email FROM users WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&mut *self.db.conn().await?)
        .await?;
        Ok(users)
    }

    async fn exists_by_id(&self, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.db.conn().await?)
            .await?;
        Ok(exists)
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT id, name, email FROM users ORDER BY id")
            .fetch_all(&mut *self.db.conn().await?)
            .await?;
        Ok(users)
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&mut *self.db.conn().await?)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&mut *self.db.conn().await?)
                .await?
        };
        Ok(exists)
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&mut *self.db.conn().await?)
        .await
        .map_err(map_unique_violation)?;
        Ok(created)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $1, email = $2 WHERE id = $3 RETURNING id, name, email",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.id)
        .fetch_optional(&mut *self.db.conn().await?)
        .await
        .map_err(map_unique_violation)?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;
        Ok(updated)
    }

    async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db.conn().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// The unique email index can still fire when two writers race past the
/// service-level check
fn map_unique_violation(error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::AlreadyExists("Email is already registered".to_string())
        }
        _ => AppError::Database(error),
    }
}
