//! Connection handles for the PostgreSQL repositories
//!
//! A [`Db`] either borrows a connection from the pool per statement or
//! sends every statement through one shared transaction. The services open
//! that transaction with [`super::Repository::begin`].

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use sqlx::{pool::PoolConnection, PgConnection, Pool, Postgres, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{AppError, AppResult};

/// Transaction shared by every repository handle of a unit of work.
/// `None` once it was committed.
pub type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// What a unit of work is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    /// Statement issued right after BEGIN, if any
    pub fn set_transaction_sql(self) -> Option<&'static str> {
        match self {
            Access::ReadOnly => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY"),
            Access::ReadWrite => None,
        }
    }
}

/// Where a PostgreSQL repository sends its statements
#[derive(Clone)]
pub enum Db {
    Pool(Pool<Postgres>),
    Transaction(SharedTransaction),
}

impl Db {
    /// Connection for the next statement
    pub async fn conn(&self) -> AppResult<DbConn<'_>> {
        match self {
            Db::Pool(pool) => Ok(DbConn::Pooled(pool.acquire().await?)),
            Db::Transaction(shared) => {
                let guard = shared.lock().await;
                MutexGuard::try_map(guard, |slot| slot.as_mut())
                    .map(DbConn::Transaction)
                    .map_err(|_| AppError::Internal("Transaction already finished".to_string()))
            }
        }
    }
}

pub enum DbConn<'a> {
    Pooled(PoolConnection<Postgres>),
    Transaction(MappedMutexGuard<'a, Transaction<'static, Postgres>>),
}

impl Deref for DbConn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            DbConn::Pooled(conn) => &**conn,
            DbConn::Transaction(tx) => &***tx,
        }
    }
}

impl DerefMut for DbConn<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            DbConn::Pooled(conn) => &mut **conn,
            DbConn::Transaction(tx) => &mut ***tx,
        }
    }
}
