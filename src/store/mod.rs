//! Storage contracts for users and todos.
//!
//! Every todo operation takes the owner's id alongside the todo id; a todo id
//! on its own never grants access. A todo owned by someone else is reported
//! exactly like one that does not exist.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{NewUser, Todo, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Page size used by the todo listing endpoint.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    Conflict,
    #[error("todo must have non empty title or note")]
    EmptyTodo,
    #[error("expected exactly one row to change, {0} changed")]
    RowsUnaffected(usize),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

/// Maps an affected-row count from a single-row mutation onto the store contract.
pub fn expect_single_row(count: usize) -> Result<(), StoreError> {
    match count {
        0 => Err(StoreError::NotFound),
        1 => Ok(()),
        n => Err(StoreError::RowsUnaffected(n)),
    }
}

pub trait CredentialStore: Send + Sync {
    fn create_user(&self, new_user: NewUser<'_>) -> Result<User, StoreError>;

    fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;
}

pub trait TodoStore: Send + Sync {
    fn create(
        &self,
        owner_id: i64,
        title: Option<&str>,
        note: Option<&str>,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<Todo, StoreError>;

    /// Todos with an id greater than `cursor`, ascending, at most `page_size`.
    fn list_by_owner(&self, owner_id: i64, cursor: i64, page_size: i64)
        -> Result<Vec<Todo>, StoreError>;

    fn get_by_id(&self, todo_id: i64, owner_id: i64) -> Result<Todo, StoreError>;

    /// Writes only the supplied fields and bumps `modified_at`.
    fn update(
        &self,
        todo_id: i64,
        owner_id: i64,
        title: Option<&str>,
        note: Option<&str>,
    ) -> Result<Todo, StoreError>;

    fn mark_complete(
        &self,
        todo_id: i64,
        owner_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn delete(&self, todo_id: i64, owner_id: i64) -> Result<(), StoreError>;
}
