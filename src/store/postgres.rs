use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::{expect_single_row, CredentialStore, StoreError, TodoStore};
use crate::db::{PgPool, PgPooledConnection};
use crate::models::{is_blank, NewTodo, NewUser, Todo, TodoChanges, User};
use crate::schema::{todos, users};

/// Diesel-backed store sharing one r2d2 pool across requests.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    fn conn(&self) -> Result<PgPooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl CredentialStore for PgStore {
    fn create_user(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        use crate::schema::users::dsl::*;

        let mut conn = self.conn()?;

        // Check if user already exists
        let existing_user = users
            .filter(email.eq(new_user.email))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()?;

        if existing_user.is_some() {
            return Err(StoreError::Conflict);
        }

        // The unique index still guards against a concurrent registration.
        diesel::insert_into(users)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result::<User>(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::Conflict
                }
                other => StoreError::Database(other),
            })
    }

    fn get_user_by_email(&self, lookup: &str) -> Result<User, StoreError> {
        let mut conn = self.conn()?;

        users::table
            .filter(users::email.eq(lookup))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()?
            .ok_or(StoreError::NotFound)
    }
}

impl TodoStore for PgStore {
    fn create(
        &self,
        owner_id: i64,
        title: Option<&str>,
        note: Option<&str>,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<Todo, StoreError> {
        if is_blank(title) && is_blank(note) {
            return Err(StoreError::EmptyTodo);
        }

        let mut conn = self.conn()?;
        let new_todo = NewTodo {
            user_id: owner_id,
            title,
            note,
            due_at,
        };

        let mut inserted = diesel::insert_into(todos::table)
            .values(&new_todo)
            .returning(Todo::as_returning())
            .get_results::<Todo>(&mut conn)?;

        match inserted.len() {
            1 => Ok(inserted.remove(0)),
            n => Err(StoreError::RowsUnaffected(n)),
        }
    }

    fn list_by_owner(
        &self,
        owner_id: i64,
        cursor: i64,
        page_size: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let mut conn = self.conn()?;

        let page = todos::table
            .filter(todos::user_id.eq(owner_id).and(todos::id.gt(cursor)))
            .order(todos::id.asc())
            .limit(page_size.max(0))
            .select(Todo::as_select())
            .load::<Todo>(&mut conn)?;
        Ok(page)
    }

    fn get_by_id(&self, todo_id: i64, owner_id: i64) -> Result<Todo, StoreError> {
        let mut conn = self.conn()?;

        todos::table
            .filter(todos::id.eq(todo_id).and(todos::user_id.eq(owner_id)))
            .select(Todo::as_select())
            .first::<Todo>(&mut conn)
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    fn update(
        &self,
        todo_id: i64,
        owner_id: i64,
        title: Option<&str>,
        note: Option<&str>,
    ) -> Result<Todo, StoreError> {
        let mut conn = self.conn()?;
        let changes = TodoChanges {
            title,
            note,
            modified_at: Utc::now(),
        };

        let mut updated = diesel::update(
            todos::table.filter(todos::id.eq(todo_id).and(todos::user_id.eq(owner_id))),
        )
        .set(&changes)
        .returning(Todo::as_returning())
        .get_results::<Todo>(&mut conn)?;

        expect_single_row(updated.len())?;
        Ok(updated.remove(0))
    }

    fn mark_complete(
        &self,
        todo_id: i64,
        owner_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;

        let count = diesel::update(
            todos::table.filter(todos::id.eq(todo_id).and(todos::user_id.eq(owner_id))),
        )
        .set((
            todos::completed_at.eq(Some(completed_at)),
            todos::is_done.eq(true),
        ))
        .execute(&mut conn)?;

        expect_single_row(count)
    }

    fn delete(&self, todo_id: i64, owner_id: i64) -> Result<(), StoreError> {
        let mut conn = self.conn()?;

        let count = diesel::delete(
            todos::table.filter(todos::id.eq(todo_id).and(todos::user_id.eq(owner_id))),
        )
        .execute(&mut conn)?;

        expect_single_row(count)
    }
}
