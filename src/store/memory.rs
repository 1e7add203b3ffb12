use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CredentialStore, StoreError, TodoStore};
use crate::models::{is_blank, NewUser, Todo, User};

/// Process-local store backed by concurrent maps. Ids are handed out from
/// monotonically increasing counters, like a database sequence.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<String, User>, // keyed by email
    todos: DashMap<i64, Todo>,
    next_user_id: AtomicI64,
    next_todo_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            users: DashMap::new(),
            todos: DashMap::new(),
            next_user_id: AtomicI64::new(1),
            next_todo_id: AtomicI64::new(1),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn create_user(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        match self.users.entry(new_user.email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
                    email: new_user.email.to_string(),
                    password_hash: new_user.password_hash.to_string(),
                    first_name: new_user.first_name.map(str::to_string),
                    last_name: new_user.last_name.map(str::to_string),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .get(email)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

impl TodoStore for MemoryStore {
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

        let now = Utc::now();
        let todo = Todo {
            id: self.next_todo_id.fetch_add(1, Ordering::SeqCst),
            user_id: owner_id,
            title: title.map(str::to_string),
            note: note.map(str::to_string),
            created_at: now,
            modified_at: now,
            due_at,
            completed_at: None,
            is_done: false,
        };
        self.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    fn list_by_owner(
        &self,
        owner_id: i64,
        cursor: i64,
        page_size: i64,
    ) -> Result<Vec<Todo>, StoreError> {
        let mut page: Vec<Todo> = self
            .todos
            .iter()
            .filter(|entry| entry.value().user_id == owner_id && *entry.key() > cursor)
            .map(|entry| entry.value().clone())
            .collect();
        page.sort_by_key(|todo| todo.id);
        page.truncate(usize::try_from(page_size).unwrap_or(0));
        Ok(page)
    }

    fn get_by_id(&self, todo_id: i64, owner_id: i64) -> Result<Todo, StoreError> {
        match self.todos.get(&todo_id) {
            Some(entry) if entry.value().user_id == owner_id => Ok(entry.value().clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    fn update(
        &self,
        todo_id: i64,
        owner_id: i64,
        title: Option<&str>,
        note: Option<&str>,
    ) -> Result<Todo, StoreError> {
        match self.todos.get_mut(&todo_id) {
            Some(mut entry) if entry.value().user_id == owner_id => {
                let todo = entry.value_mut();
                if let Some(title) = title {
                    todo.title = Some(title.to_string());
                }
                if let Some(note) = note {
                    todo.note = Some(note.to_string());
                }
                todo.modified_at = Utc::now();
                Ok(todo.clone())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    fn mark_complete(
        &self,
        todo_id: i64,
        owner_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.todos.get_mut(&todo_id) {
            Some(mut entry) if entry.value().user_id == owner_id => {
                let todo = entry.value_mut();
                todo.completed_at = Some(completed_at);
                todo.is_done = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    fn delete(&self, todo_id: i64, owner_id: i64) -> Result<(), StoreError> {
        self.todos
            .remove_if(&todo_id, |_, todo| todo.user_id == owner_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
