// todo_api/src/models.rs
use std::borrow::Cow;

use crate::schema::{todos, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Queryable, Identifiable, Selectable, Debug, PartialEq, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, Copy)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// A todo as stored and as sent to clients. Unset optional fields are left
/// out of the JSON entirely rather than rendered as `null`, and the owner id
/// never leaves the server.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = todos)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub is_done: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = todos)]
pub struct NewTodo<'a> {
    pub user_id: i64,
    pub title: Option<&'a str>,
    pub note: Option<&'a str>,
    pub due_at: Option<DateTime<Utc>>,
}

// `None` fields are skipped by the changeset, so only supplied values are written.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = todos)]
pub struct TodoChanges<'a> {
    pub title: Option<&'a str>,
    pub note: Option<&'a str>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "firstName is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "lastName is required"))]
    pub last_name: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

// Used for creating a todo item from a request (user_id will be from auth)
#[derive(Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_todo_content"))]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub note: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Validate, Debug, Default)]
#[validate(schema(function = "validate_todo_changes"))]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub note: Option<String>,
}

/// True when the value is missing or the empty string.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn validate_todo_content(req: &CreateTodoRequest) -> Result<(), ValidationError> {
    if is_blank(req.title.as_deref()) && is_blank(req.note.as_deref()) {
        let mut err = ValidationError::new("empty_todo");
        err.message = Some(Cow::from("Todo must have non empty title or note"));
        return Err(err);
    }
    Ok(())
}

fn validate_todo_changes(req: &UpdateTodoRequest) -> Result<(), ValidationError> {
    if req.title.is_none() && req.note.is_none() {
        let mut err = ValidationError::new("no_changes");
        err.message = Some(Cow::from("At least one of title or note is required"));
        return Err(err);
    }
    Ok(())
}
