use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, routes, State};
use validator::Validate;

use crate::auth::{Authenticated, CurrentUser};
use crate::error::ApiError;
use crate::models::{CreateTodoRequest, Todo, UpdateTodoRequest};
use crate::response::Envelope;
use crate::store::DEFAULT_PAGE_SIZE;
use crate::AppState;

const TODO_NOT_FOUND: &str = "Unable to find todo";

// Every route lists `Authenticated` ahead of `CurrentUser`: the first verifies
// the token and attaches the id, the second reads it back.
pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_todos,
        create_todo,
        get_todo,
        update_todo,
        complete_todo,
        delete_todo
    ]
}

fn todo_id(id: Result<i64, &str>) -> Result<i64, ApiError> {
    id.map_err(|_| ApiError::BadRequest("Invalid todo id".to_string()))
}

fn parse_cursor(prev: Option<&str>) -> Result<i64, ApiError> {
    match prev {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid cursor".to_string())),
    }
}

#[get("/todos?<prev>")]
pub fn list_todos(
    _auth: Authenticated,
    user: CurrentUser,
    prev: Option<&str>,
    state: &State<AppState>,
) -> Result<Envelope<Vec<Todo>>, ApiError> {
    let cursor = parse_cursor(prev)?;
    let page = state.todos.list_by_owner(user.0, cursor, DEFAULT_PAGE_SIZE)?;
    if page.is_empty() {
        return Err(ApiError::NotFound("No todo items".to_string()));
    }
    Ok(Envelope::ok().data(page))
}

#[post("/todos", data = "<body>")]
pub fn create_todo(
    _auth: Authenticated,
    user: CurrentUser,
    body: Result<Json<CreateTodoRequest>, json::Error<'_>>,
    state: &State<AppState>,
) -> Result<Envelope<Todo>, ApiError> {
    let body = body?.into_inner();
    body.validate()?;

    let todo = state.todos.create(
        user.0,
        body.title.as_deref(),
        body.note.as_deref(),
        body.due_at,
    )?;
    tracing::debug!(user_id = user.0, todo_id = todo.id, "created todo");

    Ok(Envelope::created()
        .message("Todo item created successfully!")
        .resource_id(todo.id)
        .data(todo))
}

#[get("/todos/<id>")]
pub fn get_todo(
    _auth: Authenticated,
    user: CurrentUser,
    id: Result<i64, &str>,
    state: &State<AppState>,
) -> Result<Envelope<Todo>, ApiError> {
    let id = todo_id(id)?;
    let todo = state
        .todos
        .get_by_id(id, user.0)
        .map_err(|e| ApiError::store(e, TODO_NOT_FOUND))?;
    Ok(Envelope::ok().data(todo))
}

#[put("/todos/<id>", data = "<body>")]
pub fn update_todo(
    _auth: Authenticated,
    user: CurrentUser,
    id: Result<i64, &str>,
    body: Result<Json<UpdateTodoRequest>, json::Error<'_>>,
    state: &State<AppState>,
) -> Result<Envelope<Todo>, ApiError> {
    let id = todo_id(id)?;
    let body = body?.into_inner();
    body.validate()?;

    let todo = state
        .todos
        .update(id, user.0, body.title.as_deref(), body.note.as_deref())
        .map_err(|e| ApiError::store(e, TODO_NOT_FOUND))?;

    Ok(Envelope::ok()
        .message("Todo updated successfully!")
        .resource_id(todo.id)
        .data(todo))
}

#[get("/todos/<id>/completed")]
pub fn complete_todo(
    _auth: Authenticated,
    user: CurrentUser,
    id: Result<i64, &str>,
    state: &State<AppState>,
) -> Result<Envelope<()>, ApiError> {
    let id = todo_id(id)?;
    state
        .todos
        .mark_complete(id, user.0, Utc::now())
        .map_err(|e| ApiError::store(e, TODO_NOT_FOUND))?;

    Ok(Envelope::ok()
        .message("Todo marked as complete!")
        .resource_id(id))
}

#[delete("/todos/<id>")]
pub fn delete_todo(
    _auth: Authenticated,
    user: CurrentUser,
    id: Result<i64, &str>,
    state: &State<AppState>,
) -> Result<Envelope<()>, ApiError> {
    let id = todo_id(id)?;
    state
        .todos
        .delete(id, user.0)
        .map_err(|e| ApiError::store(e, TODO_NOT_FOUND))?;

    Ok(Envelope::ok()
        .message("Todo deleted successfully!")
        .resource_id(id))
}
