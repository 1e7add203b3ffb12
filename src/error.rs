// todo_api/src/error.rs
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::TokenError;
use crate::response::Envelope;
use crate::store::StoreError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors a handler can answer with. The message is what the client sees;
/// internal causes are logged where they are converted and never echoed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn internal() -> Self {
        ApiError::Internal(INTERNAL_MESSAGE.to_string())
    }

    /// Converts a store failure, using `not_found` as the message for a miss.
    pub fn store(err: StoreError, not_found: &str) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound(not_found.to_string()),
            StoreError::Conflict => ApiError::Conflict("Email already used".to_string()),
            StoreError::EmptyTodo => ApiError::BadRequest(err.to_string()),
            StoreError::RowsUnaffected(_) | StoreError::Database(_) | StoreError::Pool(_) => {
                tracing::error!(error = %err, "storage failure");
                ApiError::internal()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::store(err, "Resource not found")
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::BadRequest(first_validation_message(&errors))
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!(error = %err, "password hashing failed");
        ApiError::internal()
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        tracing::error!(error = %err, "token issuance failed");
        ApiError::internal()
    }
}

impl<'a> From<json::Error<'a>> for ApiError {
    fn from(err: json::Error<'a>) -> Self {
        tracing::debug!(error = ?err, "rejected request body");
        ApiError::BadRequest("Bad request".to_string())
    }
}

// Field order in `ValidationErrors` is unspecified, so pick the first by name.
fn first_validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field, e)))
        .next()
        .map(|(field, e)| match &e.message {
            Some(message) => message.to_string(),
            None => format!("{} is invalid", field),
        })
        .unwrap_or_else(|| "Bad request".to_string())
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        Envelope::<()>::new(self.status())
            .message(self.to_string())
            .respond_to(req)
    }
}
