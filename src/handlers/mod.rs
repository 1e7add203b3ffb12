//! HTTP handlers. Each one validates its input, calls a store, and answers
//! with an [`Envelope`](crate::response::Envelope) or an
//! [`ApiError`](crate::error::ApiError).

pub mod todos;
pub mod users;
