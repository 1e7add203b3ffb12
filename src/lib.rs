use std::sync::Arc;

use rocket::http::Status;
use rocket::request::Request;
use rocket::{catch, catchers, get, routes, Build, Rocket};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;
pub mod schema;
pub mod store;

use auth::{AuthError, TokenService};
use response::Envelope;
use store::{CredentialStore, TodoStore};

/// Everything handlers and guards need, handed to Rocket as managed state.
pub struct AppState {
    pub users: Arc<dyn CredentialStore>,
    pub todos: Arc<dyn TodoStore>,
    pub tokens: TokenService,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        todos: Arc<dyn TodoStore>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Self {
        AppState {
            users,
            todos,
            tokens,
            bcrypt_cost,
        }
    }

    /// Uses one backing store for both users and todos.
    pub fn with_store<S>(store: Arc<S>, tokens: TokenService, bcrypt_cost: u32) -> Self
    where
        S: CredentialStore + TodoStore + 'static,
    {
        let users: Arc<dyn CredentialStore> = store.clone();
        let todos: Arc<dyn TodoStore> = store;
        Self::new(users, todos, tokens, bcrypt_cost)
    }
}

#[get("/ping")]
fn ping() -> Envelope<()> {
    Envelope::ok().message("pong")
}

// Renders every framework-level failure in the regular envelope. Auth guard
// failures leave their reason in the request cache.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> Envelope<()> {
    let message = match req.local_cache(|| None::<AuthError>) {
        Some(err) => err.message(),
        None => status.reason().unwrap_or("Unknown error"),
    };
    Envelope::new(status).message(message)
}

// This function can be used by main.rs to launch the server
// and by tests to get a Rocket instance.
pub fn rocket_instance(state: AppState, api_version: &str) -> Rocket<Build> {
    let base = config::api_base(api_version);
    rocket::build()
        .manage(state)
        .mount("/", routes![ping])
        .mount(base.as_str(), handlers::users::routes())
        .mount(base.as_str(), handlers::todos::routes())
        .register("/", catchers![default_catcher])
}
