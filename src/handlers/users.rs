use bcrypt::{hash, verify};
use chrono::Duration;
use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::{self, Json};
use rocket::{post, routes, State};
use validator::Validate;

use crate::auth::TOKEN_COOKIE;
use crate::error::ApiError;
use crate::models::{LoginRequest, NewUser, RegisterRequest};
use crate::response::Envelope;
use crate::AppState;

pub fn routes() -> Vec<rocket::Route> {
    routes![register, login]
}

fn set_token_cookie(cookies: &CookieJar<'_>, token: String, ttl: Duration) {
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(false)
        .max_age(rocket::time::Duration::seconds(ttl.num_seconds()));
    cookies.add(cookie);
}

#[post("/user/register", data = "<body>")]
pub fn register(
    body: Result<Json<RegisterRequest>, json::Error<'_>>,
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
) -> Result<Envelope<()>, ApiError> {
    let body = body?.into_inner();
    body.validate()?;

    let password_hash = hash(&body.password, state.bcrypt_cost)?;
    let user = state.users.create_user(NewUser {
        email: &body.email,
        password_hash: &password_hash,
        first_name: Some(&body.first_name),
        last_name: Some(&body.last_name),
    })?;

    let token = state.tokens.issue_session(user.id)?;
    set_token_cookie(cookies, token.clone(), state.tokens.session_ttl());
    tracing::info!(user_id = user.id, "registered user");

    Ok(Envelope::created()
        .message("User registered successfully!")
        .resource_id(user.id)
        .credentials(user.email, token))
}

#[post("/user/login", data = "<body>")]
pub fn login(
    body: Result<Json<LoginRequest>, json::Error<'_>>,
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
) -> Result<Envelope<()>, ApiError> {
    let body = body?.into_inner();
    body.validate()?;

    let user = state
        .users
        .get_user_by_email(&body.email)
        .map_err(|e| ApiError::store(e, "User not found"))?;

    if !verify(&body.password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "login rejected: wrong password");
        return Err(ApiError::Unauthorized("Unable to login".to_string()));
    }

    let token = state.tokens.issue_session(user.id)?;
    set_token_cookie(cookies, token.clone(), state.tokens.session_ttl());
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Envelope::ok()
        .message("User logged in successfully!")
        .resource_id(user.id)
        .credentials(user.email, token))
}
