use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use super::token::TokenError;
use crate::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Why a request was turned away before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    MalformedHeader,
    InvalidToken,
    UnparseableToken,
    MissingIdentity,
    NoAppState,
}

impl AuthError {
    pub fn status(self) -> Status {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidToken => Status::Unauthorized,
            AuthError::MalformedHeader | AuthError::UnparseableToken => Status::BadRequest,
            AuthError::MissingIdentity | AuthError::NoAppState => Status::InternalServerError,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AuthError::MissingCredentials => {
                "Authorized routes require cookie token or Authorization header"
            }
            AuthError::MalformedHeader => {
                "Authorization header should be in the format `Bearer $TOKEN`"
            }
            AuthError::InvalidToken => "Invalid token",
            AuthError::UnparseableToken => "Unable to parse token",
            AuthError::MissingIdentity => "Missing authenticated user",
            AuthError::NoAppState => "Server state unavailable",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature | TokenError::Expired => AuthError::InvalidToken,
            TokenError::Malformed | TokenError::Encoding(_) => AuthError::UnparseableToken,
        }
    }
}

/// Picks the session token out of the request, preferring the cookie.
pub fn extract_token<'a>(
    cookie: Option<&'a str>,
    authorization: Option<&'a str>,
) -> Result<&'a str, AuthError> {
    if let Some(token) = cookie.filter(|c| !c.is_empty()) {
        return Ok(token);
    }

    let header = match authorization {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::MissingCredentials),
    };

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => Ok(*token),
        _ => Err(AuthError::MalformedHeader),
    }
}

// Request-local slot holding the verified user id.
struct CachedIdentity(Option<i64>);

fn attach_identity(req: &Request<'_>, user_id: i64) {
    req.local_cache(|| CachedIdentity(Some(user_id)));
}

/// The user id attached by [`Authenticated`], if it ran and succeeded.
pub fn identity(req: &Request<'_>) -> Option<i64> {
    req.local_cache(|| CachedIdentity(None)).0
}

fn reject<T>(req: &Request<'_>, err: AuthError) -> Outcome<T, AuthError> {
    tracing::debug!(reason = ?err, uri = %req.uri(), "request rejected");
    req.local_cache(|| Some(err));
    Outcome::Error((err.status(), err))
}

/// Authorization guard: verifies the session token and attaches the user id
/// to the request. Place it before any guard that reads the identity.
pub struct Authenticated;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Authenticated {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = match req.rocket().state::<AppState>() {
            Some(s) => s,
            None => return reject(req, AuthError::NoAppState),
        };

        let cookie = req
            .cookies()
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string());
        let token = match extract_token(cookie.as_deref(), req.headers().get_one("Authorization")) {
            Ok(t) => t,
            Err(e) => return reject(req, e),
        };

        match state.tokens.verify(token) {
            Ok(user_id) => {
                attach_identity(req, user_id);
                Outcome::Success(Authenticated)
            }
            Err(e) => reject(req, AuthError::from(e)),
        }
    }
}

/// The authenticated user id, read back from request-local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match identity(req) {
            Some(user_id) => Outcome::Success(CurrentUser(user_id)),
            None => reject(req, AuthError::MissingIdentity),
        }
    }
}
