pub mod guard;
pub mod token;

pub use guard::{identity, AuthError, Authenticated, CurrentUser, TOKEN_COOKIE};
pub use token::{SessionClaims, TokenError, TokenService};
