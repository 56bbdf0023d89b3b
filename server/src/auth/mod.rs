pub mod codec;
pub mod guard;
pub mod issuer;

pub use codec::{TokenCodec, TokenError};
pub use guard::{GuardPass, Identity, authenticate};
pub use issuer::{ACCESS_COOKIE, REFRESH_COOKIE, IssuedToken, SessionIssuer, session_cookie};
