use serde::{Deserialize, Serialize};

/// Claims embedded in every session token the admin server issues.
///
/// One fixed shape serves both token kinds — an access token and a refresh
/// token differ only in lifetime and in what the server lets them do, never
/// in structure.  Keeping the claims a typed struct (rather than a
/// string-keyed map) means a token that decodes at all is guaranteed to
/// carry every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Standard subject — set to the username.
    pub sub: String,

    /// Role name as stored in the roles table ("admin" / "user").
    /// Captured at signing time; refreshed from the database whenever a new
    /// access token is minted from a refresh token.
    pub role: String,

    /// Issuer tag (config `auth.issuer`).
    pub iss: String,

    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
}
