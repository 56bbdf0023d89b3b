use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use hyper::header::HeaderValue;

use crate::auth::codec::TokenCodec;
use shared::types::{AuthClaims, AuthConfig};

/// Cookie carrying the short-lived access token.
pub const ACCESS_COOKIE: &str = "access";

/// Cookie carrying the long-lived refresh token.
pub const REFRESH_COOKIE: &str = "refresh";

/// A signed token plus the absolute expiry baked into its claims — the
/// expiry is needed again for the cookie `Expires` stamp and the login
/// response body.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires: i64,
}

/// Mints the access/refresh token pair on login and single access tokens
/// during silent renewal.
///
/// Sessions are stateless: nothing is written anywhere when a token is
/// minted, all session state lives in the signed cookies.
#[derive(Clone)]
pub struct SessionIssuer {
    codec: TokenCodec,
    issuer: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl SessionIssuer {
    pub fn new(codec: TokenCodec, auth: &AuthConfig) -> Self {
        Self {
            codec,
            issuer: auth.issuer.clone(),
            access_ttl_secs: auth.access_expiry_secs() as i64,
            refresh_ttl_secs: auth.refresh_expiry_secs() as i64,
        }
    }

    /// The codec this issuer signs with; the guard verifies through the same
    /// one so both ends always agree on the secret.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint an access token expiring `access_expiry_minutes` from `now`.
    pub fn mint_access(&self, username: &str, role: &str, now: i64) -> Result<IssuedToken> {
        self.mint(username, role, now + self.access_ttl_secs)
    }

    /// Mint a refresh token expiring `refresh_expiry_hours` from `now`.
    pub fn mint_refresh(&self, username: &str, role: &str, now: i64) -> Result<IssuedToken> {
        self.mint(username, role, now + self.refresh_ttl_secs)
    }

    fn mint(&self, username: &str, role: &str, expires: i64) -> Result<IssuedToken> {
        let claims = AuthClaims {
            sub: username.to_string(),
            role: role.to_string(),
            iss: self.issuer.clone(),
            exp: expires,
        };

        Ok(IssuedToken {
            token: self.codec.sign(&claims)?,
            expires,
        })
    }
}

/// Build a `Set-Cookie` value for a session token:
/// `name=<token>; HttpOnly; Secure; Expires=<RFC1123>`.
///
/// `HttpOnly` keeps the token out of reach of page scripts and `Secure`
/// restricts it to HTTPS; `Expires` mirrors the claim expiry so the browser
/// drops the cookie the moment the token inside it stops verifying.
pub fn session_cookie(name: &str, token: &str, expires: i64) -> Result<HeaderValue> {
    let expires = u64::try_from(expires).map_err(|_| anyhow!("Cookie expiry before epoch"))?;
    let stamp = httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(expires));

    let cookie = format!("{}={}; HttpOnly; Secure; Expires={}", name, token, stamp);
    HeaderValue::from_str(&cookie).context("Invalid cookie value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::utils::get_timestamp;
    use shared::types::AuthConfig;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(
            TokenCodec::new(SECRET),
            &AuthConfig {
                jwt_secret: Some(SECRET.to_string()),
                issuer: "blog".to_string(),
                access_expiry_minutes: 5,
                refresh_expiry_hours: 24,
            },
        )
    }

    #[test]
    fn access_token_carries_identity_and_short_expiry() {
        let issuer = issuer();
        let now = get_timestamp();

        let issued = issuer.mint_access("alice", "admin", now).unwrap();
        assert_eq!(issued.expires, now + 300);

        let claims = issuer.codec().verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, "blog");
        assert_eq!(claims.exp, now + 300);
    }

    #[test]
    fn refresh_token_has_the_long_expiry() {
        let issuer = issuer();
        let now = get_timestamp();

        let issued = issuer.mint_refresh("alice", "user", now).unwrap();
        assert_eq!(issued.expires, now + 86_400);

        let claims = issuer.codec().verify(&issued.token).unwrap();
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn access_and_refresh_tokens_share_one_claim_shape() {
        let issuer = issuer();
        let now = get_timestamp();

        let access = issuer.mint_access("alice", "admin", now).unwrap();
        let refresh = issuer.mint_refresh("alice", "admin", now).unwrap();

        let a = issuer.codec().verify(&access.token).unwrap();
        let r = issuer.codec().verify(&refresh.token).unwrap();

        // Only the expiry differs.
        assert_eq!(a.sub, r.sub);
        assert_eq!(a.role, r.role);
        assert_eq!(a.iss, r.iss);
        assert!(r.exp > a.exp);
    }

    #[test]
    fn cookie_has_the_exact_attribute_set() {
        let cookie = session_cookie("access", "aaa.bbb.ccc", 0).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "access=aaa.bbb.ccc; HttpOnly; Secure; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test]
    fn cookie_expiry_is_rfc1123() {
        let issuer = issuer();
        let now = get_timestamp();
        let issued = issuer.mint_access("alice", "admin", now).unwrap();

        let cookie = session_cookie(ACCESS_COOKIE, &issued.token, issued.expires).unwrap();
        let value = cookie.to_str().unwrap();

        let stamp = value.split("Expires=").nth(1).unwrap();
        let parsed = httpdate::parse_http_date(stamp).unwrap();
        let secs = parsed.duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        assert_eq!(secs, issued.expires);
    }
}
