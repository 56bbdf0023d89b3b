use hyper::header::{HeaderMap, HeaderValue};
use tracing::{debug, error, info};

use crate::AppState;
use crate::auth::issuer::{ACCESS_COOKIE, REFRESH_COOKIE, session_cookie};
use crate::database::{users, utils};
use crate::handlers::utils::headers::get_cookie;

/// Identity attached to a request that passed the session guard.
///
/// Handlers receive this as an explicit argument — identity is never stashed
/// in an opaque per-request bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub username: String,
    pub role: String,
}

/// Successful guard outcome: who the caller is, plus a replacement `access`
/// cookie when the request was admitted on the strength of its refresh token.
/// The router attaches the replacement to whatever response the wrapped
/// handler produces.
#[derive(Debug)]
pub struct GuardPass {
    pub identity: Identity,
    pub renewed: Option<HeaderValue>,
}

/// Gate in front of every protected route.
///
/// 1. A verifying `access` cookie admits the request outright.
/// 2. Otherwise a verifying `refresh` cookie is a claim to renewal: the
///    subject is re-read from the live user table (role or account status
///    may have changed since the refresh token was signed), a fresh access
///    token is minted from what the table says now, and the request is
///    admitted with the new cookie in tow.
/// 3. Anything else is a terminal denial; the caller logs the reason and
///    answers with the one generic 403 body.
///
/// No state is mutated anywhere — the only suspend point is the user lookup.
pub async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> std::result::Result<GuardPass, String> {
    if let Some(token) = get_cookie(headers, ACCESS_COOKIE) {
        match state.issuer.codec().verify(&token) {
            Ok(claims) => {
                debug!("Access token accepted for {}", claims.sub);
                return Ok(GuardPass {
                    identity: Identity {
                        username: claims.sub,
                        role: claims.role,
                    },
                    renewed: None,
                });
            }
            // Fall through to the refresh path; an expired access token is
            // the normal case there, not an anomaly worth more than a debug.
            Err(e) => debug!("Access token rejected ({}), trying refresh", e),
        }
    }

    let token =
        get_cookie(headers, REFRESH_COOKIE).ok_or("no usable access or refresh cookie")?;

    let claims = state
        .issuer
        .codec()
        .verify(&token)
        .map_err(|e| format!("refresh token rejected: {}", e))?;

    let user = users::get_user(&state.db, &claims.sub)
        .await
        .map_err(|e| {
            // Store trouble is an infrastructure event, not a bad credential;
            // log it loudly but deny the same way as everything else.
            error!("User lookup failed during session renewal: {}", e);
            "credential store unavailable".to_string()
        })?
        .ok_or_else(|| format!("refresh token subject {} no longer exists", claims.sub))?;

    let now = utils::get_timestamp();
    let access = state
        .issuer
        .mint_access(&user.username, &user.role, now)
        .map_err(|e| {
            error!("Failed to mint replacement access token: {}", e);
            "could not mint access token".to_string()
        })?;

    let renewed = session_cookie(ACCESS_COOKIE, &access.token, access.expires).map_err(|e| {
        error!("Failed to build replacement access cookie: {}", e);
        "could not build access cookie".to_string()
    })?;

    info!("Renewed access token for {}", user.username);

    Ok(GuardPass {
        identity: Identity {
            username: user.username,
            role: user.role,
        },
        renewed: Some(renewed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::{SessionIssuer, TokenCodec};
    use crate::database::users::NewUser;
    use crate::database::{open_database, users, utils};
    use shared::types::{AppConfig, AuthClaims, AuthConfig, DatabaseConfig, ServerConfig};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                bind: "127.0.0.1".to_string(),
                port_api: Some(8088),
                port_admin: Some(8081),
            },
            database: DatabaseConfig {
                file: ":memory:".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: Some(SECRET.to_string()),
                issuer: "blog".to_string(),
                access_expiry_minutes: 5,
                refresh_expiry_hours: 24,
            },
        }
    }

    async fn test_state() -> AppState {
        let config = test_config();
        // A single pooled connection: every handle must see the same
        // in-memory database.
        let db = open_database("sqlite::memory:", 1).await.unwrap();
        let issuer = SessionIssuer::new(TokenCodec::new(SECRET), &config.auth);
        AppState {
            db,
            config: Arc::new(config),
            issuer,
        }
    }

    async fn seed_user(state: &AppState, username: &str, role: &str) {
        users::insert_user(
            &state.db,
            &NewUser {
                username: username.to_string(),
                password_hash: utils::hash_password("correct horse").unwrap(),
                real_name: Some("Alice Tester".to_string()),
                email: Some("alice@example.com".to_string()),
                role: role.to_string(),
            },
        )
        .await
        .unwrap();
    }

    fn cookie_headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = pairs
            .iter()
            .map(|(name, token)| format!("{}={}", name, token))
            .collect::<Vec<_>>()
            .join("; ");
        headers.insert("cookie", value.parse().unwrap());
        headers
    }

    fn expired_token(state: &AppState, username: &str, role: &str) -> String {
        let claims = AuthClaims {
            sub: username.to_string(),
            role: role.to_string(),
            iss: "blog".to_string(),
            exp: utils::get_timestamp() - 600,
        };
        state.issuer.codec().sign(&claims).unwrap()
    }

    fn token_from_cookie(cookie: &HeaderValue) -> String {
        let value = cookie.to_str().unwrap();
        let rest = value.strip_prefix("access=").unwrap();
        rest.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn valid_access_cookie_is_admitted_without_renewal() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        let now = utils::get_timestamp();
        let access = state.issuer.mint_access("alice", "admin", now).unwrap();
        let headers = cookie_headers(&[("access", &access.token)]);

        let pass = authenticate(&headers, &state).await.unwrap();
        assert_eq!(
            pass.identity,
            Identity {
                username: "alice".to_string(),
                role: "admin".to_string()
            }
        );
        assert!(pass.renewed.is_none());
    }

    #[tokio::test]
    async fn guard_is_idempotent_for_a_valid_access_cookie() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        let now = utils::get_timestamp();
        let access = state.issuer.mint_access("alice", "admin", now).unwrap();
        let headers = cookie_headers(&[("access", &access.token)]);

        let first = authenticate(&headers, &state).await.unwrap();
        let second = authenticate(&headers, &state).await.unwrap();
        assert_eq!(first.identity, second.identity);
        assert!(second.renewed.is_none());
    }

    #[tokio::test]
    async fn missing_cookies_are_denied() {
        let state = test_state().await;
        assert!(authenticate(&HeaderMap::new(), &state).await.is_err());
    }

    #[tokio::test]
    async fn expired_access_with_valid_refresh_renews_the_session() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        let now = utils::get_timestamp();
        let stale = expired_token(&state, "alice", "admin");
        let refresh = state.issuer.mint_refresh("alice", "admin", now).unwrap();
        let headers = cookie_headers(&[("access", &stale), ("refresh", &refresh.token)]);

        let pass = authenticate(&headers, &state).await.unwrap();
        assert_eq!(pass.identity.username, "alice");

        // The replacement cookie carries a freshly-minted token, not the old
        // expiry.
        let renewed = pass.renewed.expect("expected a replacement access cookie");
        let claims = state
            .issuer
            .codec()
            .verify(&token_from_cookie(&renewed))
            .unwrap();
        let fresh_now = utils::get_timestamp();
        assert!(claims.exp >= now + 300 && claims.exp <= fresh_now + 300);
    }

    #[tokio::test]
    async fn refresh_alone_is_enough_when_no_access_cookie_is_present() {
        let state = test_state().await;
        seed_user(&state, "alice", "user").await;

        let now = utils::get_timestamp();
        let refresh = state.issuer.mint_refresh("alice", "user", now).unwrap();
        let headers = cookie_headers(&[("refresh", &refresh.token)]);

        let pass = authenticate(&headers, &state).await.unwrap();
        assert_eq!(pass.identity.role, "user");
        assert!(pass.renewed.is_some());
    }

    #[tokio::test]
    async fn expired_refresh_is_a_terminal_denial() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        let stale_access = expired_token(&state, "alice", "admin");
        let stale_refresh = expired_token(&state, "alice", "admin");
        let headers =
            cookie_headers(&[("access", &stale_access), ("refresh", &stale_refresh)]);

        assert!(authenticate(&headers, &state).await.is_err());
    }

    #[tokio::test]
    async fn refresh_for_a_vanished_user_is_denied() {
        let state = test_state().await;
        // "ghost" was never inserted; the token itself verifies fine.
        let now = utils::get_timestamp();
        let refresh = state.issuer.mint_refresh("ghost", "admin", now).unwrap();
        let headers = cookie_headers(&[("refresh", &refresh.token)]);

        assert!(authenticate(&headers, &state).await.is_err());
    }

    #[tokio::test]
    async fn renewal_reloads_the_role_from_the_database() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        // Refresh token still says "admin"; the database has since demoted
        // her.
        let now = utils::get_timestamp();
        let refresh = state.issuer.mint_refresh("alice", "admin", now).unwrap();
        users::set_role(&state.db, "alice", "user").await.unwrap();

        let headers = cookie_headers(&[("refresh", &refresh.token)]);
        let pass = authenticate(&headers, &state).await.unwrap();
        assert_eq!(pass.identity.role, "user");

        let renewed = pass.renewed.unwrap();
        let claims = state
            .issuer
            .codec()
            .verify(&token_from_cookie(&renewed))
            .unwrap();
        assert_eq!(claims.role, "user");
    }

    #[tokio::test]
    async fn token_signed_with_a_foreign_secret_is_denied() {
        let state = test_state().await;
        seed_user(&state, "alice", "admin").await;

        let foreign = SessionIssuer::new(
            TokenCodec::new("not-the-server-secret-not-the-00"),
            &test_config().auth,
        );
        let now = utils::get_timestamp();
        let refresh = foreign.mint_refresh("alice", "admin", now).unwrap();
        let headers = cookie_headers(&[("refresh", &refresh.token)]);

        assert!(authenticate(&headers, &state).await.is_err());
    }
}
