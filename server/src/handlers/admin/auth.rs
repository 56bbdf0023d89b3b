use std::collections::HashMap;
use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode, header};
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::issuer::{ACCESS_COOKIE, REFRESH_COOKIE, session_cookie};
use crate::auth::Identity;
use crate::database::{users, utils};
use crate::handlers::utils::forms::{form_field, parse_form_body};
use crate::handlers::utils::responses::{deliver_resource, full};
use shared::types::Resource;

/// Ways a login attempt fails.
///
/// `BadCredentials` deliberately covers both "no such user" and "wrong
/// password" — the response must not reveal whether a username exists.
/// `StoreUnavailable` answers identically but is logged as an error rather
/// than a warning.
#[derive(Debug)]
enum AuthFailure {
    NotPost,
    MissingFields,
    BadCredentials,
    StoreUnavailable,
}

impl AuthFailure {
    fn respond(&self, path: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let mut resource = Resource::new(path);

        let status = match self {
            Self::NotPost => {
                resource.insert("error", json!("Please POST credentials"));
                resource.insert("required_fields", json!(["username", "password"]));
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::MissingFields => {
                resource.insert("required_fields", json!(["username", "password"]));
                StatusCode::BAD_REQUEST
            }
            Self::BadCredentials | Self::StoreUnavailable => {
                resource.insert(
                    "error",
                    json!("Unable to authenticate. Check that credentials are correct"),
                );
                StatusCode::FORBIDDEN
            }
        };

        deliver_resource(&resource, status)
    }
}

/// Pull the credential pair out of a parsed form.
///
/// The username is trimmed; the password is taken verbatim (leading or
/// trailing whitespace may be part of it). An empty value counts as missing.
fn credentials(params: &HashMap<String, String>) -> std::result::Result<(&str, &str), AuthFailure> {
    let username = form_field(params, "username").ok_or(AuthFailure::MissingFields)?;
    let password = params
        .get("password")
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .ok_or(AuthFailure::MissingFields)?;

    Ok((username, password))
}

/// POST /auth — verify a credential pair and open a session.
///
/// On success the response carries the whole session: an `access` cookie
/// (short-lived) and a `refresh` cookie (long-lived), both signed, plus the
/// two expiry timestamps in the body. Nothing is recorded server-side.
pub async fn handle_auth(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();

    if req.method() != Method::POST {
        return AuthFailure::NotPost.respond(&path);
    }

    let params = parse_form_body(req).await?;
    let (username, password) = match credentials(&params) {
        Ok(pair) => pair,
        Err(failure) => {
            warn!("Login rejected: missing credential fields");
            return failure.respond(&path);
        }
    };

    info!("Processing login for {}", username);

    let user = match users::get_user(&state.db, username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Login failed for {}: unknown user", username);
            return AuthFailure::BadCredentials.respond(&path);
        }
        Err(e) => {
            error!("Credential store lookup failed for {}: {}", username, e);
            return AuthFailure::StoreUnavailable.respond(&path);
        }
    };

    let password_valid = match utils::verify_password(&user.password_hash, password) {
        Ok(valid) => valid,
        Err(e) => {
            error!("Password verification error for {}: {}", username, e);
            return AuthFailure::StoreUnavailable.respond(&path);
        }
    };

    if !password_valid {
        warn!("Login failed for {}: wrong password", username);
        return AuthFailure::BadCredentials.respond(&path);
    }

    let now = utils::get_timestamp();
    let access = state.issuer.mint_access(&user.username, &user.role, now)?;
    let refresh = state.issuer.mint_refresh(&user.username, &user.role, now)?;

    let access_cookie = session_cookie(ACCESS_COOKIE, &access.token, access.expires)
        .context("Failed to build access cookie")?;
    let refresh_cookie = session_cookie(REFRESH_COOKIE, &refresh.token, refresh.expires)
        .context("Failed to build refresh cookie")?;

    let mut resource = Resource::new(&path);
    resource.insert("result", json!(true));
    resource.insert("access_expires", json!(access.expires));
    resource.insert("refresh_expires", json!(refresh.expires));

    let body = serde_json::to_string(&resource).context("Failed to serialize auth response")?;

    info!("Session opened for {} ({})", user.username, user.role);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/hal+json")
        .header(header::SET_COOKIE, access_cookie)
        .header(header::SET_COOKIE, refresh_cookie)
        .body(full(Bytes::from(body)))
        .context("Failed to build auth response")?;

    Ok(response)
}

/// GET /refresh — guarded probe. Reaching the handler at all means the
/// session is valid (or was just silently renewed), so the body is a bare
/// confirmation.
pub async fn handle_refresh(
    req: Request<hyper::body::Incoming>,
    _state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Session probe for {}", identity.username);

    let mut resource = Resource::new(req.uri().path());
    resource.insert("result", json!(true));

    deliver_resource(&resource, StatusCode::OK)
}

/// GET /authtest — guarded diagnostic endpoint.
pub async fn handle_authtest(
    req: Request<hyper::body::Incoming>,
    _state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Auth test passed for {}", identity.username);

    let mut resource = Resource::new(req.uri().path());
    resource.insert(
        "message",
        json!("You should only see this after authenticating"),
    );

    deliver_resource(&resource, StatusCode::OK)
}
