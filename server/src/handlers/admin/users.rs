use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{info, warn};

use crate::AppState;
use crate::auth::Identity;
use crate::database::users::{self, NewUser};
use crate::database::utils;
use crate::handlers::api::users::user_resource;
use crate::handlers::utils::forms::{form_field, parse_form_body};
use crate::handlers::utils::responses::{deliver_resource, not_found};
use shared::types::Resource;

fn validation_error(path: &str, message: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut resource = Resource::new(path);
    resource.insert("error", json!(message));
    deliver_resource(&resource, StatusCode::BAD_REQUEST)
}

fn valid_role(role: &str) -> bool {
    matches!(role, "admin" | "user")
}

/// POST /users — create a user account.
pub async fn handle_create_user(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let params = parse_form_body(req).await?;

    let (Some(username), Some(password)) = (
        form_field(&params, "username"),
        params
            .get("password")
            .map(String::as_str)
            .filter(|p| !p.is_empty()),
    ) else {
        warn!("User create rejected: missing fields");
        return validation_error(&path, "Error validating, username and password required");
    };

    if !utils::is_valid_username(username) {
        warn!("User create rejected: bad username {:?}", username);
        return validation_error(&path, "Username must be 3-20 alphanumeric characters");
    }

    let email = form_field(&params, "email").map(str::to_string);
    if let Some(ref email) = email {
        if !utils::is_valid_email(email) {
            warn!("User create rejected: bad email");
            return validation_error(&path, "Invalid email address");
        }
    }

    let role = form_field(&params, "role").unwrap_or("user");
    if !valid_role(role) {
        warn!("User create rejected: unknown role {:?}", role);
        return validation_error(&path, "Role must be admin or user");
    }

    if users::user_exists(&state.db, username).await? {
        return validation_error(&path, "User already exists");
    }

    let new_user = NewUser {
        username: username.to_string(),
        password_hash: utils::hash_password(password)?,
        real_name: form_field(&params, "real_name").map(str::to_string),
        email,
        role: role.to_string(),
    };
    users::insert_user(&state.db, &new_user).await?;
    info!("User {} created by {}", username, identity.username);

    let Some(user) = users::get_user(&state.db, username).await? else {
        anyhow::bail!("User {} missing immediately after insert", username);
    };

    deliver_resource(
        &user_resource(&format!("/users/{}", username), &user),
        StatusCode::OK,
    )
}

/// PUT /users/:username — update a user. Absent fields keep their stored
/// values; the password is re-hashed only when a new one is supplied.
pub async fn handle_update_user(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let Some(username) = path
        .trim_end_matches('/')
        .split('/')
        .nth(2)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
    else {
        return not_found(&path);
    };

    let Some(existing) = users::get_user(&state.db, &username).await? else {
        info!("Update rejected: no user named {}", username);
        return not_found(&path);
    };

    let params = parse_form_body(req).await?;

    let password_hash = match params
        .get("password")
        .map(String::as_str)
        .filter(|p| !p.is_empty())
    {
        Some(password) => utils::hash_password(password)?,
        None => existing.password_hash.clone(),
    };

    let role = form_field(&params, "role").unwrap_or(&existing.role);
    if !valid_role(role) {
        warn!("User update rejected: unknown role {:?}", role);
        return validation_error(&path, "Role must be admin or user");
    }

    let real_name = form_field(&params, "real_name")
        .map(str::to_string)
        .or_else(|| existing.real_name.clone());
    let email = form_field(&params, "email")
        .map(str::to_string)
        .or_else(|| existing.email.clone());
    if let Some(ref email) = email {
        if !utils::is_valid_email(email) {
            warn!("User update rejected: bad email");
            return validation_error(&path, "Invalid email address");
        }
    }

    users::update_user(
        &state.db,
        &username,
        &password_hash,
        &real_name,
        &email,
        role,
    )
    .await?;
    info!("User {} updated by {}", username, identity.username);

    let Some(user) = users::get_user(&state.db, &username).await? else {
        anyhow::bail!("User {} missing immediately after update", username);
    };

    deliver_resource(&user_resource(&path, &user), StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_two_known_roles_are_accepted() {
        assert!(valid_role("admin"));
        assert!(valid_role("user"));
        assert!(!valid_role("root"));
        assert!(!valid_role(""));
    }
}
