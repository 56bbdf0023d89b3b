use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::database::users::{self, UserRecord};
use crate::database::utils::timestamp_to_rfc3339;
use crate::handlers::utils::responses::{deliver_resource, not_found};
use shared::types::Resource;

/// Public user representation — the password hash never leaves the database
/// layer's struct.
pub fn user_resource(self_href: &str, user: &UserRecord) -> Resource {
    let mut resource = Resource::new(self_href);
    resource.insert("username", json!(user.username));
    resource.insert("real_name", json!(user.real_name));
    resource.insert("email", json!(user.email));
    resource.insert("role", json!(user.role));
    resource.insert("created", json!(timestamp_to_rfc3339(user.created_at)));
    resource
}

/// GET /users — usernames as embedded resources.
pub async fn handle_users_list(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let mut root = Resource::new(&path);

    for username in users::list_usernames(&state.db).await? {
        let mut embedded = Resource::new(&format!("/users/{}", username));
        embedded.insert("username", json!(username));
        root.add_embed("users", embedded);
    }

    deliver_resource(&root, StatusCode::OK)
}

/// GET /users/:username — one user.
pub async fn handle_user(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let username = match path.trim_end_matches('/').split('/').next_back() {
        Some(username) if !username.is_empty() => username.to_string(),
        _ => return not_found(&path),
    };

    let Some(user) = users::get_user(&state.db, &username).await? else {
        info!("User not found: {}", username);
        return not_found(&path);
    };

    deliver_resource(&user_resource(&path, &user), StatusCode::OK)
}
