use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{info, warn};

use crate::AppState;
use crate::auth::Identity;
use crate::database::{categories, utils};
use crate::handlers::utils::forms::{form_field, parse_form_body};
use crate::handlers::utils::responses::{deliver_resource, not_found};
use shared::types::Resource;

fn validation_error(path: &str, message: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut resource = Resource::new(path);
    resource.insert("error", json!(message));
    deliver_resource(&resource, StatusCode::BAD_REQUEST)
}

fn category_resource(self_href: &str, id: i64, name: &str) -> Resource {
    let mut resource = Resource::new(self_href);
    resource.insert("id", json!(id));
    resource.insert("name", json!(name));
    resource
}

/// POST /categories — create a category.
pub async fn handle_create_category(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let params = parse_form_body(req).await?;

    let Some(name) = form_field(&params, "name") else {
        warn!("Category create rejected: missing name");
        return validation_error(&path, "Error validating, name required");
    };

    if !utils::is_valid_slug(name) {
        warn!("Category create rejected: bad name {:?}", name);
        return validation_error(&path, "Name may only contain letters, numbers, - and _");
    }

    if categories::category_exists(&state.db, name).await? {
        return validation_error(&path, "Category already exists");
    }

    let id = categories::insert_category(&state.db, name).await?;
    info!("Category {} created by {}", name, identity.username);

    deliver_resource(
        &category_resource(&format!("/categories/{}", name), id, name),
        StatusCode::OK,
    )
}

/// PUT /categories/:category — rename a category; articles filed under it
/// follow along since they reference the id.
pub async fn handle_rename_category(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let Some(name) = path
        .trim_end_matches('/')
        .split('/')
        .nth(2)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
    else {
        return not_found(&path);
    };

    let params = parse_form_body(req).await?;
    let Some(new_name) = form_field(&params, "name") else {
        warn!("Category rename rejected: missing name");
        return validation_error(&path, "Error validating, name required");
    };

    if !utils::is_valid_slug(new_name) {
        warn!("Category rename rejected: bad name {:?}", new_name);
        return validation_error(&path, "Name may only contain letters, numbers, - and _");
    }

    let Some(category) = categories::get_category(&state.db, &name).await? else {
        info!("Rename rejected: no category named {}", name);
        return not_found(&path);
    };

    if categories::category_exists(&state.db, new_name).await? {
        return validation_error(&path, "Category already exists");
    }

    categories::rename_category(&state.db, &name, new_name).await?;
    info!(
        "Category {} renamed to {} by {}",
        name, new_name, identity.username
    );

    deliver_resource(
        &category_resource(&format!("/categories/{}", new_name), category.id, new_name),
        StatusCode::OK,
    )
}
