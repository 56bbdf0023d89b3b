use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use crate::AppState;
use crate::database::categories;
use crate::handlers::utils::responses::deliver_resource;
use shared::types::Resource;

/// GET /categories — every category, both embedded and as a flat name list.
pub async fn handle_category_list(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let mut root = Resource::new(&path);

    let mut names = Vec::new();
    for category in categories::list_categories(&state.db).await? {
        let mut embedded = Resource::new(&format!("/categories/{}", category.name));
        embedded.insert("name", json!(category.name));
        root.add_embed("categories", embedded);
        names.push(category.name);
    }
    root.insert("categories", json!(names));

    deliver_resource(&root, StatusCode::OK)
}
