use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};

use crate::AppState;
use crate::handlers::utils::responses::deliver_resource;
use shared::types::{Link, Resource};

/// GET / — the link index for the admin API.
pub async fn handle_root(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut root = Resource::new("/");
    root.add_link("Auth", Link::new("/auth"));
    root.add_link("Refresh token", Link::new("/refresh"));
    root.add_link("Users", Link::new("/users"));
    root.add_link("User", Link::templated("/users/{username}"));
    root.add_link("Article", Link::templated("/articles/{slug}"));
    root.add_link("Articles", Link::new("/articles"));
    root.add_link("Articles by Category", Link::templated("/categories/{category}"));
    root.add_link("Categories", Link::new("/categories"));

    deliver_resource(&root, StatusCode::OK)
}
