use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};

use crate::AppState;
use crate::handlers::utils::responses::deliver_resource;
use shared::types::{Link, Resource};

/// GET / — the link index for the public read API.
pub async fn handle_root(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut root = Resource::new("/");
    root.add_link("Users", Link::new("/users"));
    root.add_link("Article", Link::templated("/articles/{category}/{slug}"));
    root.add_link("Articles", Link::new("/articles"));
    root.add_link("Article Category", Link::templated("/articles/{category}"));

    deliver_resource(&root, StatusCode::OK)
}
