use std::convert::Infallible;

use anyhow::{Context, Result, anyhow};
use http::Error as HttpError;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde_json::json;
use tracing::{debug, error};

use shared::types::Resource;

/// Wrap raw bytes in the boxed body type every handler returns.
pub fn full(data: Bytes) -> BoxBody<Bytes, Infallible> {
    Full::new(data).boxed()
}

/// Serialize a HAL resource and deliver it as the response body.
/// This is the one helper all handlers go through — every body this server
/// sends is a resource envelope.
pub fn deliver_resource(
    resource: &Resource,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let json = serde_json::to_string(resource).context("Failed to serialize resource")?;

    debug!("Delivering resource, size: {} bytes", json.len());

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/hal+json")
        .body(full(Bytes::from(json)))
        .map_err(|e: HttpError| anyhow!("Failed to build resource response: {}", e))?;

    Ok(response)
}

/// The single denial every guard failure collapses into.
pub fn access_denied(path: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut resource = Resource::new(path);
    resource.insert("error", json!("Access denied"));
    deliver_resource(&resource, StatusCode::FORBIDDEN)
}

/// 404 body for unknown routes and missing resources.
pub fn not_found(path: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut resource = Resource::new(path);
    resource.insert("message", json!("Resource not found"));
    deliver_resource(&resource, StatusCode::NOT_FOUND)
}

/// Fallback 500 used by the connection glue when a handler errors out.
/// Infallible by construction — this is the response of last resort, so it
/// cannot itself fail to build.
pub fn internal_error() -> Response<BoxBody<Bytes, Infallible>> {
    error!("Delivering internal error response");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/hal+json")
        .body(full(Bytes::from(r#"{"error":"Internal server error"}"#)))
        .expect("static response must build")
}
