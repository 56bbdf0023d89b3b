use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::Identity;
use crate::database::articles::{self, NewArticle};
use crate::database::{categories, users, utils};
use crate::handlers::api::articles::article_resource;
use crate::handlers::utils::forms::{form_field, parse_form_body};
use crate::handlers::utils::responses::{deliver_resource, not_found};
use shared::types::Resource;

fn validation_error(path: &str, message: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let mut resource = Resource::new(path);
    resource.insert("error", json!(message));
    deliver_resource(&resource, StatusCode::BAD_REQUEST)
}

fn slug_from_path(path: &str) -> Option<&str> {
    // "/articles/:slug"
    path.trim_end_matches('/')
        .split('/')
        .nth(2)
        .filter(|slug| !slug.is_empty())
}

/// POST /articles — create an article, or overwrite the one already at the
/// slug. The category is created on the fly when it doesn't exist yet; the
/// author is whoever the session guard let through.
pub async fn handle_create_article(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let params = parse_form_body(req).await?;

    let (Some(slug), Some(title), Some(body), Some(category_name)) = (
        form_field(&params, "slug"),
        form_field(&params, "title"),
        form_field(&params, "body"),
        form_field(&params, "category"),
    ) else {
        warn!("Article create rejected: missing fields");
        return validation_error(&path, "Error validating, all fields required");
    };

    if !utils::is_valid_slug(slug) {
        warn!("Article create rejected: bad slug {:?}", slug);
        return validation_error(&path, "Slug may only contain letters, numbers, - and _");
    }

    let Some(author) = users::get_user(&state.db, &identity.username).await? else {
        // The guard admitted a token whose subject has since vanished.
        error!(
            "Authenticated user {} has no user row; refusing article create",
            identity.username
        );
        return validation_error(&path, "Unknown author");
    };

    let category = categories::ensure_category(&state.db, category_name).await?;

    if articles::article_exists(&state.db, slug).await? {
        info!("Overwriting existing article {}", slug);
        articles::update_article(&state.db, slug, title, body, category.id).await?;
    } else {
        articles::insert_article(
            &state.db,
            &NewArticle {
                title: title.to_string(),
                author_id: author.id,
                body: body.to_string(),
                slug: slug.to_string(),
                category_id: category.id,
            },
        )
        .await?;
    }

    let Some(article) = articles::get_article(&state.db, slug).await? else {
        anyhow::bail!("Article {} missing immediately after save", slug);
    };

    deliver_resource(
        &article_resource(&format!("/articles/{}", slug), &article),
        StatusCode::OK,
    )
}

/// Fields accepted by PUT /articles/:slug. Absent fields keep their stored
/// values.
#[derive(Debug, Deserialize)]
struct ArticleUpdate {
    title: Option<String>,
    body: Option<String>,
    category: Option<String>,
}

/// PUT /articles/:slug — replace the stored content of an existing article
/// from a JSON body. Slug, author, and the original date are immutable.
pub async fn handle_replace_article(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    _identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let Some(slug) = slug_from_path(&path).map(str::to_string) else {
        return not_found(&path);
    };

    let Some(existing) = articles::get_article(&state.db, &slug).await? else {
        info!("Replace rejected: no article at {}", slug);
        return not_found(&path);
    };

    let bytes = req.collect().await?.to_bytes();
    let update: ArticleUpdate = match serde_json::from_slice(&bytes) {
        Ok(update) => update,
        Err(e) => {
            warn!("Article replace rejected: unparseable body ({})", e);
            return validation_error(&path, "Could not parse request body");
        }
    };

    let title = update.title.unwrap_or(existing.title);
    let body = update.body.unwrap_or(existing.body);
    let category_name = update.category.unwrap_or(existing.category);
    let category = categories::ensure_category(&state.db, &category_name).await?;

    articles::update_article(&state.db, &slug, &title, &body, category.id).await?;

    let Some(article) = articles::get_article(&state.db, &slug).await? else {
        anyhow::bail!("Article {} missing immediately after update", slug);
    };

    deliver_resource(&article_resource(&path, &article), StatusCode::OK)
}

/// DELETE /articles/:slug — remove an article; the response echoes what was
/// deleted.
pub async fn handle_delete_article(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    identity: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let Some(slug) = slug_from_path(&path).map(str::to_string) else {
        return not_found(&path);
    };

    let Some(article) = articles::get_article(&state.db, &slug).await? else {
        info!("Delete rejected: no article at {}", slug);
        return not_found(&path);
    };

    articles::delete_article(&state.db, &slug).await?;
    info!("Article {} deleted by {}", slug, identity.username);

    deliver_resource(&article_resource(&path, &article), StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_extraction_handles_trailing_slashes() {
        assert_eq!(slug_from_path("/articles/my-post"), Some("my-post"));
        assert_eq!(slug_from_path("/articles/my-post/"), Some("my-post"));
        assert_eq!(slug_from_path("/articles/"), None);
        assert_eq!(slug_from_path("/articles"), None);
    }
}
