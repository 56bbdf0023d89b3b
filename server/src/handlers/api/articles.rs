use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::database::articles::{self, ArticleRecord};
use crate::database::categories;
use crate::database::utils::{timestamp_to_rfc3339, truncate_string};
use crate::handlers::utils::responses::{deliver_resource, not_found};
use shared::types::Resource;

/// Embedded summary for article list views: everything but the full body,
/// plus a 100-character description cut from it.
fn summary_resource(article: &ArticleRecord) -> Resource {
    let mut embedded = Resource::new(&format!("/articles/{}", article.slug));
    embedded.insert("title", json!(article.title));
    embedded.insert("author", json!(article.author));
    embedded.insert("date", json!(timestamp_to_rfc3339(article.date)));
    embedded.insert("category", json!(article.category));
    embedded.insert("slug", json!(article.slug));
    embedded.insert("description", json!(truncate_string(&article.body, 100)));
    embedded
}

/// Full article representation for single-article views and admin write
/// responses.
pub fn article_resource(self_href: &str, article: &ArticleRecord) -> Resource {
    let mut resource = Resource::new(self_href);
    resource.insert("id", json!(article.id));
    resource.insert("title", json!(article.title));
    resource.insert("author", json!(article.author));
    resource.insert("body", json!(article.body));
    resource.insert("date", json!(timestamp_to_rfc3339(article.date)));
    resource.insert("slug", json!(article.slug));
    resource.insert("category", json!(article.category));
    resource
}

/// GET /articles — every article as an embedded summary.
pub async fn handle_article_list(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let mut root = Resource::new(&path);

    for article in articles::list_articles(&state.db).await? {
        root.add_embed("articles", summary_resource(&article));
    }

    deliver_resource(&root, StatusCode::OK)
}

/// GET /articles/:category — the category's id plus its articles.
pub async fn handle_articles_by_category(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let name = match path.trim_end_matches('/').split('/').next_back() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return not_found(&path),
    };

    let Some(category) = categories::get_category(&state.db, &name).await? else {
        info!("Category not found: {}", name);
        return not_found(&path);
    };

    let mut root = Resource::new(&path);
    root.insert("id", json!(category.id));

    for article in articles::list_by_category(&state.db, category.id).await? {
        root.add_embed("articles", summary_resource(&article));
    }

    deliver_resource(&root, StatusCode::OK)
}

/// GET /articles/:category/:slug — one full article. The slug alone
/// identifies the article; the category segment is part of the canonical URL
/// but not of the lookup.
pub async fn handle_article(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let path = req.uri().path().to_string();
    let slug = match path.trim_end_matches('/').split('/').next_back() {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => return not_found(&path),
    };

    let Some(article) = articles::get_article(&state.db, &slug).await? else {
        info!("Article not found: {}", slug);
        return not_found(&path);
    };

    deliver_resource(&article_resource(&path, &article), StatusCode::OK)
}
