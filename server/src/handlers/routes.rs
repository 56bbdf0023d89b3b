use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, header};
use tracing::warn;

use crate::AppState;
use crate::auth::{self, Identity};
use crate::handlers::utils::responses::{access_denied, not_found};
use crate::handlers::{admin, api};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two security tiers:
//
//   RouteHandler   — no auth.  Receives (req, state).
//                    Use for: the public read API, the link indexes, /auth.
//
//   GuardedHandler — session guard: access-cookie verification with silent
//                    renewal from the refresh cookie.  Receives
//                    (req, state, identity).
//                    Use for: everything that writes, plus /refresh.

type RouteHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type GuardedHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
            Identity, // verified by the router — handlers never re-check
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No authentication check.
    Open(RouteHandler),

    /// Session guard runs before the handler; on a refresh-path admission
    /// the replacement access cookie is attached to the handler's response.
    Guarded(GuardedHandler),
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

struct Route {
    /// `None` matches every method — for handlers that answer 405 themselves.
    method: Option<Method>,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    fn push_open<F, Fut>(mut self, method: Option<Method>, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn push_guarded<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Some(method),
            path: path.to_string(),
            kind: RouteKind::Guarded(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    /// GET with no authentication — the public read API.
    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_open(Some(Method::GET), path, handler)
    }

    /// Any method, no authentication — for handlers that must reject
    /// non-POST with 405 themselves (the login endpoint).
    pub fn any<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_open(None, path, handler)
    }

    // ── Guarded (session guard, silent renewal) ───────────────────────────────
    //
    // The guard runs before the handler is called.  Handlers receive the
    // verified `Identity` and must NOT repeat any auth work — the renewal
    // cookie, when one was minted, is attached by the router on the way out.

    /// GET behind the session guard.
    pub fn get_guarded<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_guarded(Method::GET, path, handler)
    }

    /// POST behind the session guard.
    pub fn post_guarded<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_guarded(Method::POST, path, handler)
    }

    /// PUT behind the session guard.
    pub fn put_guarded<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_guarded(Method::PUT, path, handler)
    }

    /// DELETE behind the session guard.
    pub fn delete_guarded<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.push_guarded(Method::DELETE, path, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            let method_matches = match &route.method {
                Some(m) => *m == method,
                None => true,
            };
            if !method_matches || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Guarded(h) => {
                    let verdict = auth::authenticate(req.headers(), &state).await;
                    match verdict {
                        Ok(pass) => {
                            let mut response = h(req, state, pass.identity).await?;
                            // The renewed access cookie rides along on
                            // whatever the handler answered.
                            if let Some(cookie) = pass.renewed {
                                response.headers_mut().append(header::SET_COOKIE, cookie);
                            }
                            Ok(response)
                        }
                        Err(reason) => {
                            warn!("Guard rejected {} {}: {}", method, path, reason);
                            access_denied(&path)
                        }
                    }
                }
            };
        }

        not_found(&path).context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        // Exact match.
        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/articles/:category/:slug"  matches  "/articles/rust/intro"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| r.starts_with(':') || r == p)
    }
}

// ---------------------------------------------------------------------------
// Public read API (the user-facing listener)
//
// Every route is Open — this side of the system never mutates anything.
// ---------------------------------------------------------------------------

pub fn build_api_router() -> Router {
    Router::new()
        .get("/", |req, state| async move {
            api::root::handle_root(req, state)
                .await
                .context("Root index failed")
        })
        .get("/articles", |req, state| async move {
            api::articles::handle_article_list(req, state)
                .await
                .context("Article list failed")
        })
        .get("/articles/:category", |req, state| async move {
            api::articles::handle_articles_by_category(req, state)
                .await
                .context("Category article list failed")
        })
        .get("/articles/:category/:slug", |req, state| async move {
            api::articles::handle_article(req, state)
                .await
                .context("Article fetch failed")
        })
        .get("/categories", |req, state| async move {
            api::categories::handle_category_list(req, state)
                .await
                .context("Category list failed")
        })
        .get("/users", |req, state| async move {
            api::users::handle_users_list(req, state)
                .await
                .context("User list failed")
        })
        .get("/users/:username", |req, state| async move {
            api::users::handle_user(req, state)
                .await
                .context("User fetch failed")
        })
}

// ---------------------------------------------------------------------------
// Admin API (the second listener)
//
// Reads stay Open, exactly as on the public port.  Everything that writes —
// and the /refresh probe — sits behind the session guard.  /auth registers
// for every method because it owes non-POST callers a 405 body naming the
// required fields.
// ---------------------------------------------------------------------------

pub fn build_admin_router() -> Router {
    Router::new()
        .get("/", |req, state| async move {
            admin::root::handle_root(req, state)
                .await
                .context("Admin root index failed")
        })
        // ── Sessions ─────────────────────────────────────────────────────────
        .any("/auth", |req, state| async move {
            admin::auth::handle_auth(req, state)
                .await
                .context("Auth failed")
        })
        .get_guarded("/refresh", |req, state, identity| async move {
            admin::auth::handle_refresh(req, state, identity)
                .await
                .context("Refresh probe failed")
        })
        .get_guarded("/authtest", |req, state, identity| async move {
            admin::auth::handle_authtest(req, state, identity)
                .await
                .context("Authtest failed")
        })
        // ── Articles ─────────────────────────────────────────────────────────
        .get("/articles", |req, state| async move {
            api::articles::handle_article_list(req, state)
                .await
                .context("Article list failed")
        })
        .get("/articles/:slug", |req, state| async move {
            api::articles::handle_article(req, state)
                .await
                .context("Article fetch failed")
        })
        .post_guarded("/articles", |req, state, identity| async move {
            admin::articles::handle_create_article(req, state, identity)
                .await
                .context("Article create failed")
        })
        .put_guarded("/articles/:slug", |req, state, identity| async move {
            admin::articles::handle_replace_article(req, state, identity)
                .await
                .context("Article replace failed")
        })
        .delete_guarded("/articles/:slug", |req, state, identity| async move {
            admin::articles::handle_delete_article(req, state, identity)
                .await
                .context("Article delete failed")
        })
        // ── Categories ───────────────────────────────────────────────────────
        .get("/categories", |req, state| async move {
            api::categories::handle_category_list(req, state)
                .await
                .context("Category list failed")
        })
        .get("/categories/:category", |req, state| async move {
            api::articles::handle_articles_by_category(req, state)
                .await
                .context("Category article list failed")
        })
        .post_guarded("/categories", |req, state, identity| async move {
            admin::categories::handle_create_category(req, state, identity)
                .await
                .context("Category create failed")
        })
        .put_guarded("/categories/:category", |req, state, identity| async move {
            admin::categories::handle_rename_category(req, state, identity)
                .await
                .context("Category rename failed")
        })
        // ── Users ────────────────────────────────────────────────────────────
        .get("/users", |req, state| async move {
            api::users::handle_users_list(req, state)
                .await
                .context("User list failed")
        })
        .get("/users/:username", |req, state| async move {
            api::users::handle_user(req, state)
                .await
                .context("User fetch failed")
        })
        .post_guarded("/users", |req, state, identity| async move {
            admin::users::handle_create_user(req, state, identity)
                .await
                .context("User create failed")
        })
        .put_guarded("/users/:username", |req, state, identity| async move {
            admin::users::handle_update_user(req, state, identity)
                .await
                .context("User update failed")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_path_matches() {
        assert!(Router::path_matches("/articles", "/articles"));
    }

    #[test]
    fn different_paths_do_not_match() {
        assert!(!Router::path_matches("/articles", "/categories"));
    }

    #[test]
    fn trailing_slash_does_not_match_without_slash() {
        assert!(!Router::path_matches("/articles", "/articles/"));
    }

    #[test]
    fn root_path_matches_self() {
        assert!(Router::path_matches("/", "/"));
    }

    #[test]
    fn wildcard_segment_matches_slug() {
        assert!(Router::path_matches(
            "/articles/:category/:slug",
            "/articles/rust/intro-to-ownership"
        ));
    }

    #[test]
    fn wildcard_does_not_match_extra_segments() {
        assert!(!Router::path_matches(
            "/articles/:slug",
            "/articles/rust/intro"
        ));
    }

    #[test]
    fn query_string_stripped_before_match() {
        assert!(Router::path_matches("/articles", "/articles?page=2"));
    }

    #[test]
    fn router_new_has_no_routes() {
        let r = Router::new();
        assert!(r.routes.is_empty());
    }

    #[test]
    fn api_router_registers_only_open_routes() {
        let r = build_api_router();
        assert!(!r.routes.is_empty());
        assert!(
            r.routes
                .iter()
                .all(|route| matches!(route.kind, RouteKind::Open(_)))
        );
    }

    #[test]
    fn admin_router_guards_every_write() {
        let r = build_admin_router();
        for route in &r.routes {
            let mutating = matches!(
                &route.method,
                Some(m) if *m == Method::POST || *m == Method::PUT || *m == Method::DELETE
            );
            if mutating {
                assert!(
                    matches!(route.kind, RouteKind::Guarded(_)),
                    "unguarded mutating route: {:?} {}",
                    route.method,
                    route.path
                );
            }
        }
    }

    #[test]
    fn admin_router_guards_the_refresh_probe() {
        let r = build_admin_router();
        let refresh = r
            .routes
            .iter()
            .find(|route| route.path == "/refresh")
            .unwrap();
        assert!(matches!(refresh.kind, RouteKind::Guarded(_)));
    }

    #[test]
    fn auth_route_matches_any_method() {
        let r = build_admin_router();
        let auth = r.routes.iter().find(|route| route.path == "/auth").unwrap();
        assert!(auth.method.is_none());
    }

    proptest! {
        #[test]
        fn any_single_segment_matches_the_wildcard(seg in "[a-zA-Z0-9_-]{1,20}") {
            let candidate = format!("/articles/{}", seg);
            prop_assert!(Router::path_matches("/articles/:slug", &candidate));
        }

        #[test]
        fn a_path_always_matches_itself(path in "(/[a-z0-9_-]{1,10}){1,4}") {
            prop_assert!(Router::path_matches(&path, &path));
        }

        #[test]
        fn query_strings_never_affect_matching(
            path in "(/[a-z0-9_-]{1,10}){1,4}",
            query in "[a-z0-9=&]{0,20}",
        ) {
            let candidate = format!("{}?{}", path, query);
            prop_assert!(Router::path_matches(&path, &candidate));
        }
    }
}
