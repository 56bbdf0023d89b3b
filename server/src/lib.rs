use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::SessionIssuer;
use shared::types::AppConfig;

pub mod auth;
pub mod database;
pub mod handlers;
pub mod setup;

/// Shared per-request state. Cloned into every connection task; everything
/// inside is either a pool handle or read-only.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub issuer: SessionIssuer,
}
