pub mod admins;
pub mod auth;
pub mod chat;
pub mod error;
pub mod listings;
pub mod master_data;
pub mod middleware;
pub mod rfqs;
pub mod sellers;

use std::sync::Arc;

use anyhow::anyhow;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use tradehub_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::Internal)
}

/// Row ids are written as UUIDs by this service; anything else is data
/// corruption, logged and rendered as the nil UUID rather than a 500.
pub(crate) fn parse_uuid(s: &str, context: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", context, s, e);
        Uuid::default()
    })
}
