use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;

use crate::analytics::GeoResolver;
use crate::storage::Storage;

use super::handlers::{health_check, landing, redirect_url, RedirectState};

pub fn create_redirect_router(
    storage: Arc<dyn Storage>,
    geo: Arc<GeoResolver>,
    dev_geo_fallback: bool,
    redirect_status: StatusCode,
) -> Router {
    let state = Arc::new(RedirectState {
        storage,
        geo,
        dev_geo_fallback,
        redirect_status,
    });

    Router::new()
        .route("/", get(landing))
        .route("/health", get(health_check))
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
