//! REST API module using Axum
//!
//! Serves the furnace dashboard's JSON API under `/api/v1` plus a root-level
//! `/health`. Every response uses the `{data, meta}` / `{error, meta}` envelope.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::DashboardState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::{CORS_ORIGINS_ENV_VAR, MAX_REQUEST_BODY_BYTES};

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `MELTWATCH_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for development (e.g., `http://localhost:5173` for the Vite dev server).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .fallback(|| async { envelope::ApiErrorResponse::not_found("no such endpoint") })
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
