use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::make_span_with_user, services::RecommendationEngine};

pub mod recommendations;

/// Shared application state
pub struct AppState {
    pub engine: RecommendationEngine,
}

impl AppState {
    pub fn new(engine: RecommendationEngine) -> Self {
        Self { engine }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_user))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recommendations/content-based",
            get(recommendations::content_based),
        )
        .route(
            "/recommendations/popularity-based",
            get(recommendations::popularity_based),
        )
        .route("/recommendations/all", get(recommendations::all))
        .route("/recommendations/feedback", post(recommendations::feedback))
        .route("/recommendations/stats", get(recommendations::stats))
        .route(
            "/recommendations/invalidate-cache",
            post(recommendations::invalidate_cache),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
