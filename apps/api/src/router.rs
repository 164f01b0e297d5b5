use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Solace Clinic scheduling API is running!" }))
        .nest("/appointments", scheduling_routes(state.clone()))
}
