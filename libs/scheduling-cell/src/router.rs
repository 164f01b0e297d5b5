// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Recurring appointment lifecycle
        .route("/recurring", post(handlers::create_recurring_appointment))
        .route("/recurring/{recurring_id}", get(handlers::get_recurring_appointment))
        .route("/recurring/{recurring_id}", put(handlers::update_recurring_appointment))
        .route("/recurring/{recurring_id}/deactivate", post(handlers::deactivate_recurring_appointment))
        .route("/recurring/{recurring_id}/preview", get(handlers::preview_recurring_appointment))
        .route("/recurring/patients/{patient_id}", get(handlers::get_patient_recurring_appointments))

        // Standalone appointments
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))

        // Utility endpoints
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))

        .with_state(state)
}
