// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CreateAppointmentRequest, CreateRecurringAppointmentRequest,
    DeactivateRecurringAppointmentRequest, SchedulingError, UpdateAppointmentStatusRequest,
    UpdateRecurringAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::recurring::RecurringAppointmentService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

// ==============================================================================
// RECURRING APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_recurring_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateRecurringAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let (rule, report) = service
        .create(request, token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "recurring_appointment": rule,
        "generated_instances": report.created(),
        "skipped_conflicts": report.skipped_count(),
        "failed_inserts": report.failed_count(),
        "message": "Recurring appointment created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_recurring_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(recurring_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let rule = service
        .get(recurring_id, token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(rule)))
}

#[axum::debug_handler]
pub async fn get_patient_recurring_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let rules = service
        .find_by_patient(patient_id, token)
        .await
        .map_err(into_app_error)?;

    let count = rules.len();
    Ok(Json(json!({
        "recurring_appointments": rules,
        "count": count
    })))
}

#[axum::debug_handler]
pub async fn update_recurring_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(recurring_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateRecurringAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let (rule, report) = service
        .update(recurring_id, request, token)
        .await
        .map_err(into_app_error)?;

    let mut body = json!({
        "success": true,
        "recurring_appointment": rule,
        "message": "Recurring appointment updated successfully"
    });
    if let Some(report) = report {
        body["generated_instances"] = json!(report.created());
        body["skipped_conflicts"] = json!(report.skipped_count());
        body["failed_inserts"] = json!(report.failed_count());
    }

    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn deactivate_recurring_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(recurring_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<DeactivateRecurringAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let (rule, cancelled) = service
        .deactivate(recurring_id, request, token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "recurring_appointment": rule,
        "cancelled_instances": cancelled,
        "message": "Recurring appointment deactivated successfully"
    })))
}

/// Expansion preview: the occurrences a rule would generate, without writes.
#[axum::debug_handler]
pub async fn preview_recurring_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(recurring_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecurringAppointmentService::from_config(&state);

    let candidates = service
        .preview(recurring_id, token)
        .await
        .map_err(into_app_error)?;

    let count = candidates.len();
    Ok(Json(json!({
        "candidates": candidates,
        "count": count
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentBookingService::from_config(&state);

    let appointment = service
        .book_appointment(request, token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentBookingService::from_config(&state);

    let appointment = service
        .update_status(appointment_id, request, token)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment status updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ConflictCheckQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentBookingService::from_config(&state);

    let response = service
        .conflict_service()
        .check_conflicts(
            query.professional_id,
            query.start_time,
            query.end_time,
            query.exclude_appointment_id,
            token,
        )
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn into_app_error(error: SchedulingError) -> AppError {
    match error {
        SchedulingError::RecurrenceNotFound
        | SchedulingError::AppointmentNotFound
        | SchedulingError::PatientNotFound
        | SchedulingError::ProfessionalNotFound
        | SchedulingError::AppointmentTypeNotFound => AppError::NotFound(error.to_string()),
        SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
        SchedulingError::CancelledAppointmentImmutable
        | SchedulingError::InvalidStatusTransition { .. } => {
            AppError::BadRequest(error.to_string())
        }
        SchedulingError::ConflictDetected => AppError::Conflict(error.to_string()),
        SchedulingError::DatabaseError(msg) => AppError::Database(msg),
    }
}
