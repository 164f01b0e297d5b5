// libs/scheduling-cell/src/stores/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentInstance, AppointmentStatus, NewAppointmentInstance,
    NewRecurringAppointment, RecurrenceEnd, RecurrencePattern, RecurringAppointment,
    RecurringAppointmentChanges, SchedulingError,
};
use crate::stores::{AppointmentStore, RecurringAppointmentStore, ReferenceDirectory};

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AppointmentInstance>, _>>()
            .map_err(|e| {
                SchedulingError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(
        &self,
        new_appointment: NewAppointmentInstance,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        let body = serde_json::to_value(&new_appointment)
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let result: Vec<Value> = self
            .supabase
            .request(Method::POST, "/rest/v1/appointments", Some(auth_token), Some(body))
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .next()
            .ok_or_else(|| {
                SchedulingError::DatabaseError("Insert returned no appointment row".to_string())
            })?;

        serde_json::from_value(created).map_err(|e| {
            SchedulingError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<AppointmentInstance>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut appointments = self.fetch_appointments(&path, auth_token).await?;

        if appointments.is_empty() {
            return Ok(None);
        }
        Ok(Some(appointments.remove(0)))
    }

    async fn appointments_in_range(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError> {
        let mut query_parts = vec![
            format!("professional_id=eq.{}", professional_id),
            format!("start_time=lt.{}", urlencoding::encode(&end_time.to_rfc3339())),
            format!("end_time=gt.{}", urlencoding::encode(&start_time.to_rfc3339())),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        self.fetch_appointments(&path, auth_token).await
    }

    async fn find_by_recurrence(
        &self,
        recurring_appointment_id: Uuid,
        from: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError> {
        let mut query_parts = vec![format!(
            "recurring_appointment_id=eq.{}",
            recurring_appointment_id
        )];

        if let Some(from) = from {
            query_parts.push(format!(
                "start_time=gte.{}",
                urlencoding::encode(&from.to_rfc3339())
            ));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        self.fetch_appointments(&path, auth_token).await
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        reason: Option<&str>,
        actor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        debug!("Updating appointment {} status to {}", appointment_id, status);

        let mut body = Map::new();
        body.insert("status".to_string(), json!(status));
        if let Some(reason) = reason {
            body.insert("cancellation_reason".to_string(), json!(reason));
        }
        if let Some(actor_id) = actor_id {
            body.insert("modified_by".to_string(), json!(actor_id));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(auth_token), Some(Value::Object(body)))
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let updated = result
            .into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound)?;

        serde_json::from_value(updated).map_err(|e| {
            SchedulingError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }
}

// ==============================================================================
// RECURRING APPOINTMENTS
// ==============================================================================

/// Flat PostgREST row shape for `recurring_appointments`; the tagged
/// `RecurrenceEnd` is spread over `end_kind` / `occurrence_count` / `end_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecurringAppointmentRow {
    id: Uuid,
    patient_id: Uuid,
    professional_id: Uuid,
    appointment_type_id: Uuid,
    first_start: DateTime<Utc>,
    first_end: DateTime<Utc>,
    pattern: RecurrencePattern,
    interval: u32,
    days_of_week: Option<Vec<u8>>,
    day_of_month: Option<u32>,
    end_kind: String,
    occurrence_count: Option<u32>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    notes: Option<String>,
    modified_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecurringAppointmentRow {
    fn into_model(self) -> Result<RecurringAppointment, SchedulingError> {
        let end = match self.end_kind.as_str() {
            "never" => RecurrenceEnd::Never,
            "after_occurrences" => RecurrenceEnd::AfterOccurrences {
                count: self.occurrence_count.ok_or_else(|| {
                    SchedulingError::DatabaseError(
                        "Recurring appointment row is missing occurrence_count".to_string(),
                    )
                })?,
            },
            "on_date" => RecurrenceEnd::OnDate {
                date: self.end_date.ok_or_else(|| {
                    SchedulingError::DatabaseError(
                        "Recurring appointment row is missing end_date".to_string(),
                    )
                })?,
            },
            other => {
                return Err(SchedulingError::DatabaseError(format!(
                    "Unknown recurrence end kind: {}",
                    other
                )))
            }
        };

        Ok(RecurringAppointment {
            id: self.id,
            patient_id: self.patient_id,
            professional_id: self.professional_id,
            appointment_type_id: self.appointment_type_id,
            first_start: self.first_start,
            first_end: self.first_end,
            pattern: self.pattern,
            interval: self.interval,
            days_of_week: self.days_of_week,
            day_of_month: self.day_of_month,
            end,
            is_active: self.is_active,
            notes: self.notes,
            modified_by: self.modified_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn end_columns(end: &RecurrenceEnd) -> (&'static str, Option<u32>, Option<DateTime<Utc>>) {
    match end {
        RecurrenceEnd::Never => ("never", None, None),
        RecurrenceEnd::AfterOccurrences { count } => ("after_occurrences", Some(*count), None),
        RecurrenceEnd::OnDate { date } => ("on_date", None, Some(*date)),
    }
}

pub struct SupabaseRecurringAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseRecurringAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_rules(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<RecurringAppointment>, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value::<RecurringAppointmentRow>(row)
                    .map_err(|e| {
                        SchedulingError::DatabaseError(format!(
                            "Failed to parse recurring appointment: {}",
                            e
                        ))
                    })
                    .and_then(RecurringAppointmentRow::into_model)
            })
            .collect()
    }

    fn parse_single(row: Value) -> Result<RecurringAppointment, SchedulingError> {
        serde_json::from_value::<RecurringAppointmentRow>(row)
            .map_err(|e| {
                SchedulingError::DatabaseError(format!(
                    "Failed to parse recurring appointment: {}",
                    e
                ))
            })
            .and_then(RecurringAppointmentRow::into_model)
    }
}

#[async_trait]
impl RecurringAppointmentStore for SupabaseRecurringAppointmentStore {
    async fn insert(
        &self,
        new_rule: NewRecurringAppointment,
        auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError> {
        let (end_kind, occurrence_count, end_date) = end_columns(&new_rule.end);
        let body = json!({
            "patient_id": new_rule.patient_id,
            "professional_id": new_rule.professional_id,
            "appointment_type_id": new_rule.appointment_type_id,
            "first_start": new_rule.first_start,
            "first_end": new_rule.first_end,
            "pattern": new_rule.pattern,
            "interval": new_rule.interval,
            "days_of_week": new_rule.days_of_week,
            "day_of_month": new_rule.day_of_month,
            "end_kind": end_kind,
            "occurrence_count": occurrence_count,
            "end_date": end_date,
            "is_active": new_rule.is_active,
            "notes": new_rule.notes,
            "modified_by": new_rule.modified_by,
        });

        let result: Vec<Value> = self
            .supabase
            .request(
                Method::POST,
                "/rest/v1/recurring_appointments",
                Some(auth_token),
                Some(body),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let created = result.into_iter().next().ok_or_else(|| {
            SchedulingError::DatabaseError("Insert returned no recurring appointment row".to_string())
        })?;

        Self::parse_single(created)
    }

    async fn find_by_id(
        &self,
        recurring_appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<RecurringAppointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/recurring_appointments?id=eq.{}",
            recurring_appointment_id
        );
        let mut rules = self.fetch_rules(&path, auth_token).await?;

        if rules.is_empty() {
            return Ok(None);
        }
        Ok(Some(rules.remove(0)))
    }

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<RecurringAppointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/recurring_appointments?patient_id=eq.{}&order=first_start.asc",
            patient_id
        );
        self.fetch_rules(&path, auth_token).await
    }

    async fn update(
        &self,
        recurring_appointment_id: Uuid,
        changes: RecurringAppointmentChanges,
        auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError> {
        let mut body = Map::new();
        if let Some(first_start) = changes.first_start {
            body.insert("first_start".to_string(), json!(first_start));
        }
        if let Some(first_end) = changes.first_end {
            body.insert("first_end".to_string(), json!(first_end));
        }
        if let Some(pattern) = changes.pattern {
            body.insert("pattern".to_string(), json!(pattern));
        }
        if let Some(interval) = changes.interval {
            body.insert("interval".to_string(), json!(interval));
        }
        if let Some(days_of_week) = &changes.days_of_week {
            body.insert("days_of_week".to_string(), json!(days_of_week));
        }
        if let Some(day_of_month) = changes.day_of_month {
            body.insert("day_of_month".to_string(), json!(day_of_month));
        }
        if let Some(end) = &changes.end {
            let (end_kind, occurrence_count, end_date) = end_columns(end);
            body.insert("end_kind".to_string(), json!(end_kind));
            body.insert("occurrence_count".to_string(), json!(occurrence_count));
            body.insert("end_date".to_string(), json!(end_date));
        }
        if let Some(is_active) = changes.is_active {
            body.insert("is_active".to_string(), json!(is_active));
        }
        if let Some(notes) = &changes.notes {
            body.insert("notes".to_string(), json!(notes));
        }
        if let Some(modified_by) = changes.modified_by {
            body.insert("modified_by".to_string(), json!(modified_by));
        }

        let path = format!(
            "/rest/v1/recurring_appointments?id=eq.{}",
            recurring_appointment_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(auth_token), Some(Value::Object(body)))
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let updated = result
            .into_iter()
            .next()
            .ok_or(SchedulingError::RecurrenceNotFound)?;

        Self::parse_single(updated)
    }
}

// ==============================================================================
// REFERENCE LOOKUPS
// ==============================================================================

pub struct SupabaseReferenceDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseReferenceDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn record_exists(
        &self,
        table: &str,
        id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=id", table, id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }
}

#[async_trait]
impl ReferenceDirectory for SupabaseReferenceDirectory {
    async fn patient_exists(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        self.record_exists("patients", patient_id, auth_token).await
    }

    async fn professional_exists(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        self.record_exists("professionals", professional_id, auth_token)
            .await
    }

    async fn appointment_type_exists(
        &self,
        appointment_type_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        self.record_exists("appointment_types", appointment_type_id, auth_token)
            .await
    }
}
