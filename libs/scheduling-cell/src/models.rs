// libs/scheduling-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// A stored recurrence rule from which concrete appointments are generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub first_start: DateTime<Utc>,
    pub first_end: DateTime<Utc>,
    pub pattern: RecurrencePattern,
    pub interval: u32,
    /// Weekday numbers 0-6, 0 = Sunday. Required for weekly rules.
    pub days_of_week: Option<Vec<u8>>,
    /// Day 1-31. Required for monthly rules.
    pub day_of_month: Option<u32>,
    pub end: RecurrenceEnd,
    pub is_active: bool,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringAppointment {
    /// Duration of the first occurrence, reused for every generated instance.
    pub fn occurrence_duration(&self) -> chrono::Duration {
        self.first_end - self.first_start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrencePattern::Daily => write!(f, "daily"),
            RecurrencePattern::Weekly => write!(f, "weekly"),
            RecurrencePattern::Biweekly => write!(f, "biweekly"),
            RecurrencePattern::Monthly => write!(f, "monthly"),
            RecurrencePattern::Custom => write!(f, "custom"),
        }
    }
}

/// When a recurrence stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Never,
    AfterOccurrences { count: u32 },
    OnDate { date: DateTime<Utc> },
}

/// One concrete appointment, either generated from a rule or booked directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentInstance {
    pub id: Uuid,
    /// Back-reference to the rule this instance was generated from; not an
    /// ownership relation. Null for standalone bookings.
    pub recurring_appointment_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// INSERT / PATCH MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointmentInstance {
    pub recurring_appointment_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewRecurringAppointment {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub first_start: DateTime<Utc>,
    pub first_end: DateTime<Utc>,
    pub pattern: RecurrencePattern,
    pub interval: u32,
    pub days_of_week: Option<Vec<u8>>,
    pub day_of_month: Option<u32>,
    pub end: RecurrenceEnd,
    pub is_active: bool,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
}

/// Partial update to a stored recurrence rule. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RecurringAppointmentChanges {
    pub first_start: Option<DateTime<Utc>>,
    pub first_end: Option<DateTime<Utc>>,
    pub pattern: Option<RecurrencePattern>,
    pub interval: Option<u32>,
    pub days_of_week: Option<Vec<u8>>,
    pub day_of_month: Option<u32>,
    pub end: Option<RecurrenceEnd>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringAppointmentRequest {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub first_start: DateTime<Utc>,
    pub first_end: DateTime<Utc>,
    pub pattern: RecurrencePattern,
    #[serde(default = "default_interval")]
    pub interval: u32,
    pub days_of_week: Option<Vec<u8>>,
    pub day_of_month: Option<u32>,
    pub end: RecurrenceEnd,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecurringAppointmentRequest {
    pub first_start: Option<DateTime<Utc>>,
    pub first_end: Option<DateTime<Utc>>,
    pub pattern: Option<RecurrencePattern>,
    pub interval: Option<u32>,
    pub days_of_week: Option<Vec<u8>>,
    pub day_of_month: Option<u32>,
    pub end: Option<RecurrenceEnd>,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
    /// When true, future generated instances are cancelled and the updated
    /// rule is expanded and materialized again.
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateRecurringAppointmentRequest {
    #[serde(default = "default_cancel_future")]
    pub cancel_future_instances: bool,
    pub reason: Option<String>,
    pub modified_by: Option<Uuid>,
}

fn default_cancel_future() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub appointment_type_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub modified_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub modified_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<AppointmentInstance>,
}

// ==============================================================================
// EXPANSION AND GENERATION MODELS
// ==============================================================================

/// One candidate occurrence produced by expanding a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Runaway guards applied to every expansion.
#[derive(Debug, Clone)]
pub struct GenerationLimits {
    /// Hard cap on accepted occurrences, regardless of end condition.
    pub max_instances: usize,
    /// Lookahead horizon for rules that never end.
    pub default_lookahead_years: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_instances: 100,
            default_lookahead_years: 1,
        }
    }
}

/// What happened to a single candidate during materialization.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Created {
        appointment: AppointmentInstance,
    },
    SkippedConflict {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    Failed {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        reason: String,
    },
}

/// Per-candidate results of one generation pass. Skips and per-instance
/// failures are recorded here instead of aborting the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub outcomes: Vec<CandidateOutcome>,
}

impl GenerationReport {
    pub fn created(&self) -> Vec<&AppointmentInstance> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                CandidateOutcome::Created { appointment } => Some(appointment),
                _ => None,
            })
            .collect()
    }

    pub fn into_created(self) -> Vec<AppointmentInstance> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                CandidateOutcome::Created { appointment } => Some(appointment),
                _ => None,
            })
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.created().len()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CandidateOutcome::SkippedConflict { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CandidateOutcome::Failed { .. }))
            .count()
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Recurring appointment not found")]
    RecurrenceNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Professional not found")]
    ProfessionalNotFound,

    #[error("Appointment type not found")]
    AppointmentTypeNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cannot change status of a cancelled appointment")]
    CancelledAppointmentImmutable,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment conflicts with an existing booking")]
    ConflictDetected,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
