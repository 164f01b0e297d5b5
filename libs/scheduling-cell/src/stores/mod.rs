// libs/scheduling-cell/src/stores/mod.rs
//
// Narrow persistence interfaces consumed by the scheduling services. The
// Supabase-backed implementations live in `supabase.rs`; tests inject
// in-memory doubles.

pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AppointmentInstance, AppointmentStatus, NewAppointmentInstance,
    NewRecurringAppointment, RecurringAppointment, RecurringAppointmentChanges,
    SchedulingError,
};

pub use supabase::{
    SupabaseAppointmentStore, SupabaseRecurringAppointmentStore, SupabaseReferenceDirectory,
};

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(
        &self,
        new_appointment: NewAppointmentInstance,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError>;

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<AppointmentInstance>, SchedulingError>;

    /// Appointments of a professional whose interval touches `[start_time, end_time)`.
    /// Callers apply the precise overlap and status filtering.
    async fn appointments_in_range(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError>;

    /// Instances generated from a rule, optionally restricted to those
    /// starting at or after `from`.
    async fn find_by_recurrence(
        &self,
        recurring_appointment_id: Uuid,
        from: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError>;

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        reason: Option<&str>,
        actor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError>;
}

#[async_trait]
pub trait RecurringAppointmentStore: Send + Sync {
    async fn insert(
        &self,
        new_rule: NewRecurringAppointment,
        auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError>;

    async fn find_by_id(
        &self,
        recurring_appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<RecurringAppointment>, SchedulingError>;

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<RecurringAppointment>, SchedulingError>;

    async fn update(
        &self,
        recurring_appointment_id: Uuid,
        changes: RecurringAppointmentChanges,
        auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError>;
}

/// Existence checks for the records a rule references.
#[async_trait]
pub trait ReferenceDirectory: Send + Sync {
    async fn patient_exists(&self, patient_id: Uuid, auth_token: &str)
        -> Result<bool, SchedulingError>;

    async fn professional_exists(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError>;

    async fn appointment_type_exists(
        &self,
        appointment_type_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError>;
}
