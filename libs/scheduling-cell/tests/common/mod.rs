#![allow(dead_code)]
// Shared test doubles: in-memory stores injected in place of the Supabase
// implementations.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    AppointmentInstance, AppointmentStatus, NewAppointmentInstance, NewRecurringAppointment,
    RecurrenceEnd, RecurrencePattern, RecurringAppointment, RecurringAppointmentChanges,
    SchedulingError,
};
use scheduling_cell::stores::{AppointmentStore, RecurringAppointmentStore, ReferenceDirectory};

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn rule_fixture(
    pattern: RecurrencePattern,
    first_start: DateTime<Utc>,
    first_end: DateTime<Utc>,
    end: RecurrenceEnd,
) -> RecurringAppointment {
    RecurringAppointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        appointment_type_id: Uuid::new_v4(),
        first_start,
        first_end,
        pattern,
        interval: 1,
        days_of_week: None,
        day_of_month: None,
        end,
        is_active: true,
        notes: None,
        modified_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ==============================================================================
// APPOINTMENT STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: Mutex<Vec<AppointmentInstance>>,
    failing_start_times: Mutex<HashSet<DateTime<Utc>>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> AppointmentInstance {
        let appointment = AppointmentInstance {
            id: Uuid::new_v4(),
            recurring_appointment_id: None,
            patient_id: Uuid::new_v4(),
            professional_id,
            appointment_type_id: Uuid::new_v4(),
            start_time,
            end_time,
            status,
            notes: None,
            cancellation_reason: None,
            modified_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.appointments.lock().unwrap().push(appointment.clone());
        appointment
    }

    /// Make every insert whose slot starts at `start_time` fail, simulating a
    /// storage-layer error for that one candidate.
    pub fn fail_inserts_starting_at(&self, start_time: DateTime<Utc>) {
        self.failing_start_times.lock().unwrap().insert(start_time);
    }

    pub fn all(&self) -> Vec<AppointmentInstance> {
        self.appointments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(
        &self,
        new_appointment: NewAppointmentInstance,
        _auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        if self
            .failing_start_times
            .lock()
            .unwrap()
            .contains(&new_appointment.start_time)
        {
            return Err(SchedulingError::DatabaseError(
                "Simulated insert failure".to_string(),
            ));
        }

        let appointment = AppointmentInstance {
            id: Uuid::new_v4(),
            recurring_appointment_id: new_appointment.recurring_appointment_id,
            patient_id: new_appointment.patient_id,
            professional_id: new_appointment.professional_id,
            appointment_type_id: new_appointment.appointment_type_id,
            start_time: new_appointment.start_time,
            end_time: new_appointment.end_time,
            status: new_appointment.status,
            notes: new_appointment.notes,
            cancellation_reason: None,
            modified_by: new_appointment.modified_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.appointments.lock().unwrap().push(appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<AppointmentInstance>, SchedulingError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .find(|appointment| appointment.id == appointment_id)
            .cloned())
    }

    async fn appointments_in_range(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        _auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|appointment| appointment.professional_id == professional_id)
            .filter(|appointment| {
                appointment.start_time < end_time && appointment.end_time > start_time
            })
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .cloned()
            .collect())
    }

    async fn find_by_recurrence(
        &self,
        recurring_appointment_id: Uuid,
        from: Option<DateTime<Utc>>,
        _auth_token: &str,
    ) -> Result<Vec<AppointmentInstance>, SchedulingError> {
        let mut instances: Vec<AppointmentInstance> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|appointment| {
                appointment.recurring_appointment_id == Some(recurring_appointment_id)
            })
            .filter(|appointment| from.map_or(true, |from| appointment.start_time >= from))
            .cloned()
            .collect();
        instances.sort_by_key(|appointment| appointment.start_time);
        Ok(instances)
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        reason: Option<&str>,
        actor_id: Option<Uuid>,
        _auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .iter_mut()
            .find(|appointment| appointment.id == appointment_id)
            .ok_or(SchedulingError::AppointmentNotFound)?;

        appointment.status = status;
        if let Some(reason) = reason {
            appointment.cancellation_reason = Some(reason.to_string());
        }
        if let Some(actor_id) = actor_id {
            appointment.modified_by = Some(actor_id);
        }
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }
}

// ==============================================================================
// RECURRING APPOINTMENT STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryRecurringAppointmentStore {
    rules: Mutex<Vec<RecurringAppointment>>,
}

impl InMemoryRecurringAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<RecurringAppointment> {
        self.rules.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecurringAppointmentStore for InMemoryRecurringAppointmentStore {
    async fn insert(
        &self,
        new_rule: NewRecurringAppointment,
        _auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError> {
        let rule = RecurringAppointment {
            id: Uuid::new_v4(),
            patient_id: new_rule.patient_id,
            professional_id: new_rule.professional_id,
            appointment_type_id: new_rule.appointment_type_id,
            first_start: new_rule.first_start,
            first_end: new_rule.first_end,
            pattern: new_rule.pattern,
            interval: new_rule.interval,
            days_of_week: new_rule.days_of_week,
            day_of_month: new_rule.day_of_month,
            end: new_rule.end,
            is_active: new_rule.is_active,
            notes: new_rule.notes,
            modified_by: new_rule.modified_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.rules.lock().unwrap().push(rule.clone());
        Ok(rule)
    }

    async fn find_by_id(
        &self,
        recurring_appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<RecurringAppointment>, SchedulingError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| rule.id == recurring_appointment_id)
            .cloned())
    }

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<RecurringAppointment>, SchedulingError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|rule| rule.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        recurring_appointment_id: Uuid,
        changes: RecurringAppointmentChanges,
        _auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError> {
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == recurring_appointment_id)
            .ok_or(SchedulingError::RecurrenceNotFound)?;

        if let Some(first_start) = changes.first_start {
            rule.first_start = first_start;
        }
        if let Some(first_end) = changes.first_end {
            rule.first_end = first_end;
        }
        if let Some(pattern) = changes.pattern {
            rule.pattern = pattern;
        }
        if let Some(interval) = changes.interval {
            rule.interval = interval;
        }
        if let Some(days_of_week) = changes.days_of_week {
            rule.days_of_week = Some(days_of_week);
        }
        if let Some(day_of_month) = changes.day_of_month {
            rule.day_of_month = Some(day_of_month);
        }
        if let Some(end) = changes.end {
            rule.end = end;
        }
        if let Some(is_active) = changes.is_active {
            rule.is_active = is_active;
        }
        if let Some(notes) = changes.notes {
            rule.notes = Some(notes);
        }
        if let Some(modified_by) = changes.modified_by {
            rule.modified_by = Some(modified_by);
        }
        rule.updated_at = Utc::now();

        Ok(rule.clone())
    }
}

// ==============================================================================
// REFERENCE DIRECTORY
// ==============================================================================

#[derive(Default)]
pub struct StaticReferenceDirectory {
    patients: HashSet<Uuid>,
    professionals: HashSet<Uuid>,
    appointment_types: HashSet<Uuid>,
}

impl StaticReferenceDirectory {
    pub fn with(patient_id: Uuid, professional_id: Uuid, appointment_type_id: Uuid) -> Self {
        Self {
            patients: HashSet::from([patient_id]),
            professionals: HashSet::from([professional_id]),
            appointment_types: HashSet::from([appointment_type_id]),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceDirectory for StaticReferenceDirectory {
    async fn patient_exists(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        Ok(self.patients.contains(&patient_id))
    }

    async fn professional_exists(
        &self,
        professional_id: Uuid,
        _auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        Ok(self.professionals.contains(&professional_id))
    }

    async fn appointment_type_exists(
        &self,
        appointment_type_id: Uuid,
        _auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        Ok(self.appointment_types.contains(&appointment_type_id))
    }
}
