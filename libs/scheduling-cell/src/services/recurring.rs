// libs/scheduling-cell/src/services/recurring.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentStatus, CandidateSlot, CreateRecurringAppointmentRequest,
    DeactivateRecurringAppointmentRequest, GenerationReport, NewRecurringAppointment,
    RecurrenceEnd, RecurrencePattern, RecurringAppointment, RecurringAppointmentChanges,
    SchedulingError, UpdateRecurringAppointmentRequest,
};
use crate::services::generation::AppointmentGenerationService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::recurrence::RecurrenceExpansionService;
use crate::stores::{
    AppointmentStore, RecurringAppointmentStore, ReferenceDirectory, SupabaseAppointmentStore,
    SupabaseRecurringAppointmentStore, SupabaseReferenceDirectory,
};

/// Orchestrates the life of a recurrence rule: validation, persistence,
/// expansion into instances, regeneration and deactivation.
pub struct RecurringAppointmentService {
    rules: Arc<dyn RecurringAppointmentStore>,
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ReferenceDirectory>,
    expansion_service: RecurrenceExpansionService,
    generation_service: AppointmentGenerationService,
    lifecycle_service: AppointmentLifecycleService,
}

impl RecurringAppointmentService {
    pub fn new(
        rules: Arc<dyn RecurringAppointmentStore>,
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ReferenceDirectory>,
    ) -> Self {
        let generation_service = AppointmentGenerationService::new(Arc::clone(&appointments));
        Self {
            rules,
            appointments,
            directory,
            expansion_service: RecurrenceExpansionService::new(),
            generation_service,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseRecurringAppointmentStore::new(Arc::clone(&supabase))),
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
            Arc::new(SupabaseReferenceDirectory::new(supabase)),
        )
    }

    /// Validate and persist a new rule, then expand and materialize its
    /// instances. Returns the rule together with the per-candidate outcomes.
    pub async fn create(
        &self,
        request: CreateRecurringAppointmentRequest,
        auth_token: &str,
    ) -> Result<(RecurringAppointment, GenerationReport), SchedulingError> {
        info!(
            "Creating recurring appointment for patient {} with professional {}",
            request.patient_id, request.professional_id
        );

        validate_schedule(
            request.first_start,
            request.first_end,
            request.interval,
            &request.pattern,
            request.days_of_week.as_deref(),
            request.day_of_month,
            &request.end,
        )?;

        if request.first_start <= Utc::now() {
            return Err(SchedulingError::ValidationError(
                "The first occurrence must be scheduled in the future".to_string(),
            ));
        }

        self.verify_references(
            request.patient_id,
            request.professional_id,
            request.appointment_type_id,
            auth_token,
        )
        .await?;

        let new_rule = NewRecurringAppointment {
            patient_id: request.patient_id,
            professional_id: request.professional_id,
            appointment_type_id: request.appointment_type_id,
            first_start: request.first_start,
            first_end: request.first_end,
            pattern: request.pattern,
            interval: request.interval,
            days_of_week: request.days_of_week,
            day_of_month: request.day_of_month,
            end: request.end,
            is_active: true,
            notes: request.notes,
            modified_by: request.modified_by,
        };

        let rule = self.rules.insert(new_rule, auth_token).await?;

        let candidates = self.expansion_service.expand(&rule);
        let report = self
            .generation_service
            .generate_instances(&rule, &candidates, auth_token)
            .await;

        info!(
            "Recurring appointment {} created with {} generated instances",
            rule.id,
            report.created_count()
        );

        Ok((rule, report))
    }

    /// Apply a patch to a rule. With `regenerate`, future instances are
    /// cancelled first and the updated rule is expanded and materialized
    /// again; otherwise existing instances are untouched.
    pub async fn update(
        &self,
        recurring_appointment_id: Uuid,
        request: UpdateRecurringAppointmentRequest,
        auth_token: &str,
    ) -> Result<(RecurringAppointment, Option<GenerationReport>), SchedulingError> {
        debug!("Updating recurring appointment {}", recurring_appointment_id);

        let existing = self.get(recurring_appointment_id, auth_token).await?;

        let merged = merge_for_validation(&existing, &request);
        validate_schedule(
            merged.first_start,
            merged.first_end,
            merged.interval,
            &merged.pattern,
            merged.days_of_week.as_deref(),
            merged.day_of_month,
            &merged.end,
        )?;

        let changes = RecurringAppointmentChanges {
            first_start: request.first_start,
            first_end: request.first_end,
            pattern: request.pattern,
            interval: request.interval,
            days_of_week: request.days_of_week,
            day_of_month: request.day_of_month,
            end: request.end,
            is_active: None,
            notes: request.notes,
            modified_by: request.modified_by,
        };

        let updated = self
            .rules
            .update(recurring_appointment_id, changes, auth_token)
            .await?;

        if !request.regenerate {
            return Ok((updated, None));
        }

        let cancelled = self
            .cancel_future_instances(
                recurring_appointment_id,
                "Recurring schedule updated",
                request.modified_by,
                auth_token,
            )
            .await?;
        debug!(
            "Cancelled {} future instances of recurring appointment {} before regeneration",
            cancelled, recurring_appointment_id
        );

        let candidates = self.expansion_service.expand(&updated);
        let report = self
            .generation_service
            .generate_instances(&updated, &candidates, auth_token)
            .await;

        info!(
            "Recurring appointment {} regenerated: {} instances created",
            recurring_appointment_id,
            report.created_count()
        );

        Ok((updated, Some(report)))
    }

    /// Deactivate a rule. Instances are never deleted; future ones are
    /// cancelled unless the caller opts out.
    pub async fn deactivate(
        &self,
        recurring_appointment_id: Uuid,
        request: DeactivateRecurringAppointmentRequest,
        auth_token: &str,
    ) -> Result<(RecurringAppointment, usize), SchedulingError> {
        debug!(
            "Deactivating recurring appointment {}",
            recurring_appointment_id
        );

        self.get(recurring_appointment_id, auth_token).await?;

        let changes = RecurringAppointmentChanges {
            is_active: Some(false),
            modified_by: request.modified_by,
            ..Default::default()
        };
        let updated = self
            .rules
            .update(recurring_appointment_id, changes, auth_token)
            .await?;

        let cancelled = if request.cancel_future_instances {
            let reason = request
                .reason
                .as_deref()
                .unwrap_or("Recurring appointment deactivated");
            self.cancel_future_instances(
                recurring_appointment_id,
                reason,
                request.modified_by,
                auth_token,
            )
            .await?
        } else {
            0
        };

        info!(
            "Recurring appointment {} deactivated, {} future instances cancelled",
            recurring_appointment_id, cancelled
        );

        Ok((updated, cancelled))
    }

    pub async fn get(
        &self,
        recurring_appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<RecurringAppointment, SchedulingError> {
        self.rules
            .find_by_id(recurring_appointment_id, auth_token)
            .await?
            .ok_or(SchedulingError::RecurrenceNotFound)
    }

    pub async fn find_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<RecurringAppointment>, SchedulingError> {
        self.rules.find_by_patient(patient_id, auth_token).await
    }

    /// Expand a stored rule without persisting anything.
    pub async fn preview(
        &self,
        recurring_appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<CandidateSlot>, SchedulingError> {
        let rule = self.get(recurring_appointment_id, auth_token).await?;
        Ok(self.expansion_service.expand(&rule))
    }

    /// Cancel every future, non-cancelled instance linked to a rule.
    /// Cancellation is a status transition, never a delete.
    async fn cancel_future_instances(
        &self,
        recurring_appointment_id: Uuid,
        reason: &str,
        actor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<usize, SchedulingError> {
        let future_instances = self
            .appointments
            .find_by_recurrence(recurring_appointment_id, Some(Utc::now()), auth_token)
            .await?;

        let mut cancelled = 0;
        for instance in future_instances {
            if instance.status == AppointmentStatus::Cancelled {
                continue;
            }

            self.lifecycle_service
                .validate_status_transition(&instance.status, &AppointmentStatus::Cancelled)?;

            self.appointments
                .update_status(
                    instance.id,
                    AppointmentStatus::Cancelled,
                    Some(reason),
                    actor_id,
                    auth_token,
                )
                .await?;
            cancelled += 1;
        }

        Ok(cancelled)
    }

    async fn verify_references(
        &self,
        patient_id: Uuid,
        professional_id: Uuid,
        appointment_type_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        if !self.directory.patient_exists(patient_id, auth_token).await? {
            return Err(SchedulingError::PatientNotFound);
        }
        if !self
            .directory
            .professional_exists(professional_id, auth_token)
            .await?
        {
            return Err(SchedulingError::ProfessionalNotFound);
        }
        if !self
            .directory
            .appointment_type_exists(appointment_type_id, auth_token)
            .await?
        {
            return Err(SchedulingError::AppointmentTypeNotFound);
        }
        Ok(())
    }
}

/// The schedule fields of a rule after a patch is applied, used to validate
/// an update before anything is written.
fn merge_for_validation(
    existing: &RecurringAppointment,
    patch: &UpdateRecurringAppointmentRequest,
) -> RecurringAppointment {
    let mut merged = existing.clone();

    if let Some(first_start) = patch.first_start {
        merged.first_start = first_start;
    }
    if let Some(first_end) = patch.first_end {
        merged.first_end = first_end;
    }
    if let Some(pattern) = patch.pattern {
        merged.pattern = pattern;
    }
    if let Some(interval) = patch.interval {
        merged.interval = interval;
    }
    if let Some(days_of_week) = &patch.days_of_week {
        merged.days_of_week = Some(days_of_week.clone());
    }
    if let Some(day_of_month) = patch.day_of_month {
        merged.day_of_month = Some(day_of_month);
    }
    if let Some(end) = patch.end {
        merged.end = end;
    }
    if let Some(notes) = &patch.notes {
        merged.notes = Some(notes.clone());
    }

    merged
}

fn validate_schedule(
    first_start: DateTime<Utc>,
    first_end: DateTime<Utc>,
    interval: u32,
    pattern: &RecurrencePattern,
    days_of_week: Option<&[u8]>,
    day_of_month: Option<u32>,
    end: &RecurrenceEnd,
) -> Result<(), SchedulingError> {
    if first_start >= first_end {
        return Err(SchedulingError::ValidationError(
            "The first occurrence must end after it starts".to_string(),
        ));
    }

    if interval < 1 {
        return Err(SchedulingError::ValidationError(
            "Recurrence interval must be at least 1".to_string(),
        ));
    }

    match pattern {
        RecurrencePattern::Weekly => {
            let days = days_of_week.filter(|days| !days.is_empty()).ok_or_else(|| {
                SchedulingError::ValidationError(
                    "Weekly recurrence requires at least one day of week".to_string(),
                )
            })?;
            if days.iter().any(|day| *day > 6) {
                return Err(SchedulingError::ValidationError(
                    "Days of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
        }
        RecurrencePattern::Monthly => {
            let day = day_of_month.ok_or_else(|| {
                SchedulingError::ValidationError(
                    "Monthly recurrence requires a day of month".to_string(),
                )
            })?;
            if !(1..=31).contains(&day) {
                return Err(SchedulingError::ValidationError(
                    "Day of month must be between 1 and 31".to_string(),
                ));
            }
        }
        _ => {}
    }

    match end {
        RecurrenceEnd::AfterOccurrences { count } => {
            if *count < 1 {
                return Err(SchedulingError::ValidationError(
                    "Occurrence count must be at least 1".to_string(),
                ));
            }
        }
        RecurrenceEnd::OnDate { date } => {
            if *date <= first_start {
                return Err(SchedulingError::ValidationError(
                    "The recurrence end date must be after the first occurrence".to_string(),
                ));
            }
        }
        RecurrenceEnd::Never => {}
    }

    Ok(())
}
