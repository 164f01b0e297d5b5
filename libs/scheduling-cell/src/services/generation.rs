// libs/scheduling-cell/src/services/generation.rs
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{
    AppointmentStatus, CandidateOutcome, CandidateSlot, GenerationReport,
    NewAppointmentInstance, RecurringAppointment,
};
use crate::services::conflict::ConflictDetectionService;
use crate::stores::AppointmentStore;

/// Turns candidate slots into persisted appointments, one at a time.
pub struct AppointmentGenerationService {
    appointments: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
}

impl AppointmentGenerationService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        let conflict_service = ConflictDetectionService::new(Arc::clone(&appointments));
        Self {
            appointments,
            conflict_service,
        }
    }

    /// Materialize candidates in order, checking each against existing
    /// bookings before inserting it.
    ///
    /// A candidate that overlaps an existing booking is skipped; a failed
    /// check or insert drops only that candidate. The batch itself never
    /// fails, and earlier writes are never rolled back.
    pub async fn generate_instances(
        &self,
        rule: &RecurringAppointment,
        candidates: &[CandidateSlot],
        auth_token: &str,
    ) -> GenerationReport {
        debug!(
            "Materializing {} candidate slots for recurring appointment {}",
            candidates.len(),
            rule.id
        );

        let mut report = GenerationReport::default();

        for candidate in candidates {
            match self
                .conflict_service
                .has_conflict(
                    rule.professional_id,
                    candidate.start_time,
                    candidate.end_time,
                    None,
                    auth_token,
                )
                .await
            {
                Ok(true) => {
                    debug!(
                        "Skipping conflicting slot {} - {} for professional {}",
                        candidate.start_time, candidate.end_time, rule.professional_id
                    );
                    report.outcomes.push(CandidateOutcome::SkippedConflict {
                        start_time: candidate.start_time,
                        end_time: candidate.end_time,
                    });
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Conflict check failed for slot starting {}: {}",
                        candidate.start_time, e
                    );
                    report.outcomes.push(CandidateOutcome::Failed {
                        start_time: candidate.start_time,
                        end_time: candidate.end_time,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            let new_instance = NewAppointmentInstance {
                recurring_appointment_id: Some(rule.id),
                patient_id: rule.patient_id,
                professional_id: rule.professional_id,
                appointment_type_id: rule.appointment_type_id,
                start_time: candidate.start_time,
                end_time: candidate.end_time,
                status: AppointmentStatus::Confirmed,
                notes: rule.notes.clone(),
                modified_by: rule.modified_by,
            };

            match self.appointments.insert(new_instance, auth_token).await {
                Ok(appointment) => {
                    report
                        .outcomes
                        .push(CandidateOutcome::Created { appointment });
                }
                Err(e) => {
                    warn!(
                        "Failed to persist generated appointment starting {}: {}",
                        candidate.start_time, e
                    );
                    report.outcomes.push(CandidateOutcome::Failed {
                        start_time: candidate.start_time,
                        end_time: candidate.end_time,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Generated {} of {} candidates for recurring appointment {} ({} conflicts skipped, {} failed)",
            report.created_count(),
            candidates.len(),
            rule.id,
            report.skipped_count(),
            report.failed_count()
        );

        report
    }
}
