// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    AppointmentInstance, AppointmentStatus, ConflictCheckResponse, SchedulingError,
};
use crate::stores::AppointmentStore;

pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    /// Whether any booked appointment blocks `[start_time, end_time)` for the
    /// professional. Cancelled and no-show appointments never block a slot.
    pub async fn has_conflict(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let response = self
            .check_conflicts(
                professional_id,
                start_time,
                end_time,
                exclude_appointment_id,
                auth_token,
            )
            .await?;

        Ok(response.has_conflict)
    }

    /// Conflict check that also returns the overlapping appointments.
    pub async fn check_conflicts(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, SchedulingError> {
        debug!(
            "Checking conflicts for professional {} from {} to {}",
            professional_id, start_time, end_time
        );

        let existing = self
            .appointments
            .appointments_in_range(
                professional_id,
                start_time,
                end_time,
                exclude_appointment_id,
                auth_token,
            )
            .await?;

        let conflicting_appointments: Vec<AppointmentInstance> = existing
            .into_iter()
            .filter(|appointment| {
                intervals_overlap(
                    start_time,
                    end_time,
                    appointment.start_time,
                    appointment.end_time,
                )
            })
            .filter(|appointment| blocks_slot(&appointment.status))
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();

        if has_conflict {
            warn!(
                "Conflict detected for professional {} - {} overlapping appointments",
                professional_id,
                conflicting_appointments.len()
            );
        }

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        })
    }
}

/// Half-open overlap test: `[start1, end1)` and `[start2, end2)` conflict iff
/// `start1 < end2 && start2 < end1`. Touching endpoints do not overlap.
fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

fn blocks_slot(status: &AppointmentStatus) -> bool {
    !matches!(
        status,
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow
    )
}
