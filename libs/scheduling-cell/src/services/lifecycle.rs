// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

const ALL_STATUSES: [AppointmentStatus; 6] = [
    AppointmentStatus::Requested,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Completed,
    AppointmentStatus::Cancelled,
    AppointmentStatus::Rescheduled,
    AppointmentStatus::NoShow,
];

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed.
    ///
    /// Transitions are permitted unless explicitly forbidden: nothing leaves
    /// `Cancelled`, only confirmed appointments complete, and a no-show
    /// cannot be confirmed after the fact.
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Validating status transition from {} to {}",
            current_status, new_status
        );

        if *current_status == AppointmentStatus::Cancelled {
            warn!("Attempted status change on a cancelled appointment");
            return Err(SchedulingError::CancelledAppointmentImmutable);
        }

        if *new_status == AppointmentStatus::Completed
            && *current_status != AppointmentStatus::Confirmed
        {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(SchedulingError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        if *current_status == AppointmentStatus::NoShow
            && *new_status == AppointmentStatus::Confirmed
        {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(SchedulingError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// All statuses a given appointment status may move to.
    pub fn allowed_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        ALL_STATUSES
            .iter()
            .filter(|next| self.validate_status_transition(current_status, next).is_ok())
            .copied()
            .collect()
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
