// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentInstance, AppointmentStatus, CreateAppointmentRequest, NewAppointmentInstance,
    SchedulingError, UpdateAppointmentStatusRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::stores::{
    AppointmentStore, ReferenceDirectory, SupabaseAppointmentStore, SupabaseReferenceDirectory,
};

/// Standalone appointment booking, outside of any recurrence rule.
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ReferenceDirectory>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ReferenceDirectory>,
    ) -> Self {
        let conflict_service = ConflictDetectionService::new(Arc::clone(&appointments));
        Self {
            appointments,
            directory,
            conflict_service,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
            Arc::new(SupabaseReferenceDirectory::new(supabase)),
        )
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    /// Book a single appointment. Unlike batch generation, a direct booking
    /// that hits an occupied slot is a hard failure.
    pub async fn book_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        info!(
            "Booking appointment for patient {} with professional {}",
            request.patient_id, request.professional_id
        );

        if request.start_time >= request.end_time {
            return Err(SchedulingError::ValidationError(
                "Appointment must end after it starts".to_string(),
            ));
        }
        if request.start_time <= Utc::now() {
            return Err(SchedulingError::ValidationError(
                "Appointment must be scheduled in the future".to_string(),
            ));
        }

        if !self
            .directory
            .patient_exists(request.patient_id, auth_token)
            .await?
        {
            return Err(SchedulingError::PatientNotFound);
        }
        if !self
            .directory
            .professional_exists(request.professional_id, auth_token)
            .await?
        {
            return Err(SchedulingError::ProfessionalNotFound);
        }
        if !self
            .directory
            .appointment_type_exists(request.appointment_type_id, auth_token)
            .await?
        {
            return Err(SchedulingError::AppointmentTypeNotFound);
        }

        let has_conflict = self
            .conflict_service
            .has_conflict(
                request.professional_id,
                request.start_time,
                request.end_time,
                None,
                auth_token,
            )
            .await?;
        if has_conflict {
            return Err(SchedulingError::ConflictDetected);
        }

        let new_instance = NewAppointmentInstance {
            recurring_appointment_id: None,
            patient_id: request.patient_id,
            professional_id: request.professional_id,
            appointment_type_id: request.appointment_type_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: AppointmentStatus::Requested,
            notes: request.notes,
            modified_by: request.modified_by,
        };

        let appointment = self.appointments.insert(new_instance, auth_token).await?;

        info!("Appointment {} booked successfully", appointment.id);
        Ok(appointment)
    }

    /// Move an appointment through the status machine.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentStatusRequest,
        auth_token: &str,
    ) -> Result<AppointmentInstance, SchedulingError> {
        debug!(
            "Updating status of appointment {} to {}",
            appointment_id, request.status
        );

        let current = self
            .appointments
            .find_by_id(appointment_id, auth_token)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound)?;

        self.lifecycle_service
            .validate_status_transition(&current.status, &request.status)?;

        self.appointments
            .update_status(
                appointment_id,
                request.status,
                request.reason.as_deref(),
                request.modified_by,
                auth_token,
            )
            .await
    }
}
