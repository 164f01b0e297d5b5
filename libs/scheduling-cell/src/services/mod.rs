// libs/scheduling-cell/src/services/mod.rs

pub mod booking;
pub mod conflict;
pub mod generation;
pub mod lifecycle;
pub mod recurrence;
pub mod recurring;

pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use generation::AppointmentGenerationService;
pub use lifecycle::AppointmentLifecycleService;
pub use recurrence::RecurrenceExpansionService;
pub use recurring::RecurringAppointmentService;
