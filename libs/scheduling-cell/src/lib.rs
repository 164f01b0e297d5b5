// libs/scheduling-cell/src/lib.rs
//! # Scheduling Cell
//!
//! Recurring-appointment scheduling: recurrence rules are expanded into
//! bounded sequences of concrete appointments, each checked against the
//! professional's existing bookings before it is persisted.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Scheduling Cell                     |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Data structures & DTOs           |
//! |  services/      |  Business logic layer             |
//! |    recurrence.rs|  Rule -> candidate slot expansion |
//! |    conflict.rs  |  Booking overlap detection        |
//! |    generation.rs|  Candidate materialization        |
//! |    recurring.rs |  Rule lifecycle orchestration     |
//! |    lifecycle.rs |  Appointment status machine       |
//! |    booking.rs   |  Standalone appointment booking   |
//! |  stores/        |  Persistence interfaces + Supabase|
//! +-----------------------------------------------------+
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod stores;

// Re-export commonly used types
pub use models::{
    AppointmentInstance, AppointmentStatus, CandidateOutcome, CandidateSlot,
    GenerationLimits, GenerationReport, RecurrenceEnd, RecurrencePattern,
    RecurringAppointment, SchedulingError,
};

pub use services::{
    AppointmentBookingService, AppointmentGenerationService, AppointmentLifecycleService,
    ConflictDetectionService, RecurrenceExpansionService, RecurringAppointmentService,
};

pub use router::scheduling_routes;
