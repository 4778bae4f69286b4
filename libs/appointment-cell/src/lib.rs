pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentPatch, AppointmentStatus, SchedulingError};
pub use services::availability::SlotAvailabilityService;
pub use services::scheduling::AppointmentService;
