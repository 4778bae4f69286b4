pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the model types other cells read doctors through.
pub use models::{Doctor, DoctorError};
pub use services::doctor::DoctorService;
