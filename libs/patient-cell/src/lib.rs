pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Patient, PatientError, ReconcileSummary};
pub use services::patient::PatientService;
pub use services::reconcile::ReconciliationService;
