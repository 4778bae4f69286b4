use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::{StoreError, WarehouseError};
use shared_models::time::date_format;

pub const PATIENTS_TABLE: &str = "patients";

/// A national identifier is exactly this many ASCII digits.
pub const KTP_LENGTH: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    /// 16-digit national identifier; the natural key for reconciliation.
    pub no_ktp: String,
    #[serde(with = "date_format")]
    pub birthdate: NaiveDate,
    /// Absent on rows seeded by the reconciliation job.
    pub gender: Option<String>,
    pub address: Option<String>,
    /// Owned by the reconciliation job; interactive updates never touch
    /// these.
    pub vaccine_type: Option<String>,
    pub vaccine_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub no_ktp: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub no_ktp: Option<String>,
    pub address: Option<String>,
}

/// Outcome of one reconciliation run. `processed` counts rows attempted
/// before the deadline, including the `failed` ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with this KTP already exists")]
    DuplicateKtp,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub fn validate_no_ktp(no_ktp: &str) -> Result<(), PatientError> {
    if no_ktp.len() != KTP_LENGTH || !no_ktp.chars().all(|c| c.is_ascii_digit()) {
        return Err(PatientError::Validation(format!(
            "no_ktp must be exactly {} digits",
            KTP_LENGTH
        )));
    }
    Ok(())
}
