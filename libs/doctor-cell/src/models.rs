use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::time::{date_format, time_format};

pub const DOCTORS_TABLE: &str = "doctors";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub gender: String,
    #[serde(with = "date_format")]
    pub birthdate: NaiveDate,
    /// Inclusive bookable window; appointments may start at either bound.
    #[serde(with = "time_format")]
    pub work_start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub work_end_time: NaiveTime,
}

/// Wire-format fields; required-presence and format checks happen in the
/// service so malformed input surfaces as a validation error.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
