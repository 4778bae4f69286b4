use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::time::datetime_format;

pub const APPOINTMENTS_TABLE: &str = "appointments";

/// Two non-cancelled appointments for one doctor must be at least this far
/// apart. The boundary is exclusive on the "too close" side: exactly this
/// many minutes apart is allowed.
pub const MIN_SLOT_SPACING_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(with = "datetime_format")]
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub notes: String,
}

/// Flat status set; any value may follow any other. There is no transition
/// graph to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    InQueue,
    Done,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_QUEUE" => Some(AppointmentStatus::InQueue),
            "DONE" => Some(AppointmentStatus::Done),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::InQueue => "IN_QUEUE",
            AppointmentStatus::Done => "DONE",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-format booking request. Required-presence, timestamp parsing and
/// status membership are checked in the service so failures surface as
/// validation errors rather than body-rejection noise.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub scheduled_at: Option<String>,
    pub status: Option<String>,
}

/// True partial patch: a present field overwrites, an absent field is left
/// untouched. There is no "explicitly cleared" channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub scheduled_at: Option<String>,
    pub status: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is already booked around this time")]
    SlotTaken,

    #[error("Appointment time is outside of doctor's working hours")]
    OutsideWorkingHours,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
