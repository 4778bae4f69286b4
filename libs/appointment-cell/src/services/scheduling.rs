use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use doctor_cell::models::{Doctor, DOCTORS_TABLE};
use shared_database::{decode_row, RecordStore};
use shared_models::time::{format_datetime, parse_datetime};

use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, CreateAppointmentRequest, SchedulingError,
    APPOINTMENTS_TABLE,
};
use crate::services::availability::SlotAvailabilityService;

const PATIENTS_TABLE: &str = "patients";

/// Orchestrates the appointment lifecycle. Every check that can fail runs
/// before the first write, and the availability check plus the write it
/// guards run under a per-doctor advisory lock so two concurrent bookings
/// cannot both pass the check.
pub struct AppointmentService {
    store: Arc<dyn RecordStore>,
    availability: SlotAvailabilityService,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let availability = SlotAvailabilityService::new(Arc::clone(&store));
        Self {
            store,
            availability,
        }
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let patient_id = request
            .patient_id
            .ok_or_else(|| SchedulingError::Validation("patient_id is required".into()))?;
        let doctor_id = request
            .doctor_id
            .ok_or_else(|| SchedulingError::Validation("doctor_id is required".into()))?;
        let raw_scheduled_at = request
            .scheduled_at
            .ok_or_else(|| SchedulingError::Validation("scheduled_at is required".into()))?;
        let scheduled_at = parse_schedule(&raw_scheduled_at)?;
        let status = match request.status {
            Some(raw) => parse_status(&raw)?,
            None => AppointmentStatus::InQueue,
        };

        self.ensure_patient_exists(patient_id).await?;
        let doctor = self.load_doctor(doctor_id).await?;
        check_working_hours(&doctor, scheduled_at)?;

        let lock = self.store.acquire_row_lock(&doctor_slot_key(doctor_id)).await?;
        let result = self
            .insert_checked(patient_id, doctor_id, scheduled_at, status)
            .await;
        self.release(lock).await;
        result
    }

    pub async fn get(&self, appointment_id: i64) -> Result<Appointment, SchedulingError> {
        let row = self
            .store
            .get_by_id(APPOINTMENTS_TABLE, appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        Ok(decode_row(row)?)
    }

    pub async fn list(&self) -> Result<Vec<Appointment>, SchedulingError> {
        let rows = self
            .store
            .find_all(APPOINTMENTS_TABLE, &[], None, None)
            .await?;
        rows.into_iter()
            .map(|row| decode_row(row).map_err(SchedulingError::from))
            .collect()
    }

    pub async fn update(
        &self,
        appointment_id: i64,
        patch: AppointmentPatch,
    ) -> Result<Appointment, SchedulingError> {
        let existing = self.get(appointment_id).await?;

        // Assemble and validate the full patch before taking any lock so a
        // failing check leaves nothing half-written.
        let mut changes = Map::new();

        if let Some(patient_id) = patch.patient_id {
            self.ensure_patient_exists(patient_id).await?;
            changes.insert("patient_id".to_string(), json!(patient_id));
        }

        let reschedule = patch.doctor_id.is_some() || patch.scheduled_at.is_some();
        let doctor_id = patch.doctor_id.unwrap_or(existing.doctor_id);
        let scheduled_at = match &patch.scheduled_at {
            Some(raw) => parse_schedule(raw)?,
            None => existing.scheduled_at,
        };

        if let Some(new_doctor_id) = patch.doctor_id {
            changes.insert("doctor_id".to_string(), json!(new_doctor_id));
        }
        if patch.scheduled_at.is_some() {
            changes.insert(
                "scheduled_at".to_string(),
                json!(format_datetime(scheduled_at)),
            );
        }
        if let Some(raw) = &patch.status {
            let status = parse_status(raw)?;
            changes.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(diagnosis) = patch.diagnosis {
            changes.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(notes) = patch.notes {
            changes.insert("notes".to_string(), json!(notes));
        }

        if changes.is_empty() {
            return Ok(existing);
        }

        if !reschedule {
            return self.apply_update(appointment_id, changes).await;
        }

        // Moving the slot (or the doctor) re-runs the same conflict and
        // working-hours checks as a fresh booking, excluding this
        // appointment's own id so it cannot conflict with itself.
        let doctor = self.load_doctor(doctor_id).await?;
        check_working_hours(&doctor, scheduled_at)?;

        let lock = self.store.acquire_row_lock(&doctor_slot_key(doctor_id)).await?;
        let result = self
            .update_checked(appointment_id, doctor_id, scheduled_at, changes)
            .await;
        self.release(lock).await;
        result
    }

    pub async fn delete(&self, appointment_id: i64) -> Result<(), SchedulingError> {
        let removed = self.store.delete(APPOINTMENTS_TABLE, appointment_id).await?;
        if !removed {
            return Err(SchedulingError::NotFound);
        }
        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    async fn insert_checked(
        &self,
        patient_id: i64,
        doctor_id: i64,
        scheduled_at: NaiveDateTime,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        if !self
            .availability
            .is_available(doctor_id, scheduled_at, None)
            .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        let stored = self
            .store
            .insert(
                APPOINTMENTS_TABLE,
                json!({
                    "patient_id": patient_id,
                    "doctor_id": doctor_id,
                    "scheduled_at": format_datetime(scheduled_at),
                    "status": status.as_str(),
                    "diagnosis": "",
                    "notes": "",
                }),
            )
            .await?;

        let appointment: Appointment = decode_row(stored)?;
        info!(
            "Booked appointment {} for doctor {} at {}",
            appointment.id, doctor_id, appointment.scheduled_at
        );
        Ok(appointment)
    }

    async fn update_checked(
        &self,
        appointment_id: i64,
        doctor_id: i64,
        scheduled_at: NaiveDateTime,
        changes: Map<String, Value>,
    ) -> Result<Appointment, SchedulingError> {
        if !self
            .availability
            .is_available(doctor_id, scheduled_at, Some(appointment_id))
            .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        self.apply_update(appointment_id, changes).await
    }

    async fn apply_update(
        &self,
        appointment_id: i64,
        changes: Map<String, Value>,
    ) -> Result<Appointment, SchedulingError> {
        let updated = self
            .store
            .update(APPOINTMENTS_TABLE, appointment_id, Value::Object(changes))
            .await?
            .ok_or(SchedulingError::NotFound)?;

        let appointment: Appointment = decode_row(updated)?;
        debug!("Updated appointment {}", appointment_id);
        Ok(appointment)
    }

    async fn ensure_patient_exists(&self, patient_id: i64) -> Result<(), SchedulingError> {
        self.store
            .get_by_id(PATIENTS_TABLE, patient_id)
            .await?
            .ok_or(SchedulingError::PatientNotFound)?;
        Ok(())
    }

    async fn load_doctor(&self, doctor_id: i64) -> Result<Doctor, SchedulingError> {
        let row = self
            .store
            .get_by_id(DOCTORS_TABLE, doctor_id)
            .await?
            .ok_or(SchedulingError::DoctorNotFound)?;
        Ok(decode_row(row)?)
    }

    async fn release(&self, lock: shared_database::RowLock) {
        // An unreleased lock row expires on its own.
        if let Err(e) = self.store.release_row_lock(lock).await {
            warn!("Failed to release doctor slot lock: {}", e);
        }
    }
}

fn doctor_slot_key(doctor_id: i64) -> String {
    format!("doctor_slots:{}", doctor_id)
}

fn parse_schedule(raw: &str) -> Result<NaiveDateTime, SchedulingError> {
    parse_datetime(raw).map_err(|_| {
        SchedulingError::Validation("scheduled_at must be formatted as YYYY-MM-DD HH:MM:SS".into())
    })
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, SchedulingError> {
    AppointmentStatus::parse(raw)
        .ok_or_else(|| SchedulingError::Validation(format!("invalid status value: {}", raw)))
}

/// Both bounds of the doctor's window are bookable.
fn check_working_hours(doctor: &Doctor, scheduled_at: NaiveDateTime) -> Result<(), SchedulingError> {
    let time_of_day = scheduled_at.time();
    if time_of_day < doctor.work_start_time || time_of_day > doctor.work_end_time {
        return Err(SchedulingError::OutsideWorkingHours);
    }
    Ok(())
}
