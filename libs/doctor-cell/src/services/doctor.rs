use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Map, Value};
use tracing::debug;

use shared_database::{decode_row, RecordStore};
use shared_models::time::{format_date, format_time, parse_date, parse_time};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest, DOCTORS_TABLE};

pub struct DoctorService {
    store: Arc<dyn RecordStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        let name = required(request.name, "name")?;
        let gender = required(request.gender, "gender")?;
        let birthdate = parse_birthdate(&required(request.birthdate, "birthdate")?)?;
        let work_start_time = parse_work_time(&required(request.work_start_time, "work_start_time")?)?;
        let work_end_time = parse_work_time(&required(request.work_end_time, "work_end_time")?)?;

        validate_working_window(work_start_time, work_end_time)?;

        debug!("Creating doctor: {}", name);

        let stored = self
            .store
            .insert(
                DOCTORS_TABLE,
                json!({
                    "name": name,
                    "gender": gender,
                    "birthdate": format_date(birthdate),
                    "work_start_time": format_time(work_start_time),
                    "work_end_time": format_time(work_end_time),
                }),
            )
            .await?;

        Ok(decode_row(stored)?)
    }

    pub async fn get(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        let row = self
            .store
            .get_by_id(DOCTORS_TABLE, doctor_id)
            .await?
            .ok_or(DoctorError::NotFound)?;
        Ok(decode_row(row)?)
    }

    pub async fn list(&self) -> Result<Vec<Doctor>, DoctorError> {
        let rows = self.store.find_all(DOCTORS_TABLE, &[], None, None).await?;
        rows.into_iter()
            .map(|row| decode_row(row).map_err(DoctorError::from))
            .collect()
    }

    pub async fn update(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        let existing = self.get(doctor_id).await?;

        let mut changes = Map::new();
        if let Some(name) = request.name {
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(gender) = request.gender {
            changes.insert("gender".to_string(), json!(gender));
        }
        if let Some(raw) = request.birthdate {
            let birthdate = parse_birthdate(&raw)?;
            changes.insert("birthdate".to_string(), json!(format_date(birthdate)));
        }

        // The window stays consistent across a partial patch: validate the
        // patched bound against the untouched one.
        let work_start_time = match request.work_start_time {
            Some(raw) => parse_work_time(&raw)?,
            None => existing.work_start_time,
        };
        let work_end_time = match request.work_end_time {
            Some(raw) => parse_work_time(&raw)?,
            None => existing.work_end_time,
        };
        validate_working_window(work_start_time, work_end_time)?;

        if work_start_time != existing.work_start_time {
            changes.insert(
                "work_start_time".to_string(),
                json!(format_time(work_start_time)),
            );
        }
        if work_end_time != existing.work_end_time {
            changes.insert(
                "work_end_time".to_string(),
                json!(format_time(work_end_time)),
            );
        }

        if changes.is_empty() {
            return Ok(existing);
        }

        debug!("Updating doctor {}", doctor_id);

        let updated = self
            .store
            .update(DOCTORS_TABLE, doctor_id, Value::Object(changes))
            .await?
            .ok_or(DoctorError::NotFound)?;
        Ok(decode_row(updated)?)
    }

    pub async fn delete(&self, doctor_id: i64) -> Result<(), DoctorError> {
        let removed = self.store.delete(DOCTORS_TABLE, doctor_id).await?;
        if !removed {
            return Err(DoctorError::NotFound);
        }
        debug!("Deleted doctor {}", doctor_id);
        Ok(())
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, DoctorError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DoctorError::Validation(format!("{} is required", field))),
    }
}

fn parse_birthdate(raw: &str) -> Result<NaiveDate, DoctorError> {
    parse_date(raw)
        .map_err(|_| DoctorError::Validation("birthdate must be formatted as YYYY-MM-DD".into()))
}

fn parse_work_time(raw: &str) -> Result<NaiveTime, DoctorError> {
    parse_time(raw)
        .map_err(|_| DoctorError::Validation("working hours must be formatted as HH:MM:SS".into()))
}

fn validate_working_window(start: NaiveTime, end: NaiveTime) -> Result<(), DoctorError> {
    if start >= end {
        return Err(DoctorError::Validation(
            "work_start_time must be before work_end_time".into(),
        ));
    }
    Ok(())
}
