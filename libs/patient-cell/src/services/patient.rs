use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::debug;

use shared_database::{decode_row, Filter, RecordStore};
use shared_models::time::{format_date, parse_date};

use crate::models::{
    validate_no_ktp, CreatePatientRequest, Patient, PatientError, UpdatePatientRequest,
    PATIENTS_TABLE,
};

pub struct PatientService {
    store: Arc<dyn RecordStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let name = required(request.name, "name")?;
        let gender = required(request.gender, "gender")?;
        let birthdate = parse_birthdate(&required(request.birthdate, "birthdate")?)?;
        let no_ktp = required(request.no_ktp, "no_ktp")?;
        let address = required(request.address, "address")?;

        validate_no_ktp(&no_ktp)?;

        if self.find_by_ktp(&no_ktp).await?.is_some() {
            return Err(PatientError::DuplicateKtp);
        }

        debug!("Registering patient with KTP {}", no_ktp);

        let stored = self
            .store
            .insert(
                PATIENTS_TABLE,
                json!({
                    "name": name,
                    "gender": gender,
                    "birthdate": format_date(birthdate),
                    "no_ktp": no_ktp,
                    "address": address,
                    "vaccine_type": null,
                    "vaccine_count": null,
                }),
            )
            .await?;

        Ok(decode_row(stored)?)
    }

    pub async fn get(&self, patient_id: i64) -> Result<Patient, PatientError> {
        let row = self
            .store
            .get_by_id(PATIENTS_TABLE, patient_id)
            .await?
            .ok_or(PatientError::NotFound)?;
        Ok(decode_row(row)?)
    }

    pub async fn list(&self) -> Result<Vec<Patient>, PatientError> {
        let rows = self.store.find_all(PATIENTS_TABLE, &[], None, None).await?;
        rows.into_iter()
            .map(|row| decode_row(row).map_err(PatientError::from))
            .collect()
    }

    pub async fn update(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let existing = self.get(patient_id).await?;

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
        if let Some(no_ktp) = request.no_ktp {
            validate_no_ktp(&no_ktp)?;
            if no_ktp != existing.no_ktp && self.find_by_ktp(&no_ktp).await?.is_some() {
                return Err(PatientError::DuplicateKtp);
            }
            changes.insert("no_ktp".to_string(), json!(no_ktp));
        }
        if let Some(address) = request.address {
            changes.insert("address".to_string(), json!(address));
        }

        if changes.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update(PATIENTS_TABLE, patient_id, Value::Object(changes))
            .await?
            .ok_or(PatientError::NotFound)?;
        Ok(decode_row(updated)?)
    }

    pub async fn delete(&self, patient_id: i64) -> Result<(), PatientError> {
        let removed = self.store.delete(PATIENTS_TABLE, patient_id).await?;
        if !removed {
            return Err(PatientError::NotFound);
        }
        debug!("Deleted patient {}", patient_id);
        Ok(())
    }

    async fn find_by_ktp(&self, no_ktp: &str) -> Result<Option<Value>, PatientError> {
        Ok(self
            .store
            .find_one(PATIENTS_TABLE, &[Filter::eq("no_ktp", no_ktp)])
            .await?)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, PatientError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PatientError::Validation(format!("{} is required", field))),
    }
}

fn parse_birthdate(raw: &str) -> Result<NaiveDate, PatientError> {
    parse_date(raw)
        .map_err(|_| PatientError::Validation("birthdate must be formatted as YYYY-MM-DD".into()))
}
