//! Helpers shared by the cell test suites: an `AppContext` wired to the
//! in-memory store, a canned warehouse, and row seeders shaped like the
//! production tables.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shared_config::AppConfig;
use shared_database::{
    AppContext, MemoryStore, RecordStore, VaccinationRecord, VaccinationWarehouse, WarehouseError,
};

/// Warehouse stub returning a fixed rollup on every fetch.
pub struct StaticWarehouse {
    records: Vec<VaccinationRecord>,
}

impl StaticWarehouse {
    pub fn new(records: Vec<VaccinationRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VaccinationWarehouse for StaticWarehouse {
    async fn fetch_vaccination_counts(&self) -> Result<Vec<VaccinationRecord>, WarehouseError> {
        Ok(self.records.clone())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        store_url: String::new(),
        store_service_key: String::new(),
        warehouse_url: String::new(),
        warehouse_api_key: String::new(),
        reconcile_interval_hours: 24,
        reconcile_deadline_secs: 600,
    }
}

/// Context backed by a fresh `MemoryStore` and the given warehouse rollup.
pub fn test_context(warehouse_records: Vec<VaccinationRecord>) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(StaticWarehouse::new(warehouse_records)),
    ))
}

pub async fn seed_doctor(
    store: &dyn RecordStore,
    name: &str,
    work_start_time: &str,
    work_end_time: &str,
) -> i64 {
    let row = store
        .insert(
            "doctors",
            json!({
                "name": name,
                "gender": "F",
                "birthdate": "1985-04-12",
                "work_start_time": work_start_time,
                "work_end_time": work_end_time,
            }),
        )
        .await
        .expect("seed doctor");
    row["id"].as_i64().expect("doctor id")
}

pub async fn seed_patient(store: &dyn RecordStore, name: &str, no_ktp: &str) -> i64 {
    let row = store
        .insert(
            "patients",
            json!({
                "name": name,
                "gender": "M",
                "birthdate": "1990-01-20",
                "no_ktp": no_ktp,
                "address": "Jl. Kenanga 5",
                "vaccine_type": null,
                "vaccine_count": null,
            }),
        )
        .await
        .expect("seed patient");
    row["id"].as_i64().expect("patient id")
}

pub async fn seed_appointment(
    store: &dyn RecordStore,
    patient_id: i64,
    doctor_id: i64,
    scheduled_at: &str,
    status: &str,
) -> i64 {
    let row = store
        .insert(
            "appointments",
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": scheduled_at,
                "status": status,
                "diagnosis": "",
                "notes": "",
            }),
        )
        .await
        .expect("seed appointment");
    row["id"].as_i64().expect("appointment id")
}
