use std::sync::Arc;

use serde_json::json;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use shared_database::{
    decode_row, Filter, RecordStore, VaccinationRecord, VaccinationWarehouse,
};
use shared_models::time::format_date;

use crate::models::{Patient, PatientError, ReconcileSummary, PATIENTS_TABLE};

enum Upserted {
    Inserted,
    Updated,
}

/// Merges the warehouse vaccination rollup into the patient store. Each row
/// commits independently under its own advisory lock, so a run is idempotent
/// and safe to repeat: re-running overwrites with the same source data.
pub struct ReconciliationService {
    store: Arc<dyn RecordStore>,
    warehouse: Arc<dyn VaccinationWarehouse>,
    deadline: Duration,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        warehouse: Arc<dyn VaccinationWarehouse>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            warehouse,
            deadline,
        }
    }

    pub async fn run(&self) -> Result<ReconcileSummary, PatientError> {
        let started = Instant::now();
        let records = self.warehouse.fetch_vaccination_counts().await?;
        let total = records.len();
        info!("Reconciling {} vaccination rollup rows", total);

        let mut summary = ReconcileSummary::default();

        for record in records {
            // Past the deadline we stop issuing row operations; committed
            // rows stay committed and the next run picks up the rest.
            if started.elapsed() >= self.deadline {
                warn!(
                    "Reconciliation deadline reached after {} of {} rows",
                    summary.processed, total
                );
                break;
            }

            match self.upsert_row(&record).await {
                Ok(Upserted::Inserted) => summary.inserted += 1,
                Ok(Upserted::Updated) => summary.updated += 1,
                Err(e) => {
                    warn!("Skipping vaccination row for {}: {}", record.no_ktp, e);
                    summary.failed += 1;
                }
            }
            summary.processed += 1;
        }

        info!(
            "Reconciliation finished: {} processed, {} inserted, {} updated, {} failed",
            summary.processed, summary.inserted, summary.updated, summary.failed
        );
        Ok(summary)
    }

    /// The lock spans the existence check and the write so a concurrent
    /// interactive edit of the same patient cannot interleave with the
    /// overwrite.
    async fn upsert_row(&self, record: &VaccinationRecord) -> Result<Upserted, PatientError> {
        let lock = self
            .store
            .acquire_row_lock(&patient_lock_key(&record.no_ktp))
            .await?;

        let result = self.upsert_locked(record).await;

        if let Err(e) = self.store.release_row_lock(lock).await {
            warn!("Failed to release patient lock for {}: {}", record.no_ktp, e);
        }

        result
    }

    async fn upsert_locked(&self, record: &VaccinationRecord) -> Result<Upserted, PatientError> {
        let existing = self
            .store
            .find_one(PATIENTS_TABLE, &[Filter::eq("no_ktp", record.no_ktp.clone())])
            .await?;

        match existing {
            Some(row) => {
                let patient: Patient = decode_row(row)?;
                self.store
                    .update(
                        PATIENTS_TABLE,
                        patient.id,
                        json!({
                            "name": record.name,
                            "birthdate": format_date(record.birthdate),
                            "vaccine_type": record.vaccine_type,
                            "vaccine_count": record.vaccine_count,
                        }),
                    )
                    .await?;
                Ok(Upserted::Updated)
            }
            None => {
                // Seeded from warehouse fields only; unlike interactive
                // registration, gender and address stay unset.
                self.store
                    .insert(
                        PATIENTS_TABLE,
                        json!({
                            "no_ktp": record.no_ktp,
                            "name": record.name,
                            "birthdate": format_date(record.birthdate),
                            "gender": null,
                            "address": null,
                            "vaccine_type": record.vaccine_type,
                            "vaccine_count": record.vaccine_count,
                        }),
                    )
                    .await?;
                Ok(Upserted::Inserted)
            }
        }
    }
}

fn patient_lock_key(no_ktp: &str) -> String {
    format!("patient:{}", no_ktp)
}
