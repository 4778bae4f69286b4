use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio::time::Duration;

use shared_database::AppContext;
use shared_models::error::AppError;

use crate::models::{
    CreatePatientRequest, Patient, PatientError, ReconcileSummary, UpdatePatientRequest,
};
use crate::services::patient::PatientService;
use crate::services::reconcile::ReconciliationService;

pub async fn create_patient(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let service = PatientService::new(Arc::clone(&ctx.store));
    let patient = service.create(request).await.map_err(patient_error)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn get_patient(
    State(ctx): State<Arc<AppContext>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Patient>, AppError> {
    let service = PatientService::new(Arc::clone(&ctx.store));
    let patient = service.get(patient_id).await.map_err(patient_error)?;
    Ok(Json(patient))
}

pub async fn list_patients(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let service = PatientService::new(Arc::clone(&ctx.store));
    let patients = service.list().await.map_err(patient_error)?;
    Ok(Json(patients))
}

pub async fn update_patient(
    State(ctx): State<Arc<AppContext>>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, AppError> {
    let service = PatientService::new(Arc::clone(&ctx.store));
    let patient = service
        .update(patient_id, request)
        .await
        .map_err(patient_error)?;
    Ok(Json(patient))
}

pub async fn delete_patient(
    State(ctx): State<Arc<AppContext>>,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let service = PatientService::new(Arc::clone(&ctx.store));
    service.delete(patient_id).await.map_err(patient_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// On-demand reconciliation run; the scheduled job calls the same service,
/// so triggering it twice is harmless.
pub async fn run_reconciliation(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<ReconcileSummary>, AppError> {
    let service = ReconciliationService::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.warehouse),
        Duration::from_secs(ctx.config.reconcile_deadline_secs),
    );
    let summary = service.run().await.map_err(patient_error)?;
    Ok(Json(summary))
}

fn patient_error(err: PatientError) -> AppError {
    match err {
        PatientError::NotFound => AppError::NotFound(err.to_string()),
        PatientError::DuplicateKtp => AppError::Conflict(err.to_string()),
        PatientError::Validation(msg) => AppError::Validation(msg),
        PatientError::Warehouse(e) => AppError::Internal(e.to_string()),
        PatientError::Store(e) => AppError::Store(e.to_string()),
    }
}
