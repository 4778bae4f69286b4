use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared_database::AppContext;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest};
use crate::services::doctor::DoctorService;

pub async fn create_doctor(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Doctor>), AppError> {
    let service = DoctorService::new(Arc::clone(&ctx.store));
    let doctor = service.create(request).await.map_err(doctor_error)?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn get_doctor(
    State(ctx): State<Arc<AppContext>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Doctor>, AppError> {
    let service = DoctorService::new(Arc::clone(&ctx.store));
    let doctor = service.get(doctor_id).await.map_err(doctor_error)?;
    Ok(Json(doctor))
}

pub async fn list_doctors(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let service = DoctorService::new(Arc::clone(&ctx.store));
    let doctors = service.list().await.map_err(doctor_error)?;
    Ok(Json(doctors))
}

pub async fn update_doctor(
    State(ctx): State<Arc<AppContext>>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Doctor>, AppError> {
    let service = DoctorService::new(Arc::clone(&ctx.store));
    let doctor = service
        .update(doctor_id, request)
        .await
        .map_err(doctor_error)?;
    Ok(Json(doctor))
}

pub async fn delete_doctor(
    State(ctx): State<Arc<AppContext>>,
    Path(doctor_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let service = DoctorService::new(Arc::clone(&ctx.store));
    service.delete(doctor_id).await.map_err(doctor_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound(err.to_string()),
        DoctorError::Validation(msg) => AppError::Validation(msg),
        DoctorError::Store(e) => AppError::Store(e.to_string()),
    }
}
