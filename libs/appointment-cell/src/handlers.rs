use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared_database::AppContext;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentPatch, CreateAppointmentRequest, SchedulingError,
};
use crate::services::scheduling::AppointmentService;

pub async fn create_appointment(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    let appointment = service.create(request).await.map_err(scheduling_error)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn get_appointment(
    State(ctx): State<Arc<AppContext>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    let appointment = service.get(appointment_id).await.map_err(scheduling_error)?;
    Ok(Json(appointment))
}

pub async fn list_appointments(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    let appointments = service.list().await.map_err(scheduling_error)?;
    Ok(Json(appointments))
}

pub async fn update_appointment(
    State(ctx): State<Arc<AppContext>>,
    Path(appointment_id): Path<i64>,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<Appointment>, AppError> {
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    let appointment = service
        .update(appointment_id, patch)
        .await
        .map_err(scheduling_error)?;
    Ok(Json(appointment))
}

pub async fn delete_appointment(
    State(ctx): State<Arc<AppContext>>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    service
        .delete(appointment_id)
        .await
        .map_err(scheduling_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn scheduling_error(err: SchedulingError) -> AppError {
    match err {
        SchedulingError::NotFound
        | SchedulingError::PatientNotFound
        | SchedulingError::DoctorNotFound => AppError::NotFound(err.to_string()),
        SchedulingError::SlotTaken | SchedulingError::OutsideWorkingHours => {
            AppError::Conflict(err.to_string())
        }
        SchedulingError::Validation(msg) => AppError::Validation(msg),
        SchedulingError::Store(e) => AppError::Store(e.to_string()),
    }
}
