use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_database::AppContext;

pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(|| async { "Klinik API is running!" }))
        .nest("/appointments", appointment_routes(ctx.clone()))
        .nest("/patients", patient_routes(ctx.clone()))
        .nest("/doctors", doctor_routes(ctx))
}
