use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{seed_doctor, seed_patient, test_context};

async fn test_app() -> (Router, i64, i64) {
    let ctx = test_context(vec![]);
    let doctor_id = seed_doctor(ctx.store.as_ref(), "Dr. Sari", "09:00:00", "17:00:00").await;
    let patient_id = seed_patient(ctx.store.as_ref(), "Agus", "3174019876543210").await;
    (appointment_routes(ctx), patient_id, doctor_id)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn booking_endpoint_returns_created_appointment() {
    let (app, patient_id, doctor_id) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/",
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": "2024-06-03 10:00:00",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["status"], "IN_QUEUE");
    assert_eq!(body["scheduled_at"], "2024-06-03 10:00:00");
}

#[tokio::test]
async fn missing_fields_surface_as_bad_request() {
    let (app, patient_id, _) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/",
            json!({
                "patient_id": patient_id,
                "scheduled_at": "2024-06-03 10:00:00",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("doctor_id"));
}

#[tokio::test]
async fn conflicting_booking_surfaces_as_conflict() {
    let (app, patient_id, doctor_id) = test_app().await;

    let first = app
        .clone()
        .oneshot(post_json(
            "/",
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": "2024-06-03 10:00:00",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(post_json(
            "/",
            json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": "2024-06-03 10:15:00",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_appointment_surfaces_as_not_found() {
    let (app, _, _) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
