use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{Filter, Ordering, PostgrestStore, RecordStore, StoreError};

fn store_for(server: &MockServer) -> PostgrestStore {
    let config = AppConfig {
        store_url: server.uri(),
        store_service_key: "service-key".to_string(),
        warehouse_url: String::new(),
        warehouse_api_key: String::new(),
        reconcile_interval_hours: 24,
        reconcile_deadline_secs: 600,
    };
    PostgrestStore::new(&config)
}

#[tokio::test]
async fn get_by_id_queries_the_primary_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "name": "Dr. Ratna" }
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store.get_by_id("doctors", 7).await.unwrap().unwrap();
    assert_eq!(row["name"], "Dr. Ratna");
}

#[tokio::test]
async fn find_all_encodes_filters_order_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .and(query_param("status", "neq.CANCELLED"))
        .and(query_param("scheduled_at", "lte.2024-06-03 14:00:00"))
        .and(query_param("order", "scheduled_at.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let rows = store
        .find_all(
            "appointments",
            &[
                Filter::eq("doctor_id", 7),
                Filter::neq("status", "CANCELLED"),
                Filter::lte("scheduled_at", "2024-06-03 14:00:00"),
            ],
            Some(Ordering::desc("scheduled_at")),
            Some(1),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn insert_asks_for_the_stored_representation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/patients"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "no_ktp": "1234567890123456" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": 1, "no_ktp": "1234567890123456" }
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store
        .insert("patients", json!({ "no_ktp": "1234567890123456" }))
        .await
        .unwrap();
    assert_eq!(row["id"], 1);
}

#[tokio::test]
async fn constraint_violations_map_to_constraint_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/patients"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "duplicate key" })),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .insert("patients", json!({ "no_ktp": "1234567890123456" }))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Constraint(_));
}

#[tokio::test]
async fn update_returns_none_when_no_row_matches() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/patients"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store
        .update("patients", 9, json!({ "name": "Siti" }))
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn row_locks_insert_and_delete_lock_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/row_locks"))
        .and(body_partial_json(json!({ "lock_key": "patient:1234567890123456" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "lock_key": "patient:1234567890123456" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/row_locks"))
        .and(query_param("lock_key", "eq.patient:1234567890123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "lock_key": "patient:1234567890123456" }
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let lock = store
        .acquire_row_lock("patient:1234567890123456")
        .await
        .unwrap();
    assert_eq!(lock.key, "patient:1234567890123456");
    store.release_row_lock(lock).await.unwrap();
}

#[tokio::test]
async fn a_persistently_held_lock_times_out() {
    let server = MockServer::start().await;
    // Acquisition keeps colliding and no expired row is ever reclaimable.
    Mock::given(method("POST"))
        .and(path("/row_locks"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "duplicate key" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/row_locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.acquire_row_lock("doctor_slots:7").await.unwrap_err();
    assert_matches!(err, StoreError::LockTimeout(_));
}
