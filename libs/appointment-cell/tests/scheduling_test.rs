use std::sync::Arc;

use assert_matches::assert_matches;

use appointment_cell::models::{AppointmentPatch, AppointmentStatus, CreateAppointmentRequest};
use appointment_cell::services::scheduling::AppointmentService;
use appointment_cell::SchedulingError;
use shared_database::AppContext;
use shared_utils::test_utils::{seed_appointment, seed_doctor, seed_patient, test_context};

struct Fixture {
    ctx: Arc<AppContext>,
    service: AppointmentService,
    patient_id: i64,
    doctor_id: i64,
}

/// Doctor with 09:00-17:00 working hours and one registered patient.
async fn fixture() -> Fixture {
    let ctx = test_context(vec![]);
    let doctor_id = seed_doctor(ctx.store.as_ref(), "Dr. Ratna", "09:00:00", "17:00:00").await;
    let patient_id = seed_patient(ctx.store.as_ref(), "Budi", "3174012345678901").await;
    let service = AppointmentService::new(Arc::clone(&ctx.store));
    Fixture {
        ctx,
        service,
        patient_id,
        doctor_id,
    }
}

fn booking(patient_id: i64, doctor_id: i64, scheduled_at: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id: Some(patient_id),
        doctor_id: Some(doctor_id),
        scheduled_at: Some(scheduled_at.to_string()),
        status: None,
    }
}

#[tokio::test]
async fn booking_an_open_slot_succeeds() {
    let f = fixture().await;

    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    assert_eq!(appointment.patient_id, f.patient_id);
    assert_eq!(appointment.doctor_id, f.doctor_id);
    assert_eq!(appointment.status, AppointmentStatus::InQueue);
    assert_eq!(appointment.diagnosis, "");
    assert_eq!(appointment.notes, "");
}

#[tokio::test]
async fn booking_within_spacing_of_existing_appointment_is_rejected() {
    let f = fixture().await;
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:20:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);

    // The earlier side conflicts too.
    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 13:40:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);
}

#[tokio::test]
async fn booking_past_the_spacing_threshold_succeeds() {
    let f = fixture().await;
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:31:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn spacing_boundary_is_exclusive() {
    let f = fixture().await;
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    // Exactly 30 minutes apart on both sides is allowed.
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:30:00"))
        .await
        .unwrap();
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 13:30:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn conflict_gaps_are_measured_at_minute_granularity() {
    let f = fixture().await;
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:20"))
        .await
        .unwrap();

    // 14:29 vs 14:00 at minute granularity: 29 minutes, too close.
    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:29:50"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);

    // 14:30 vs 14:00: exactly the threshold, allowed.
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:30:10"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_appointments_do_not_block_a_slot() {
    let f = fixture().await;
    seed_appointment(
        f.ctx.store.as_ref(),
        f.patient_id,
        f.doctor_id,
        "2024-06-03 14:00:00",
        "CANCELLED",
    )
    .await;

    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:10:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn booking_outside_working_hours_is_rejected() {
    let f = fixture().await;

    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 08:00:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::OutsideWorkingHours);

    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 17:30:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::OutsideWorkingHours);
}

#[tokio::test]
async fn working_hours_bounds_are_inclusive() {
    let f = fixture().await;

    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 09:00:00"))
        .await
        .unwrap();
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 17:00:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_validates_required_fields_and_formats() {
    let f = fixture().await;

    let err = f
        .service
        .create(CreateAppointmentRequest {
            patient_id: Some(f.patient_id),
            doctor_id: None,
            scheduled_at: Some("2024-06-03 10:00:00".to_string()),
            status: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::Validation(_));

    // ISO "T" separator is not the wire format.
    let err = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03T10:00:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::Validation(_));

    let err = f
        .service
        .create(CreateAppointmentRequest {
            status: Some("DELAYED".to_string()),
            ..booking(f.patient_id, f.doctor_id, "2024-06-03 10:00:00")
        })
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::Validation(_));
}

#[tokio::test]
async fn create_rejects_unknown_references() {
    let f = fixture().await;

    let err = f
        .service
        .create(booking(9999, f.doctor_id, "2024-06-03 10:00:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::PatientNotFound);

    let err = f
        .service
        .create(booking(f.patient_id, 9999, "2024-06-03 10:00:00"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::DoctorNotFound);
}

#[tokio::test]
async fn failed_booking_writes_nothing() {
    let f = fixture().await;

    let _ = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 08:00:00"))
        .await
        .unwrap_err();

    assert!(f.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn reschedule_does_not_conflict_with_itself() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    // Moving within the spacing window of its own old slot must succeed.
    let moved = f
        .service
        .update(
            appointment.id,
            AppointmentPatch {
                scheduled_at: Some("2024-06-03 14:10:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.scheduled_at.to_string(), "2024-06-03 14:10:00");

    // Re-confirming the same slot is also fine.
    f.service
        .update(
            appointment.id,
            AppointmentPatch {
                scheduled_at: Some("2024-06-03 14:10:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn reschedule_still_conflicts_with_other_appointments() {
    let f = fixture().await;
    let first = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 15:00:00"))
        .await
        .unwrap();

    let err = f
        .service
        .update(
            first.id,
            AppointmentPatch {
                scheduled_at: Some("2024-06-03 14:45:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);
}

#[tokio::test]
async fn reschedule_revalidates_working_hours() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    let err = f
        .service
        .update(
            appointment.id,
            AppointmentPatch {
                scheduled_at: Some("2024-06-03 07:00:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::OutsideWorkingHours);
}

#[tokio::test]
async fn update_is_a_true_partial_patch() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    let updated = f
        .service
        .update(
            appointment.id,
            AppointmentPatch {
                notes: Some("follow up in two weeks".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.notes, "follow up in two weeks");
    assert_eq!(updated.scheduled_at, appointment.scheduled_at);
    assert_eq!(updated.status, appointment.status);
    assert_eq!(updated.diagnosis, appointment.diagnosis);
}

#[tokio::test]
async fn any_valid_status_may_follow_any_other() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    for status in ["DONE", "IN_QUEUE", "CANCELLED", "DONE"] {
        let updated = f
            .service
            .update(
                appointment.id,
                AppointmentPatch {
                    status: Some(status.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status.as_str(), status);
    }
}

#[tokio::test]
async fn invalid_status_value_is_rejected() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    let err = f
        .service
        .update(
            appointment.id,
            AppointmentPatch {
                status: Some("DELAYED".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::Validation(_));
}

#[tokio::test]
async fn get_update_delete_report_missing_appointments() {
    let f = fixture().await;

    assert_matches!(
        f.service.get(42).await.unwrap_err(),
        SchedulingError::NotFound
    );
    assert_matches!(
        f.service
            .update(42, AppointmentPatch::default())
            .await
            .unwrap_err(),
        SchedulingError::NotFound
    );
    assert_matches!(
        f.service.delete(42).await.unwrap_err(),
        SchedulingError::NotFound
    );
}

#[tokio::test]
async fn delete_is_a_hard_remove() {
    let f = fixture().await;
    let appointment = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();

    f.service.delete(appointment.id).await.unwrap();
    assert_matches!(
        f.service.get(appointment.id).await.unwrap_err(),
        SchedulingError::NotFound
    );

    // The slot opens up again.
    f.service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_bookings_for_overlapping_slots_admit_only_one() {
    let f = fixture().await;

    let first = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:00:00"));
    let second = f
        .service
        .create(booking(f.patient_id, f.doctor_id, "2024-06-03 14:10:00"));

    let (a, b) = tokio::join!(first, second);
    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);

    assert_eq!(f.service.list().await.unwrap().len(), 1);
}
