use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde_json::Value;
use tracing::debug;

use shared_database::{decode_row, Filter, Ordering, RecordStore};
use shared_models::time::format_datetime;

use crate::models::{
    Appointment, AppointmentStatus, SchedulingError, APPOINTMENTS_TABLE, MIN_SLOT_SPACING_MINUTES,
};

enum Side {
    Before,
    After,
}

pub struct SlotAvailabilityService {
    store: Arc<dyn RecordStore>,
}

impl SlotAvailabilityService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Two-sided nearest-neighbor check: the proposed instant is bookable
    /// unless a non-cancelled appointment for the same doctor sits strictly
    /// closer than the minimum spacing on either side. Gaps are measured at
    /// minute granularity; a neighbor exactly at the spacing boundary is not
    /// a conflict, and a missing neighbor on a side never is.
    ///
    /// `exclude_appointment_id` keeps a reschedule from conflicting with the
    /// appointment being moved.
    pub async fn is_available(
        &self,
        doctor_id: i64,
        proposed: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
    ) -> Result<bool, SchedulingError> {
        let slot = truncate_to_minute(proposed);
        let min_gap = Duration::minutes(MIN_SLOT_SPACING_MINUTES);

        if let Some(previous) = self
            .nearest(doctor_id, slot, exclude_appointment_id, Side::Before)
            .await?
        {
            if slot - previous < min_gap {
                debug!(
                    "Slot {} for doctor {} conflicts with earlier appointment at {}",
                    slot, doctor_id, previous
                );
                return Ok(false);
            }
        }

        if let Some(next) = self
            .nearest(doctor_id, slot, exclude_appointment_id, Side::After)
            .await?
        {
            if next - slot < min_gap {
                debug!(
                    "Slot {} for doctor {} conflicts with later appointment at {}",
                    slot, doctor_id, next
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn nearest(
        &self,
        doctor_id: i64,
        slot: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
        side: Side,
    ) -> Result<Option<NaiveDateTime>, SchedulingError> {
        let mut filters = vec![
            Filter::eq("doctor_id", doctor_id),
            Filter::neq("status", AppointmentStatus::Cancelled.as_str()),
            match side {
                Side::Before => Filter::lte("scheduled_at", format_datetime(slot)),
                Side::After => Filter::gte("scheduled_at", format_datetime(slot)),
            },
        ];
        if let Some(id) = exclude_appointment_id {
            filters.push(Filter::neq("id", id));
        }

        let order = match side {
            Side::Before => Ordering::desc("scheduled_at"),
            Side::After => Ordering::asc("scheduled_at"),
        };

        let rows: Vec<Value> = self
            .store
            .find_all(APPOINTMENTS_TABLE, &filters, Some(order), Some(1))
            .await?;

        match rows.into_iter().next() {
            Some(row) => {
                let appointment: Appointment = decode_row(row)?;
                Ok(Some(truncate_to_minute(appointment.scheduled_at)))
            }
            None => Ok(None),
        }
    }
}

/// Seconds are accepted on input but ignored for conflict purposes.
pub(crate) fn truncate_to_minute(value: NaiveDateTime) -> NaiveDateTime {
    value.with_second(0).unwrap_or(value)
}
