use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use practitioner_cell::AvailabilityService;

use crate::models::{AppointmentError, AvailabilityCheckResponse};
use crate::services::conflict::{find_conflicts, TimeRange};
use crate::services::store::AppointmentStore;

/// Full booking check: the practitioner's weekly template must cover the
/// session and no active appointment may overlap it.
pub struct BookingAvailabilityService {
    store: Arc<dyn AppointmentStore>,
    schedules: Arc<AvailabilityService>,
}

impl BookingAvailabilityService {
    pub fn new(store: Arc<dyn AppointmentStore>, schedules: Arc<AvailabilityService>) -> Self {
        Self { store, schedules }
    }

    pub async fn check(
        &self,
        practitioner_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<AvailabilityCheckResponse, AppointmentError> {
        let range = TimeRange::of(start_time, duration_minutes)?;

        let within_schedule = self
            .schedules
            .check_session_fits(practitioner_id, range.start, range.end)
            .await?;

        let existing = self
            .store
            .find_active_for_practitioner(practitioner_id, &range, None)
            .await?;
        let conflicting_appointments: Vec<_> = find_conflicts(practitioner_id, &range, None, &existing)
            .into_iter()
            .cloned()
            .collect();
        let has_conflict = !conflicting_appointments.is_empty();

        debug!(
            "Availability for practitioner {} at {}: schedule={} conflicts={}",
            practitioner_id,
            start_time,
            within_schedule,
            conflicting_appointments.len()
        );

        Ok(AvailabilityCheckResponse {
            available: within_schedule && !has_conflict,
            within_schedule,
            has_conflict,
            conflicting_appointments,
        })
    }
}
