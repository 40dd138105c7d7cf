use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError};

pub const MIN_DURATION_MINUTES: i32 = 15;

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn of(start: DateTime<Utc>, duration_minutes: i32) -> Result<Self, AppointmentError> {
        if duration_minutes < MIN_DURATION_MINUTES {
            return Err(AppointmentError::Validation(format!(
                "duration must be at least {} minutes",
                MIN_DURATION_MINUTES
            )));
        }

        Ok(Self {
            start,
            end: start + Duration::minutes(duration_minutes as i64),
        })
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Appointments in `existing` that block `candidate` for this practitioner.
///
/// The list is re-filtered here, so callers may pass a superset: other
/// practitioners, the excluded id and inactive statuses are all skipped.
pub fn find_conflicts<'a>(
    practitioner_id: Uuid,
    candidate: &TimeRange,
    exclude_id: Option<Uuid>,
    existing: &'a [Appointment],
) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|apt| apt.practitioner_id == practitioner_id)
        .filter(|apt| Some(apt.id) != exclude_id)
        .filter(|apt| apt.status.is_active())
        .filter(|apt| apt.time_range().overlaps(candidate))
        .collect()
}

pub fn has_conflict(
    practitioner_id: Uuid,
    candidate: &TimeRange,
    exclude_id: Option<Uuid>,
    existing: &[Appointment],
) -> bool {
    !find_conflicts(practitioner_id, candidate, exclude_id, existing).is_empty()
}
