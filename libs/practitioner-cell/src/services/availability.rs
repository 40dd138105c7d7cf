// libs/practitioner-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Practitioner, PractitionerError, WeeklyAvailability};
use crate::services::store::PractitionerStore;

/// Whether `at` falls inside the declared weekly template.
///
/// Time of day is compared at minute precision. The end of the working day is
/// inclusive, the break window is half-open. Existing appointments are not
/// consulted here.
pub fn is_within_availability(availability: &WeeklyAvailability, at: NaiveDateTime) -> bool {
    let schedule = availability.for_weekday(at.weekday());

    if !schedule.available {
        return false;
    }

    let time = match NaiveTime::from_hms_opt(at.hour(), at.minute(), 0) {
        Some(time) => time,
        None => return false,
    };

    if time < schedule.start_time || time > schedule.end_time {
        return false;
    }

    if let Some((break_start, break_end)) = schedule.break_window() {
        if time >= break_start && time < break_end {
            return false;
        }
    }

    true
}

/// Whether the whole of `[start, end)` fits one working day of the template
/// without touching the break. A session may end exactly when the break or the
/// working day begins or ends.
pub fn is_range_within_availability(
    availability: &WeeklyAvailability,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    if end <= start || start.date() != end.date() {
        return false;
    }

    let schedule = availability.for_weekday(start.weekday());
    if !schedule.available {
        return false;
    }

    let (from, to) = match (
        NaiveTime::from_hms_opt(start.hour(), start.minute(), 0),
        NaiveTime::from_hms_opt(end.hour(), end.minute(), 0),
    ) {
        (Some(from), Some(to)) => (from, to),
        _ => return false,
    };

    if from < schedule.start_time || to > schedule.end_time {
        return false;
    }

    match schedule.break_window() {
        Some((break_start, break_end)) => !(from < break_end && break_start < to),
        None => true,
    }
}

pub struct AvailabilityService {
    store: Arc<dyn PractitionerStore>,
    clinic_offset: FixedOffset,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn PractitionerStore>, clinic_offset: FixedOffset) -> Self {
        Self { store, clinic_offset }
    }

    /// Clinic wall-clock time for an instant.
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.clinic_offset).naive_local()
    }

    pub fn practitioner_available_at(&self, practitioner: &Practitioner, at: DateTime<Utc>) -> bool {
        is_within_availability(&practitioner.availability, self.local_time(at))
    }

    /// Whether an active practitioner's template covers the session `[start, end)`.
    pub async fn check_session_fits(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, PractitionerError> {
        let practitioner = self
            .store
            .find_by_id(practitioner_id)
            .await?
            .ok_or(PractitionerError::NotFound(practitioner_id))?;

        Ok(practitioner.is_active()
            && is_range_within_availability(
                &practitioner.availability,
                self.local_time(start),
                self.local_time(end),
            ))
    }

    /// Looks the practitioner up and checks `at` against their template.
    pub async fn check_availability(
        &self,
        practitioner_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, PractitionerError> {
        let practitioner = self
            .store
            .find_by_id(practitioner_id)
            .await?
            .ok_or(PractitionerError::NotFound(practitioner_id))?;

        let available = self.practitioner_available_at(&practitioner, at);
        debug!(
            "Practitioner {} available at {} (local {}): {}",
            practitioner_id,
            at,
            self.local_time(at),
            available
        );

        Ok(available)
    }

    /// Active practitioners whose template covers `date` at `time`, best rated first.
    pub async fn find_available_practitioners(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Practitioner>, PractitionerError> {
        let at = date.and_time(time);
        debug!("Finding practitioners available at {}", at);

        let mut practitioners: Vec<Practitioner> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_active() && is_within_availability(&p.availability, at))
            .collect();

        practitioners.sort_by(|a, b| b.ratings.average_rating.total_cmp(&a.ratings.average_rating));

        Ok(practitioners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DaySchedule;

    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        // 2030-01-07 is a Monday
        NaiveDate::from_ymd_opt(2030, 1, 7)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_break_window_is_half_open() {
        let template = WeeklyAvailability::default();

        assert!(!is_within_availability(&template, monday(13, 30)));
        assert!(is_within_availability(&template, monday(12, 59)));
        assert!(is_within_availability(&template, monday(14, 0)));
        assert!(!is_within_availability(&template, monday(13, 0)));
    }

    #[test]
    fn test_working_hours_bounds_are_inclusive() {
        let template = WeeklyAvailability::default();

        assert!(is_within_availability(&template, monday(9, 0)));
        assert!(is_within_availability(&template, monday(18, 0)));
        assert!(!is_within_availability(&template, monday(8, 59)));
        assert!(!is_within_availability(&template, monday(18, 1)));
    }

    #[test]
    fn test_seconds_are_ignored() {
        let template = WeeklyAvailability::default();
        let just_before_close = monday(18, 0).with_second(45).unwrap();
        assert!(is_within_availability(&template, just_before_close));
    }

    #[test]
    fn test_day_off_is_never_available() {
        let template = WeeklyAvailability::default();
        // 2030-01-06 is a Sunday
        let sunday = NaiveDate::from_ymd_opt(2030, 1, 6).unwrap().and_hms_opt(10, 0, 0).unwrap();
        assert!(!is_within_availability(&template, sunday));
    }

    #[test]
    fn test_session_must_clear_the_break() {
        let template = WeeklyAvailability::default();

        assert!(is_range_within_availability(&template, monday(12, 0), monday(13, 0)));
        assert!(is_range_within_availability(&template, monday(14, 0), monday(15, 30)));
        assert!(is_range_within_availability(&template, monday(17, 0), monday(18, 0)));
        assert!(!is_range_within_availability(&template, monday(12, 30), monday(13, 30)));
        assert!(!is_range_within_availability(&template, monday(12, 0), monday(15, 0)));
        assert!(!is_range_within_availability(&template, monday(17, 30), monday(18, 30)));
        assert!(!is_range_within_availability(&template, monday(11, 0), monday(10, 0)));
    }

    #[test]
    fn test_day_without_break() {
        let template = WeeklyAvailability {
            monday: DaySchedule::working((9, 0), (18, 0), None),
            ..WeeklyAvailability::default()
        };
        assert!(is_within_availability(&template, monday(13, 30)));
    }
}
