// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use patient_cell::PatientService;
use practitioner_cell::PractitionerService;
use shared_utils::clock::Clock;

use crate::models::{
    Appointment, AppointmentError, AppointmentNotes, AppointmentStatus, CreateAppointmentRequest,
    Feedback, RemindersSent, ReschedulingEntry,
};
use crate::services::conflict::{find_conflicts, TimeRange};
use crate::services::locks::SchedulingLocks;
use crate::services::store::AppointmentStore;

const MAX_FEEDBACK_COMMENT: usize = 500;
const MAX_NOTE_LENGTH: usize = 1000;

/// Statuses reachable from `current`. `Rescheduled` is transient and
/// immediately resolves back to `Scheduled`.
pub fn get_valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;

    match current {
        Scheduled => &[Confirmed, InProgress, Completed, Cancelled, NoShow, Rescheduled],
        Confirmed => &[InProgress, Completed, Cancelled, NoShow, Rescheduled],
        InProgress => &[Completed, Cancelled, Rescheduled],
        NoShow => &[Cancelled, Rescheduled],
        Rescheduled => &[Scheduled, Cancelled],
        // Terminal states
        Completed | Cancelled => &[],
    }
}

pub fn validate_status_transition(
    current: AppointmentStatus,
    target: AppointmentStatus,
    operation: &'static str,
) -> Result<(), AppointmentError> {
    if get_valid_transitions(current).contains(&target) {
        Ok(())
    } else {
        warn!("Invalid status transition attempted: {} -> {} ({})", current, target, operation);
        Err(AppointmentError::InvalidStateTransition { from: current, operation })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_note(name: &str, value: &Option<String>) -> Result<(), AppointmentError> {
    match value {
        Some(note) if note.chars().count() > MAX_NOTE_LENGTH => Err(AppointmentError::Validation(format!(
            "{} notes cannot exceed {} characters",
            name, MAX_NOTE_LENGTH
        ))),
        _ => Ok(()),
    }
}

pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    practitioners: Arc<PractitionerService>,
    patients: Arc<PatientService>,
    clock: Arc<dyn Clock>,
    locks: Arc<SchedulingLocks>,
}

impl AppointmentLifecycleService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        practitioners: Arc<PractitionerService>,
        patients: Arc<PatientService>,
        clock: Arc<dyn Clock>,
        locks: Arc<SchedulingLocks>,
    ) -> Self {
        Self {
            store,
            practitioners,
            patients,
            clock,
            locks,
        }
    }

    /// Both participants must exist and be active before anything is booked.
    async fn ensure_participants(&self, practitioner_id: Uuid, patient_id: Uuid) -> Result<(), AppointmentError> {
        let practitioner = self.practitioners.get_practitioner(practitioner_id).await?;
        if !practitioner.is_active() {
            return Err(AppointmentError::Validation(format!(
                "Practitioner {} is not accepting appointments",
                practitioner_id
            )));
        }
        let patient = self.patients.get_patient(patient_id).await?;
        if !patient.is_active() {
            return Err(AppointmentError::Validation(format!(
                "Patient {} is {} and cannot book appointments",
                patient_id, patient.status
            )));
        }
        Ok(())
    }

    fn ensure_future(&self, start_time: DateTime<Utc>) -> Result<(), AppointmentError> {
        if start_time <= self.clock.now() {
            return Err(AppointmentError::Validation(
                "Appointment start time must be in the future".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_no_conflict(
        &self,
        practitioner_id: Uuid,
        candidate: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let existing = self
            .store
            .find_active_for_practitioner(practitioner_id, candidate, exclude_id)
            .await?;

        let conflicts = find_conflicts(practitioner_id, candidate, exclude_id, &existing);
        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for practitioner {} - {} conflicting appointments",
                practitioner_id,
                conflicts.len()
            );
            return Err(AppointmentError::Conflict(
                "practitioner has a conflicting appointment".to_string(),
            ));
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {} not found", id)))
    }

    /// Loads the appointment while holding its practitioner's scheduling lock.
    async fn load_locked(&self, id: Uuid) -> Result<(OwnedMutexGuard<()>, Appointment), AppointmentError> {
        let practitioner_id = self.load(id).await?.practitioner_id;
        let guard = self.locks.acquire(practitioner_id).await;
        // re-read under the lock; the first read only located the practitioner
        let appointment = self.load(id).await?;
        Ok((guard, appointment))
    }

    async fn transition(
        &self,
        id: Uuid,
        target: AppointmentStatus,
        operation: &'static str,
        apply: impl FnOnce(&mut Appointment) + Send,
    ) -> Result<Appointment, AppointmentError> {
        let (_guard, mut appointment) = self.load_locked(id).await?;
        validate_status_transition(appointment.status, target, operation)?;

        let from = appointment.status;
        appointment.status = target;
        apply(&mut appointment);
        appointment.updated_at = self.clock.now();

        let saved = self.store.save(&appointment).await?;
        info!("Appointment {} moved {} -> {} ({})", id, from, target, operation);
        Ok(saved)
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    #[instrument(skip(self, request), fields(practitioner_id = %request.practitioner_id))]
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        created_by: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Creating appointment for patient {} at {}", request.patient_id, request.start_time);

        self.ensure_future(request.start_time)?;
        let range = TimeRange::of(request.start_time, request.duration_minutes)?;
        request.pricing.validate()?;

        let session_number = request.session_number.unwrap_or(1);
        let total_sessions = request.total_sessions.unwrap_or(1);
        if session_number < 1 || total_sessions < 1 {
            return Err(AppointmentError::Validation(
                "session_number and total_sessions must be at least 1".to_string(),
            ));
        }
        if session_number > total_sessions {
            return Err(AppointmentError::Validation(
                "session_number cannot exceed total_sessions".to_string(),
            ));
        }

        let notes = request.notes.unwrap_or_default();
        let notes = AppointmentNotes {
            practitioner: trimmed(notes.practitioner),
            patient: trimmed(notes.patient),
            admin: trimmed(notes.admin),
        };
        check_note("practitioner", &notes.practitioner)?;
        check_note("patient", &notes.patient)?;
        check_note("admin", &notes.admin)?;

        self.ensure_participants(request.practitioner_id, request.patient_id).await?;

        let _guard = self.locks.acquire(request.practitioner_id).await;
        self.ensure_no_conflict(request.practitioner_id, &range, None).await?;

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            practitioner_id: request.practitioner_id,
            therapy_id: request.therapy_id,
            start_time: range.start,
            end_time: range.end,
            duration_minutes: request.duration_minutes,
            status: AppointmentStatus::Scheduled,
            session_number,
            total_sessions,
            pricing: request.pricing,
            payment_status: Default::default(),
            notes,
            reminders_sent: RemindersSent::default(),
            feedback: None,
            rescheduling_history: Vec::new(),
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save(&appointment).await?;
        info!(
            "Appointment {} scheduled for practitioner {} from {} to {}",
            saved.id, saved.practitioner_id, saved.start_time, saved.end_time
        );
        Ok(saved)
    }

    #[instrument(skip(self, reason))]
    pub async fn reschedule(
        &self,
        id: Uuid,
        new_start_time: DateTime<Utc>,
        reason: Option<String>,
        actor: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let (_guard, mut appointment) = self.load_locked(id).await?;

        validate_status_transition(appointment.status, AppointmentStatus::Rescheduled, "reschedule")?;
        self.ensure_future(new_start_time)?;

        let candidate = TimeRange::of(new_start_time, appointment.duration_minutes)?;
        self.ensure_no_conflict(appointment.practitioner_id, &candidate, Some(id))
            .await?;

        let now = self.clock.now();
        let original_time = appointment.start_time;
        appointment.rescheduling_history.push(ReschedulingEntry {
            original_time,
            new_time: new_start_time,
            reason: trimmed(reason),
            rescheduled_by: actor,
            rescheduled_at: now,
        });
        appointment.move_to(new_start_time);
        appointment.status = AppointmentStatus::Scheduled;
        appointment.reminders_sent = RemindersSent::default();
        appointment.updated_at = now;

        let saved = self.store.save(&appointment).await?;
        info!("Appointment {} rescheduled from {} to {}", id, original_time, new_start_time);
        Ok(saved)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(&self, id: Uuid, reason: String, actor: Uuid) -> Result<Appointment, AppointmentError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppointmentError::Validation("cancellation reason is required".to_string()));
        }

        let now = self.clock.now();
        self.transition(id, AppointmentStatus::Cancelled, "cancel", move |apt| {
            apt.cancellation_reason = Some(reason);
            apt.cancelled_by = Some(actor);
            apt.cancelled_at = Some(now);
        })
        .await
    }

    #[instrument(skip(self, practitioner_notes))]
    pub async fn complete(&self, id: Uuid, practitioner_notes: Option<String>) -> Result<Appointment, AppointmentError> {
        let practitioner_notes = trimmed(practitioner_notes);
        check_note("practitioner", &practitioner_notes)?;

        self.transition(id, AppointmentStatus::Completed, "complete", move |apt| {
            if let Some(notes) = practitioner_notes {
                apt.notes.practitioner = Some(notes);
            }
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(id, AppointmentStatus::Confirmed, "confirm", |_| {}).await
    }

    #[instrument(skip(self))]
    pub async fn start(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(id, AppointmentStatus::InProgress, "start", |_| {}).await
    }

    #[instrument(skip(self))]
    pub async fn mark_no_show(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(id, AppointmentStatus::NoShow, "mark as no-show", |_| {}).await
    }

    /// Records the patient's review of a completed session. Only one review per appointment.
    #[instrument(skip(self, comment))]
    pub async fn submit_feedback(
        &self,
        id: Uuid,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        if !(1..=5).contains(&rating) {
            return Err(AppointmentError::Validation("rating must be between 1 and 5".to_string()));
        }
        let comment = trimmed(comment);
        if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_FEEDBACK_COMMENT) {
            return Err(AppointmentError::Validation(format!(
                "feedback comment cannot exceed {} characters",
                MAX_FEEDBACK_COMMENT
            )));
        }

        let (_guard, mut appointment) = self.load_locked(id).await?;
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::InvalidStateTransition {
                from: appointment.status,
                operation: "submit feedback for",
            });
        }
        if appointment.feedback.is_some() {
            return Err(AppointmentError::Validation(
                "feedback has already been submitted for this appointment".to_string(),
            ));
        }

        let now = self.clock.now();
        appointment.feedback = Some(Feedback {
            rating,
            comment,
            submitted_at: now,
        });
        appointment.updated_at = now;

        let saved = self.store.save(&appointment).await?;
        info!("Feedback ({} stars) recorded for appointment {}", rating, id);
        Ok(saved)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.load(id).await
    }

    /// Upcoming scheduled or confirmed appointments, soonest first.
    pub async fn list_for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let now = self.clock.now();
        let mut appointments: Vec<Appointment> = self
            .store
            .list_for_practitioner(practitioner_id)
            .await?
            .into_iter()
            .filter(|apt| apt.start_time >= now)
            .filter(|apt| matches!(apt.status, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed))
            .collect();
        appointments.sort_by_key(|apt| apt.start_time);
        Ok(appointments)
    }

    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self.store.list_for_patient(patient_id).await?;
        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(appointments)
    }

    /// Upcoming scheduled or confirmed appointments of a known patient, soonest first.
    pub async fn list_upcoming_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.patients.get_patient(patient_id).await?;

        let now = self.clock.now();
        let mut appointments: Vec<Appointment> = self
            .store
            .list_for_patient(patient_id)
            .await?
            .into_iter()
            .filter(|apt| apt.start_time >= now)
            .filter(|apt| matches!(apt.status, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed))
            .collect();
        appointments.sort_by_key(|apt| apt.start_time);
        Ok(appointments)
    }
}
