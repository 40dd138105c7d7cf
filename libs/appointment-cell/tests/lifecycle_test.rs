use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use appointment_cell::{
    AppointmentBookingCounter, AppointmentError, AppointmentLifecycleService, AppointmentStatus,
    AppointmentStore, CreateAppointmentRequest, InMemoryAppointmentStore, Pricing, SchedulingLocks,
};
use patient_cell::{
    Address, CreatePatientRequest, EmergencyContact, Gender, InMemoryPatientStore, PatientService,
};
use practitioner_cell::{
    CreatePractitionerRequest, InMemoryPractitionerStore, PractitionerService, PractitionerTitle,
    Specialization,
};
use shared_utils::clock::{Clock, FixedClock};
use therapy_cell::BookingCounter;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, minute, 0).unwrap()
}

struct Fixture {
    store: Arc<dyn AppointmentStore>,
    clock: FixedClock,
    service: Arc<AppointmentLifecycleService>,
    practitioners: Arc<PractitionerService>,
    patients: Arc<PatientService>,
    practitioner_id: Uuid,
    patient_id: Uuid,
    therapy_id: Uuid,
}

fn practitioner_request() -> CreatePractitionerRequest {
    CreatePractitionerRequest {
        user_id: Uuid::new_v4(),
        first_name: "Anil".to_string(),
        last_name: "Sharma".to_string(),
        title: PractitionerTitle::Vaidya,
        specializations: vec![Specialization::Abhyanga],
        experience_years: 12,
        bio: None,
        languages: vec![],
        availability: None,
        session_settings: None,
    }
}

fn patient_request() -> CreatePatientRequest {
    CreatePatientRequest {
        user_id: Uuid::new_v4(),
        first_name: "Lakshmi".to_string(),
        last_name: "Nair".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 8, 20).unwrap(),
        gender: Gender::Female,
        phone: "+91 98470 12345".to_string(),
        alternate_phone: None,
        address: Address {
            street: "12 MG Road".to_string(),
            city: "Kochi".to_string(),
            state: "Kerala".to_string(),
            zip_code: "682016".to_string(),
            country: "India".to_string(),
        },
        emergency_contact: EmergencyContact {
            name: "Ravi Nair".to_string(),
            relationship: "spouse".to_string(),
            phone: "+91 98470 54321".to_string(),
        },
        medical_history: Default::default(),
        ayurvedic_profile: Default::default(),
        preferences: Default::default(),
        notes: None,
    }
}

async fn fixture() -> Fixture {
    let store: Arc<dyn AppointmentStore> = Arc::new(InMemoryAppointmentStore::new());
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2030, 1, 6, 0, 0, 0).unwrap());
    let practitioners = Arc::new(PractitionerService::new(
        Arc::new(InMemoryPractitionerStore::new()),
        Arc::new(clock.clone()),
        Arc::new(Mutex::new(())),
    ));
    let patients = Arc::new(PatientService::new(
        Arc::new(InMemoryPatientStore::new()),
        Arc::new(clock.clone()),
    ));
    let service = Arc::new(AppointmentLifecycleService::new(
        store.clone(),
        practitioners.clone(),
        patients.clone(),
        Arc::new(clock.clone()),
        Arc::new(SchedulingLocks::new()),
    ));

    let practitioner_id = practitioners.create_practitioner(practitioner_request()).await.unwrap().id;
    let patient_id = patients.create_patient(patient_request()).await.unwrap().id;

    Fixture {
        store,
        clock,
        service,
        practitioners,
        patients,
        practitioner_id,
        patient_id,
        therapy_id: Uuid::new_v4(),
    }
}

impl Fixture {
    async fn add_practitioner(&self) -> Uuid {
        self.practitioners.create_practitioner(practitioner_request()).await.unwrap().id
    }

    async fn add_patient(&self) -> Uuid {
        self.patients.create_patient(patient_request()).await.unwrap().id
    }

    fn request(&self, start_time: DateTime<Utc>, duration_minutes: i32) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient_id,
            practitioner_id: self.practitioner_id,
            therapy_id: self.therapy_id,
            start_time,
            duration_minutes,
            pricing: Pricing {
                amount: 2500.0,
                currency: "INR".to_string(),
                discount_applied: 0.0,
            },
            session_number: None,
            total_sessions: None,
            notes: None,
        }
    }

    async fn book(&self, start_time: DateTime<Utc>, duration_minutes: i32) -> Result<appointment_cell::Appointment, AppointmentError> {
        self.service
            .create(self.request(start_time, duration_minutes), Uuid::new_v4())
            .await
    }
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn test_overlapping_booking_is_rejected_and_adjacent_accepted() {
    let f = fixture().await;
    let first = f.book(at(10, 0), 60).await.unwrap();
    assert_eq!(first.status, AppointmentStatus::Scheduled);
    assert_eq!(first.end_time, at(11, 0));

    let overlapping = f.book(at(10, 30), 60).await;
    assert_matches!(overlapping, Err(AppointmentError::Conflict(msg)) if msg.contains("conflicting appointment"));

    let adjacent = f.book(at(11, 0), 60).await.unwrap();
    assert_eq!(adjacent.start_time, at(11, 0));

    let stored = f.store.list_for_practitioner(f.practitioner_id).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_other_practitioners_do_not_conflict() {
    let f = fixture().await;
    f.book(at(10, 0), 60).await.unwrap();

    let mut request = f.request(at(10, 0), 60);
    request.practitioner_id = f.add_practitioner().await;
    assert!(f.service.create(request, Uuid::new_v4()).await.is_ok());
}

#[tokio::test]
async fn test_create_validation() {
    let f = fixture().await;

    let past = f.book(f.clock.now() - Duration::minutes(1), 60).await;
    assert_matches!(past, Err(AppointmentError::Validation(msg)) if msg.contains("must be in the future"));

    let too_short = f.book(at(10, 0), 10).await;
    assert_matches!(too_short, Err(AppointmentError::Validation(_)));

    let mut sessions = f.request(at(10, 0), 60);
    sessions.session_number = Some(4);
    sessions.total_sessions = Some(3);
    assert_matches!(
        f.service.create(sessions, Uuid::new_v4()).await,
        Err(AppointmentError::Validation(_))
    );

    let mut discount = f.request(at(10, 0), 60);
    discount.pricing.discount_applied = 5000.0;
    assert_matches!(
        f.service.create(discount, Uuid::new_v4()).await,
        Err(AppointmentError::Validation(_))
    );

    assert!(f.store.list_for_practitioner(f.practitioner_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_slot_can_be_rebooked() {
    let f = fixture().await;
    let first = f.book(at(10, 0), 60).await.unwrap();
    f.service
        .cancel(first.id, "patient unwell".to_string(), Uuid::new_v4())
        .await
        .unwrap();

    assert!(f.book(at(10, 0), 60).await.is_ok());
}

#[tokio::test]
async fn test_create_requires_a_known_practitioner() {
    let f = fixture().await;
    let mut request = f.request(at(10, 0), 60);
    request.practitioner_id = Uuid::new_v4();

    let result = f.service.create(request, Uuid::new_v4()).await;

    assert_matches!(result, Err(AppointmentError::NotFound(_)));
    assert!(f.store.list_for_patient(f.patient_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_inactive_practitioner() {
    let f = fixture().await;
    f.practitioners.deactivate(f.practitioner_id).await.unwrap();

    let result = f.book(at(10, 0), 60).await;

    assert_matches!(result, Err(AppointmentError::Validation(msg)) if msg.contains("not accepting appointments"));
    assert!(f.store.list_for_practitioner(f.practitioner_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_requires_an_active_patient() {
    let f = fixture().await;
    let mut stranger = f.request(at(10, 0), 60);
    stranger.patient_id = Uuid::new_v4();
    assert_matches!(
        f.service.create(stranger, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound(_))
    );

    f.patients.deactivate(f.patient_id).await.unwrap();
    assert_matches!(f.book(at(10, 0), 60).await, Err(AppointmentError::Validation(_)));
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_slot_admit_exactly_one() {
    let f = fixture().await;

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let service = f.service.clone();
            let request = f.request(at(10, 0), 60);
            tokio::spawn(async move { service.create(request, Uuid::new_v4()).await })
        })
        .collect();

    let mut booked = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => booked += 1,
            Err(AppointmentError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 15);
}

// ==============================================================================
// RESCHEDULE
// ==============================================================================

#[tokio::test]
async fn test_reschedule_into_conflict_leaves_appointment_untouched() {
    let f = fixture().await;
    let first = f.book(at(10, 0), 60).await.unwrap();
    f.book(at(12, 0), 60).await.unwrap();
    f.service.confirm(first.id).await.unwrap();

    let result = f
        .service
        .reschedule(first.id, at(11, 30), None, Uuid::new_v4())
        .await;
    assert_matches!(result, Err(AppointmentError::Conflict(_)));

    let stored = f.service.get(first.id).await.unwrap();
    assert_eq!(stored.start_time, at(10, 0));
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    assert!(stored.rescheduling_history.is_empty());
}

#[tokio::test]
async fn test_reschedule_records_history_and_resets_reminders() {
    let f = fixture().await;
    let mut first = f.book(at(10, 0), 60).await.unwrap();
    first.reminders_sent.email_24h = true;
    first.reminders_sent.sms_1h = true;
    first.status = AppointmentStatus::Confirmed;
    f.store.save(&first).await.unwrap();

    let actor = Uuid::new_v4();
    let moved = f
        .service
        .reschedule(first.id, at(10, 30), Some(" traffic ".to_string()), actor)
        .await
        .unwrap();

    assert_eq!(moved.start_time, at(10, 30));
    assert_eq!(moved.end_time, at(11, 30));
    assert_eq!(moved.status, AppointmentStatus::Scheduled);
    assert!(!moved.reminders_sent.email_24h);
    assert!(!moved.reminders_sent.sms_1h);
    assert_eq!(moved.rescheduling_history.len(), 1);

    let entry = &moved.rescheduling_history[0];
    assert_eq!(entry.original_time, at(10, 0));
    assert_eq!(entry.new_time, at(10, 30));
    assert_eq!(entry.reason.as_deref(), Some("traffic"));
    assert_eq!(entry.rescheduled_by, actor);
}

#[tokio::test]
async fn test_reschedule_rejections() {
    let f = fixture().await;

    let missing = f
        .service
        .reschedule(Uuid::new_v4(), at(15, 0), None, Uuid::new_v4())
        .await;
    assert_matches!(missing, Err(AppointmentError::NotFound(_)));

    let done = f.book(at(10, 0), 60).await.unwrap();
    f.service.complete(done.id, None).await.unwrap();
    let result = f.service.reschedule(done.id, at(15, 0), None, Uuid::new_v4()).await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidStateTransition { from: AppointmentStatus::Completed, .. })
    );

    let cancelled = f.book(at(12, 0), 60).await.unwrap();
    f.service
        .cancel(cancelled.id, "no longer needed".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    let result = f.service.reschedule(cancelled.id, at(15, 0), None, Uuid::new_v4()).await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidStateTransition { from: AppointmentStatus::Cancelled, .. })
    );

    let upcoming = f.book(at(16, 0), 60).await.unwrap();
    let past = f
        .service
        .reschedule(upcoming.id, at(16, 0) - Duration::days(7), None, Uuid::new_v4())
        .await;
    assert_matches!(past, Err(AppointmentError::Validation(_)));
}

#[tokio::test]
async fn test_no_show_can_be_rescheduled_back_into_the_calendar() {
    let f = fixture().await;
    let missed = f.book(at(9, 0), 60).await.unwrap();
    f.service.mark_no_show(missed.id).await.unwrap();

    let blocker = f.book(at(9, 0), 60).await.unwrap();
    assert_eq!(blocker.start_time, at(9, 0));

    let result = f.service.reschedule(missed.id, at(9, 30), None, Uuid::new_v4()).await;
    assert_matches!(result, Err(AppointmentError::Conflict(_)));

    let moved = f
        .service
        .reschedule(missed.id, at(14, 0), None, Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(moved.status, AppointmentStatus::Scheduled);
}

// ==============================================================================
// CANCEL / COMPLETE / TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn test_cancel_is_not_idempotent() {
    let f = fixture().await;
    let apt = f.book(at(10, 0), 60).await.unwrap();
    let actor = Uuid::new_v4();

    let cancelled = f
        .service
        .cancel(apt.id, "double booked elsewhere".to_string(), actor)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(actor));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("double booked elsewhere"));
    assert!(cancelled.cancelled_at.is_some());

    let again = f.service.cancel(apt.id, "again".to_string(), Uuid::new_v4()).await;
    assert_matches!(again, Err(AppointmentError::InvalidStateTransition { .. }));

    let stored = f.service.get(apt.id).await.unwrap();
    assert_eq!(stored.cancelled_by, Some(actor));
    assert_eq!(stored.cancellation_reason.as_deref(), Some("double booked elsewhere"));
}

#[tokio::test]
async fn test_complete_only_from_active_states() {
    let f = fixture().await;

    let apt = f.book(at(10, 0), 60).await.unwrap();
    f.service.start(apt.id).await.unwrap();
    let done = f
        .service
        .complete(apt.id, Some("Tolerated well".to_string()))
        .await
        .unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);
    assert_eq!(done.notes.practitioner.as_deref(), Some("Tolerated well"));

    let again = f.service.complete(apt.id, None).await;
    assert_matches!(again, Err(AppointmentError::InvalidStateTransition { .. }));

    let missed = f.book(at(12, 0), 60).await.unwrap();
    f.service.mark_no_show(missed.id).await.unwrap();
    let result = f.service.complete(missed.id, None).await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidStateTransition { from: AppointmentStatus::NoShow, .. })
    );
}

#[tokio::test]
async fn test_confirm_and_start_origins() {
    let f = fixture().await;
    let apt = f.book(at(10, 0), 60).await.unwrap();

    let confirmed = f.service.confirm(apt.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert_matches!(
        f.service.confirm(apt.id).await,
        Err(AppointmentError::InvalidStateTransition { .. })
    );

    let started = f.service.start(apt.id).await.unwrap();
    assert_eq!(started.status, AppointmentStatus::InProgress);
    assert_matches!(
        f.service.mark_no_show(apt.id).await,
        Err(AppointmentError::InvalidStateTransition { .. })
    );
}

// ==============================================================================
// FEEDBACK / QUERIES / POPULARITY
// ==============================================================================

#[tokio::test]
async fn test_feedback_once_on_completed_appointments() {
    let f = fixture().await;
    let apt = f.book(at(10, 0), 60).await.unwrap();

    let early = f.service.submit_feedback(apt.id, 5, None).await;
    assert_matches!(early, Err(AppointmentError::InvalidStateTransition { .. }));

    f.service.complete(apt.id, None).await.unwrap();

    let out_of_range = f.service.submit_feedback(apt.id, 6, None).await;
    assert_matches!(out_of_range, Err(AppointmentError::Validation(_)));

    let reviewed = f
        .service
        .submit_feedback(apt.id, 4, Some("Very relaxing".to_string()))
        .await
        .unwrap();
    let feedback = reviewed.feedback.unwrap();
    assert_eq!(feedback.rating, 4);
    assert_eq!(feedback.comment.as_deref(), Some("Very relaxing"));

    let twice = f.service.submit_feedback(apt.id, 5, None).await;
    assert_matches!(twice, Err(AppointmentError::Validation(_)));
}

#[tokio::test]
async fn test_practitioner_listing_is_upcoming_and_ascending() {
    let f = fixture().await;
    let late = f.book(at(15, 0), 60).await.unwrap();
    let early = f.book(at(9, 0), 60).await.unwrap();
    let cancelled = f.book(at(12, 0), 60).await.unwrap();
    f.service
        .cancel(cancelled.id, "clash".to_string(), Uuid::new_v4())
        .await
        .unwrap();

    let ids: Vec<Uuid> = f
        .service
        .list_for_practitioner(f.practitioner_id)
        .await
        .unwrap()
        .into_iter()
        .map(|apt| apt.id)
        .collect();
    assert_eq!(ids, vec![early.id, late.id]);

    f.clock.set(at(10, 0));
    let ids: Vec<Uuid> = f
        .service
        .list_for_practitioner(f.practitioner_id)
        .await
        .unwrap()
        .into_iter()
        .map(|apt| apt.id)
        .collect();
    assert_eq!(ids, vec![late.id]);
}

#[tokio::test]
async fn test_patient_listing_is_most_recent_first() {
    let f = fixture().await;
    let patient_id = f.add_patient().await;

    for hour in [9, 14, 11] {
        let mut request = f.request(at(hour, 0), 60);
        request.patient_id = patient_id;
        f.service.create(request, patient_id).await.unwrap();
    }

    let starts: Vec<DateTime<Utc>> = f
        .service
        .list_for_patient(patient_id)
        .await
        .unwrap()
        .into_iter()
        .map(|apt| apt.start_time)
        .collect();
    assert_eq!(starts, vec![at(14, 0), at(11, 0), at(9, 0)]);
}

#[tokio::test]
async fn test_upcoming_patient_listing_is_active_and_ascending() {
    let f = fixture().await;
    let late = f.book(at(15, 0), 60).await.unwrap();
    let early = f.book(at(9, 0), 60).await.unwrap();
    let done = f.book(at(12, 0), 60).await.unwrap();
    f.service.complete(done.id, None).await.unwrap();

    let ids: Vec<Uuid> = f
        .service
        .list_upcoming_for_patient(f.patient_id)
        .await
        .unwrap()
        .into_iter()
        .map(|apt| apt.id)
        .collect();
    assert_eq!(ids, vec![early.id, late.id]);

    f.clock.set(at(10, 0));
    assert_eq!(f.service.list_upcoming_for_patient(f.patient_id).await.unwrap().len(), 1);

    assert_matches!(
        f.service.list_upcoming_for_patient(Uuid::new_v4()).await,
        Err(AppointmentError::NotFound(_))
    );
}

#[tokio::test]
async fn test_booking_counter_uses_popularity_statuses() {
    let f = fixture().await;
    let done = f.book(at(9, 0), 60).await.unwrap();
    f.service.complete(done.id, None).await.unwrap();
    let confirmed = f.book(at(10, 0), 60).await.unwrap();
    f.service.confirm(confirmed.id).await.unwrap();
    f.book(at(11, 0), 60).await.unwrap();
    let cancelled = f.book(at(12, 0), 60).await.unwrap();
    f.service
        .cancel(cancelled.id, "changed plans".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    let started = f.book(at(13, 0), 60).await.unwrap();
    f.service.start(started.id).await.unwrap();

    let counter = AppointmentBookingCounter::new(f.store.clone());
    assert_eq!(counter.count_qualifying_bookings(f.therapy_id).await.unwrap(), 3);
    assert_eq!(counter.count_qualifying_bookings(Uuid::new_v4()).await.unwrap(), 0);
}
