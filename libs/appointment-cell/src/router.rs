// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use patient_cell::PatientState;
use practitioner_cell::{PractitionerState, RatingService};
use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AppointmentLifecycleService, AppointmentStore, BookingAvailabilityService, SchedulingLocks};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub availability: Arc<BookingAvailabilityService>,
    pub ratings: Arc<RatingService>,
}

impl AppointmentState {
    /// Wires the appointment services on top of the practitioner cell's schedule and rating
    /// services and the patient cell's profiles.
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        practitioners: &PractitionerState,
        patients: &PatientState,
    ) -> Self {
        let locks = Arc::new(SchedulingLocks::new());
        Self {
            lifecycle: Arc::new(AppointmentLifecycleService::new(
                store.clone(),
                practitioners.practitioners.clone(),
                patients.patients.clone(),
                clock,
                locks,
            )),
            availability: Arc::new(BookingAvailabilityService::new(
                store,
                practitioners.availability.clone(),
            )),
            ratings: practitioners.ratings.clone(),
            config,
        }
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/availability/check", get(handlers::check_availability))
        .route("/practitioners/{practitioner_id}", get(handlers::get_practitioner_appointments))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/start", post(handlers::start_appointment))
        .route("/{appointment_id}/no-show", post(handlers::mark_no_show))
        .route("/{appointment_id}/feedback", post(handlers::submit_feedback))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// `GET /{patient_id}/appointments`, merged under `/patients` next to the profile routes.
pub fn patient_appointment_routes(state: AppointmentState) -> Router {
    Router::new()
        .route("/{patient_id}/appointments", get(handlers::get_upcoming_patient_appointments))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
