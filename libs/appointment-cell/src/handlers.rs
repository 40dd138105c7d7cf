// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use practitioner_cell::services::rating::update_rating;
use practitioner_cell::Ratings;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AvailabilityCheckQuery, CancelAppointmentRequest, CompleteAppointmentRequest,
    CreateAppointmentRequest, RescheduleAppointmentRequest, SubmitFeedbackRequest,
};
use crate::router::AppointmentState;

// ==============================================================================
// ACCESS HELPERS
// ==============================================================================

fn is_staff(user: &User) -> bool {
    user.is_admin() || user.is_practitioner()
}

fn actor_id(user: &User) -> Result<Uuid, AppError> {
    user.actor_id()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if is_staff(user) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only practitioners and admins can perform this action".to_string()))
    }
}

/// Staff, or the patient the appointment belongs to.
fn ensure_participant(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if is_staff(user) || user.actor_id() == Some(appointment.patient_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this appointment".to_string()))
    }
}

fn envelope(message: &str, appointment: Appointment) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": appointment
    }))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let created_by = actor_id(&user)?;
    if !is_staff(&user) && request.patient_id != created_by {
        return Err(AppError::Forbidden("Patients can only book appointments for themselves".to_string()));
    }

    let appointment = state.lifecycle.create(request, created_by).await?;

    Ok((StatusCode::CREATED, envelope("Appointment booked successfully", appointment)))
}

pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.get(appointment_id).await?;
    ensure_participant(&user, &appointment)?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

pub async fn get_practitioner_appointments(
    State(state): State<AppointmentState>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let appointments = state.lifecycle.list_for_practitioner(practitioner_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

pub async fn get_patient_appointments(
    State(state): State<AppointmentState>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !is_staff(&user) && user.actor_id() != Some(patient_id) {
        return Err(AppError::Forbidden(
            "Not authorized to view appointments for this patient".to_string(),
        ));
    }

    let appointments = state.lifecycle.list_for_patient(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

pub async fn get_upcoming_patient_appointments(
    State(state): State<AppointmentState>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !is_staff(&user) && user.actor_id() != Some(patient_id) {
        return Err(AppError::Forbidden(
            "Not authorized to view appointments for this patient".to_string(),
        ));
    }

    let appointments = state.lifecycle.list_upcoming_for_patient(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&user)?;
    ensure_participant(&user, &state.lifecycle.get(appointment_id).await?)?;

    let appointment = state
        .lifecycle
        .reschedule(appointment_id, request.new_start_time, request.reason, actor)
        .await?;

    Ok(envelope("Appointment rescheduled successfully", appointment))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&user)?;
    ensure_participant(&user, &state.lifecycle.get(appointment_id).await?)?;

    let appointment = state
        .lifecycle
        .cancel(appointment_id, request.reason, actor)
        .await?;

    Ok(envelope("Appointment cancelled successfully", appointment))
}

pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let appointment = state
        .lifecycle
        .complete(appointment_id, request.practitioner_notes)
        .await?;

    Ok(envelope("Appointment completed", appointment))
}

pub async fn confirm_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;
    let appointment = state.lifecycle.confirm(appointment_id).await?;
    Ok(envelope("Appointment confirmed", appointment))
}

pub async fn start_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;
    let appointment = state.lifecycle.start(appointment_id).await?;
    Ok(envelope("Appointment started", appointment))
}

pub async fn mark_no_show(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;
    let appointment = state.lifecycle.mark_no_show(appointment_id).await?;
    Ok(envelope("Appointment marked as no-show", appointment))
}

/// Stores the review on the appointment, then folds it into the practitioner's rating.
pub async fn submit_feedback(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitFeedbackRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.get(appointment_id).await?;
    if !user.is_admin() && user.actor_id() != Some(appointment.patient_id) {
        return Err(AppError::Forbidden("Only the patient can review this appointment".to_string()));
    }

    // reject bad sub-ratings before anything is written
    update_rating(&Ratings::default(), f64::from(request.rating), &request.breakdown)?;

    let appointment = state
        .lifecycle
        .submit_feedback(appointment_id, request.rating, request.comment)
        .await?;

    let ratings = match state
        .ratings
        .submit_rating(appointment.practitioner_id, f64::from(request.rating), &request.breakdown)
        .await
    {
        Ok(practitioner) => Some(practitioner.ratings),
        Err(e) => {
            warn!(
                "Feedback for appointment {} saved but practitioner rating not updated: {}",
                appointment_id, e
            );
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Feedback submitted",
        "data": {
            "appointment": appointment,
            "practitioner_ratings": ratings
        }
    })))
}

pub async fn check_availability(
    State(state): State<AppointmentState>,
    Query(query): Query<AvailabilityCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let result = state
        .availability
        .check(query.practitioner_id, query.start_time, query.duration_minutes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
