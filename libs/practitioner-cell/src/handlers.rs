// libs/practitioner-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityCheckQuery, AvailablePractitionersQuery, CreatePractitionerRequest, Specialization,
    UpdateRatingRequest, WeeklyAvailability,
};
use crate::router::PractitionerState;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

pub async fn list_practitioners(
    State(state): State<PractitionerState>,
) -> Result<Json<Value>, AppError> {
    let practitioners = state.practitioners.list_active().await?;

    Ok(Json(json!({
        "success": true,
        "count": practitioners.len(),
        "data": practitioners
    })))
}

pub async fn get_practitioner(
    State(state): State<PractitionerState>,
    Path(practitioner_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let practitioner = state.practitioners.get_practitioner(practitioner_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": practitioner
    })))
}

pub async fn find_available_practitioners(
    State(state): State<PractitionerState>,
    Query(query): Query<AvailablePractitionersQuery>,
) -> Result<Json<Value>, AppError> {
    debug!("Available practitioners requested for {} {}", query.date, query.time);
    let practitioners = state
        .availability
        .find_available_practitioners(query.date, query.time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": practitioners.len(),
        "data": practitioners
    })))
}

pub async fn find_by_specialization(
    State(state): State<PractitionerState>,
    Path(specialization): Path<Specialization>,
) -> Result<Json<Value>, AppError> {
    let practitioners = state.practitioners.find_by_specialization(specialization).await?;

    Ok(Json(json!({
        "success": true,
        "count": practitioners.len(),
        "data": practitioners
    })))
}

pub async fn check_practitioner_availability(
    State(state): State<PractitionerState>,
    Path(practitioner_id): Path<Uuid>,
    Query(query): Query<AvailabilityCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let available = state
        .availability
        .check_availability(practitioner_id, query.date_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "practitioner_id": practitioner_id,
            "date_time": query.date_time,
            "local_time": state.availability.local_time(query.date_time),
            "available": available
        }
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

pub async fn create_practitioner(
    State(state): State<PractitionerState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePractitionerRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can create practitioner profiles".to_string()));
    }

    let practitioner = state.practitioners.create_practitioner(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Practitioner profile created successfully",
            "data": practitioner
        })),
    ))
}

pub async fn update_availability(
    State(state): State<PractitionerState>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(availability): Json<WeeklyAvailability>,
) -> Result<Json<Value>, AppError> {
    let practitioner = state.practitioners.get_practitioner(practitioner_id).await?;

    let is_owner = user.actor_id() == Some(practitioner.user_id);
    if !user.is_admin() && !is_owner {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let updated = state
        .practitioners
        .update_availability(practitioner_id, availability)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability updated successfully",
        "data": updated
    })))
}

pub async fn deactivate_practitioner(
    State(state): State<PractitionerState>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can delete practitioner profiles".to_string()));
    }

    state.practitioners.deactivate(practitioner_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Practitioner profile deactivated successfully"
    })))
}

/// Manual adjustment of the aggregate. Patient reviews arrive through appointment feedback.
pub async fn submit_rating(
    State(state): State<PractitionerState>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateRatingRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can record ratings directly; patients review through appointment feedback".to_string(),
        ));
    }

    let practitioner = state
        .ratings
        .submit_rating(practitioner_id, request.rating, &request.breakdown)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating recorded",
        "data": practitioner.ratings
    })))
}
