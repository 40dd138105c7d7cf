use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, PatientError, PatientListQuery, PatientView, UpdatePatientRequest};
use crate::router::PatientState;

fn is_staff(user: &User) -> bool {
    user.is_admin() || user.is_practitioner()
}

fn check_access(user: &User, patient_id: Uuid) -> Result<(), AppError> {
    if is_staff(user) || user.actor_id() == Some(patient_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Patients can only access their own profile".to_string()))
    }
}

/// Staff see every active profile; a patient sees only their own.
pub async fn list_patients(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    let today = state.patients.today();
    let patients = if is_staff(&user) {
        match query.preferred_practitioner {
            Some(practitioner_id) => state.patients.find_by_preferred_practitioner(practitioner_id).await?,
            None => state.patients.list_active().await?,
        }
    } else {
        let Some(id) = user.actor_id() else {
            return Err(AppError::Auth("Token subject is not a valid user id".to_string()));
        };
        match state.patients.get_patient(id).await {
            Ok(patient) => vec![patient],
            Err(PatientError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        }
    };
    let patients: Vec<PatientView> = patients
        .into_iter()
        .map(|p| PatientView::new(p, today))
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": patients.len(),
        "data": patients
    })))
}

pub async fn get_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    check_access(&user, patient_id)?;
    let patient = state.patients.get_patient(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": PatientView::new(patient, state.patients.today())
    })))
}

pub async fn create_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can create patient profiles".to_string()));
    }

    let patient = state.patients.create_patient(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Patient created successfully",
            "data": PatientView::new(patient, state.patients.today())
        })),
    ))
}

pub async fn update_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    check_access(&user, patient_id)?;
    let patient = state.patients.update_patient(patient_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient updated successfully",
        "data": PatientView::new(patient, state.patients.today())
    })))
}

pub async fn deactivate_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can deactivate patients".to_string()));
    }
    state.patients.deactivate(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient deactivated successfully"
    })))
}
