use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateTherapyRequest, TherapyListQuery, TherapyView};
use crate::router::TherapyState;

pub async fn list_therapies(
    State(state): State<TherapyState>,
    Query(query): Query<TherapyListQuery>,
) -> Result<Json<Value>, AppError> {
    let therapies: Vec<TherapyView> = state
        .therapies
        .list_active(query.category, query.limit)
        .await?
        .into_iter()
        .map(TherapyView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": therapies.len(),
        "data": therapies
    })))
}

pub async fn get_therapy(
    State(state): State<TherapyState>,
    Path(therapy_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let therapy = state.therapies.get_therapy(therapy_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": TherapyView::from(therapy)
    })))
}

pub async fn create_therapy(
    State(state): State<TherapyState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTherapyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can create therapies".to_string()));
    }
    let created_by = user
        .actor_id()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))?;

    let therapy = state.therapies.create_therapy(request, created_by).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Therapy created successfully",
            "data": TherapyView::from(therapy)
        })),
    ))
}

pub async fn update_popularity(
    State(state): State<TherapyState>,
    Path(therapy_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let therapy = state.therapies.update_popularity(therapy_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "therapy_id": therapy.id,
            "popularity": therapy.popularity
        }
    })))
}
