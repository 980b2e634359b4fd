//! Sponsor approval and account administration, performed by agents

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::Role,
    state::AppState,
};

pub async fn pending_sponsors(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    let applications = state.accounts().pending_applications().await?;

    Ok(Json(json!({ "success": true, "applications": applications })))
}

pub async fn approve_sponsor(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(application_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    let sponsor = state.accounts().approve_application(application_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Sponsor approved",
        "user": sponsor,
    })))
}

pub async fn reject_sponsor(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(application_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    state.accounts().reject_application(application_id).await?;

    Ok(Json(json!({ "success": true, "message": "Sponsor application rejected" })))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    state.accounts().deactivate(user.id, user_id).await?;

    Ok(Json(json!({ "success": true, "message": "User deactivated" })))
}
