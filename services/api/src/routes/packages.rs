//! Package endpoints and package-level interest

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{CreatePackagesRequest, Role},
    state::AppState,
};

/// Packages of a published event
pub async fn list_packages(
    State(state): State<AppState>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let packages = state.catalog().list_packages(event_id).await?;

    Ok(Json(json!({ "success": true, "packages": packages })))
}

/// Replace every package of an event
pub async fn replace_packages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<CreatePackagesRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let packages = state
        .catalog()
        .replace_packages(user.id, event_id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "packages": packages })),
    ))
}

/// Packages of an event with the sponsors interested in each
pub async fn interested_sponsors(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let packages = state.catalog().package_interest(user.id, event_id).await?;

    Ok(Json(json!({ "success": true, "packages": packages })))
}

pub async fn express_interest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(package_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Sponsor)?;
    let deal = state
        .deals()
        .express_package_interest(user.id, package_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Interest recorded; an agent will pick up the deal shortly",
            "deal": deal,
        })),
    ))
}

pub async fn withdraw_interest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(package_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Sponsor)?;
    state
        .deals()
        .withdraw_package_interest(user.id, package_id)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Interest withdrawn" })))
}
