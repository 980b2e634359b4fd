//! Event endpoints

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
    models::{CreateEventRequest, Role, UpdateEventRequest, UserSummary},
    state::AppState,
};

/// Every event that is not a draft
pub async fn list_public_events(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let events = state.catalog().list_public_events().await?;

    Ok(Json(json!({ "success": true, "events": events })))
}

pub async fn list_organizer_events(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let events = state.catalog().list_organizer_events(user.id).await?;

    Ok(Json(json!({ "success": true, "events": events })))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let event = state.catalog().get_event(user.id, event_id).await?;

    Ok(Json(json!({ "success": true, "event": event })))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateEventRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let event = state.catalog().create_event(user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "event": event })),
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateEventRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let event = state.catalog().update_event(user.id, event_id, payload).await?;

    Ok(Json(json!({ "success": true, "event": event })))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    state.catalog().delete_event(user.id, event_id).await?;

    Ok(Json(json!({ "success": true, "message": "Event deleted" })))
}

/// Sponsor interest in a whole event
pub async fn express_interest(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Sponsor)?;
    state.catalog().express_event_interest(user.id, event_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Interest recorded; the organizer can now see your company",
    })))
}

pub async fn interested_sponsors(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let sponsors = state
        .catalog()
        .event_interested_sponsors(user.id, event_id)
        .await?;

    Ok(Json(json!({ "success": true, "sponsors": sponsors })))
}

/// Active sponsors on the platform
pub async fn list_sponsors(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Organizer)?;
    let sponsors: Vec<UserSummary> = state
        .accounts()
        .list_sponsors()
        .await?
        .iter()
        .map(UserSummary::from)
        .collect();

    Ok(Json(json!({ "success": true, "sponsors": sponsors })))
}
