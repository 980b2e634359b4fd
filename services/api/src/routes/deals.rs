//! Deal endpoints

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
    models::{Role, SendMessageRequest, UpdateStatusRequest},
    state::AppState,
};

/// Deals no agent has claimed yet
pub async fn pending_deals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    let deals = state.deals().pending_deals().await?;

    Ok(Json(json!({ "success": true, "deals": deals })))
}

pub async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(deal_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    let deal = state.deals().assign(user.id, deal_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "You are now the agent for this deal",
        "deal": deal,
    })))
}

pub async fn my_deals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let deals = state.deals().my_deals(user.id).await?;

    Ok(Json(json!({ "success": true, "deals": deals })))
}

pub async fn get_deal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(deal_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let deal = state.deals().deal(user.id, deal_id).await?;

    Ok(Json(json!({ "success": true, "deal": deal })))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(deal_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let messages = state.deals().chat(user.id, deal_id).await?;

    Ok(Json(json!({ "success": true, "messages": messages })))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(deal_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let message = state
        .deals()
        .send_message(user.id, user.role, deal_id, payload)
        .await?;

    Ok(Json(json!({ "success": true, "message": message })))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(deal_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateStatusRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    user.require(Role::Agent)?;
    let deal = state.deals().update_status(user.id, deal_id, payload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Deal status updated successfully",
        "deal": deal,
    })))
}
