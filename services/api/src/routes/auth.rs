//! Signup, login, logout and profiles

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    accounts::Signup,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, BearerToken},
    models::{LoginRequest, SignupRequest, UserSummary},
    state::AppState,
};

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let limiter_key = payload.email.trim().to_ascii_lowercase();
    if !state.login_limiter.is_allowed(&limiter_key).await {
        warn!("Login rate limit hit for {}", limiter_key);
        return Err(ApiError::RateLimited);
    }

    let user = state.accounts().authenticate(&payload).await?;
    state.login_limiter.reset(&limiter_key).await;

    let token = state.jwt_service.issue(&user)?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "expiresIn": state.jwt_service.lifetime(),
        "user": user,
    })))
}

/// User signup endpoint; sponsors are queued for approval instead of logged in
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    match state.accounts().signup(payload).await? {
        Signup::Registered(user) => {
            let token = state.jwt_service.issue(&user)?;
            info!("User {} signed up as {}", user.id, user.role);

            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "token": token,
                    "expiresIn": state.jwt_service.lifetime(),
                    "user": user,
                })),
            ))
        }
        Signup::PendingApproval(application) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "success": true,
                "pendingApproval": true,
                "message": "Your sponsor application has been submitted and is pending admin approval",
                "application": application,
            })),
        )),
    }
}

/// Logout endpoint; the presented token stops working immediately
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(bearer): Extension<BearerToken>,
) -> ApiResult<impl IntoResponse> {
    state
        .revocations
        .revoke(&bearer.token, bearer.expires_at)
        .await?;
    info!("User {} logged out", user.id);

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

/// The caller's own account
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts().profile(user.id).await?;

    Ok(Json(json!({ "success": true, "user": user })))
}

/// Public profile of another user
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts().profile(user_id).await?;

    Ok(Json(json!({ "success": true, "user": UserSummary::from(&user) })))
}
