//! Authentication middleware for JWT token validation

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::Role,
    state::AppState,
};

/// Authenticated user information
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Refuse callers acting under another role
    pub fn require(&self, role: Role) -> ApiResult<()> {
        if self.role != role {
            return Err(ApiError::forbidden(format!("Only {role}s can do this")));
        }
        Ok(())
    }
}

/// The bearer token the request was authenticated with, kept for logout
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub token: String,
    pub expires_at: u64,
}

fn unauthenticated(message: &str) -> ApiError {
    ApiError::Unauthenticated(message.to_string())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| unauthenticated("Authentication required"))?;
    let token = bearer.token();

    let claims = state.jwt_service.verify(token).map_err(|e| {
        warn!("Rejected token: {}", e);
        unauthenticated("Invalid or expired token")
    })?;

    let revoked = state.revocations.is_revoked(token).await.map_err(|e| {
        error!("Failed to check token revocation: {}", e);
        ApiError::from(e)
    })?;
    if revoked {
        return Err(unauthenticated("Token has been revoked"));
    }

    let user = state
        .repositories
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active && u.role == claims.role)
        .ok_or_else(|| unauthenticated("Account is not active"))?;

    let token = token.to_string();
    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });
    req.extensions_mut().insert(BearerToken {
        token,
        expires_at: claims.exp,
    });

    Ok(next.run(req).await)
}
