//! Authentication handlers: login, token refresh, current operator.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fiado_core::Role;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

/// POST /auth/login
///
/// The same "invalid credentials" reply covers unknown usernames,
/// deactivated accounts, and wrong passwords.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.db.users().find_by_username(&req.username).await?;

    let Some(user) = user else {
        warn!(username = %req.username, "Login attempt for unknown or inactive user");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(username = %req.username, "Login attempt with wrong password");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let access_token = state
        .jwt
        .generate_access_token(&user.id, &user.username, user.role)?;
    let refresh_token = state
        .jwt
        .generate_refresh_token(&user.id, &user.username, user.role)?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, "Login");

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh
///
/// The account is re-checked against the database so a deactivated
/// operator cannot mint fresh tokens, and role changes take effect.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = state.jwt.validate_refresh_token(&req.refresh_token)?;

    let user = state
        .db
        .users()
        .find_by_username(&claims.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer active".to_string()))?;

    let access_token = state
        .jwt
        .generate_access_token(&user.id, &user.username, user.role)?;
    let refresh_token = state
        .jwt
        .generate_refresh_token(&user.id, &user.username, user.role)?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

/// GET /auth/me
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.user_id,
        username: auth.username,
        role: auth.role,
    })
}
