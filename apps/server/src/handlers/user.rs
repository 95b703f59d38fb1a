//! Operator account handlers. Admin-only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fiado_core::validation::validate_name;
use fiado_core::{Capability, CoreError, Role, User};

/// GET /users
pub async fn list(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    auth.require(Capability::ManageUsers)?;

    let users = state.db.users().list().await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
}

/// POST /users
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    auth.require(Capability::ManageUsers)?;

    validate_name(&req.display_name).map_err(CoreError::from)?;
    if req.username.trim().is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        display_name: req.display_name,
        password_hash: hash_password(&req.password)?,
        role: req.role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.users().insert(&user).await?;
    info!(user_id = %user.id, username = %user.username, role = %user.role, by = %auth.username, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /users/:id/deactivate
///
/// Deactivation, not deletion: sales and audit rows keep referencing the
/// account. Admins cannot deactivate themselves.
pub async fn deactivate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require(Capability::ManageUsers)?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest(
            "Cannot deactivate your own account".to_string(),
        ));
    }

    state.db.users().deactivate(&id).await?;
    info!(user_id = %id, by = %auth.username, "User deactivated");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

/// PUT /users/:id/password
///
/// Operators may change their own password; admins may change anyone's.
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    if id != auth.user_id {
        auth.require(Capability::ManageUsers)?;
    }

    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let hash = hash_password(&req.password)?;
    state.db.users().update_password(&id, &hash).await?;
    info!(user_id = %id, by = %auth.username, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}
