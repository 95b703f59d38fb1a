//! Financial dashboard handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use fiado_core::Capability;
use fiado_db::DashboardSummary;

/// GET /dashboard/summary
pub async fn summary(
    auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardSummary>> {
    auth.require(Capability::ViewDashboard)?;

    let today = Utc::now().date_naive();
    let summary = state.db.dashboard().summary(today).await?;

    Ok(Json(summary))
}
