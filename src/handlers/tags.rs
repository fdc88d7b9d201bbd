use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::PermissionLevel;
use crate::middleware::CurrentPrincipal;
use crate::policy;
use crate::state::AppState;

/// GET /api/tags - every known tag
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tags = state.tags.list().await?;
    Ok(Json(json!({ "success": true, "data": tags })))
}

/// DELETE /api/tags/:id - admins only; clears every junction table before
/// removing the tag row
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    policy::require(principal.as_ref(), PermissionLevel::Admin)?;
    state.tags.delete_tag(id).await?;
    Ok(Json(json!({ "success": true })))
}
