use axum::{extract::Extension, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::identity::PermissionLevel;
use crate::middleware::CurrentPrincipal;
use crate::policy;

/// GET /api/auth/whoami - echo the resolved principal
pub async fn whoami(
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let principal = policy::require(principal.as_ref(), PermissionLevel::Guest)?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "member_id": principal.member_id,
            "level": principal.level,
            "is_subscriber": principal.is_subscriber,
        }
    })))
}
