pub mod articles;
pub mod auth;
pub mod courses;
pub mod projects;
pub mod tags;

use axum::Json;
use serde_json::{json, Value};

use crate::content::ContentView;
use crate::error::ApiError;
use crate::policy::PreviewReason;

/// Map a detail-view decision onto HTTP: previews are not enough for a
/// full-detail endpoint, so they surface as 401/403 depending on what the
/// caller is missing. List endpoints render previews inline instead.
pub(crate) fn view_response(view: ContentView) -> Result<Json<Value>, ApiError> {
    match view {
        ContentView::Full(value) => Ok(Json(json!({ "success": true, "data": value }))),
        ContentView::Preview {
            reason: PreviewReason::AuthenticationRequired,
            ..
        } => Err(ApiError::unauthorized(
            "Authentication required for full access",
        )),
        ContentView::Preview {
            reason: PreviewReason::SubscriptionRequired,
            ..
        } => Err(ApiError::forbidden("Subscription required for full access")),
    }
}
