use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::identity::Principal;
use crate::state::AppState;

/// The request's resolved caller, injected by the auth middleware. `None`
/// means anonymous. Handlers thread this into the policy gates explicitly.
#[derive(Clone, Debug)]
pub struct CurrentPrincipal(pub Option<Principal>);

/// Extract the bearer token from the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Middleware for public routes: a bad credential or missing profile
/// degrades the request to anonymous instead of failing it.
pub async fn optional_principal(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers);
    let principal = state.resolver.resolve_optional(token.as_deref()).await?;
    request.extensions_mut().insert(CurrentPrincipal(principal));
    Ok(next.run(request).await)
}

/// Middleware for protected routes: resolution fails closed. A missing
/// credential still passes through as anonymous so the route-level policy
/// gate can report `Unauthenticated` itself.
pub async fn require_principal(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers);
    let principal = state.resolver.resolve(token.as_deref()).await?;
    request.extensions_mut().insert(CurrentPrincipal(principal));
    Ok(next.run(request).await)
}
