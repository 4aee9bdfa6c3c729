//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting the tool routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;
use crate::web::tools::ToolFailure;

/// The phone number the bearer token maps to. Used as the user id of every tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// Middleware that validates the `Authorization: Bearer` header.
///
/// If valid, inserts the caller's `CallerId` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ToolFailure> {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .is_some_and(|token| !token.is_empty() && token == state.config.auth_token);

    if !authorized {
        warn!(path = %req.uri().path(), "Rejected request without a valid bearer token");
        return Err(ToolFailure::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "A valid bearer token is required.",
        ));
    }

    req.extensions_mut()
        .insert(CallerId(state.config.my_number.clone()));
    Ok(next.run(req).await)
}
