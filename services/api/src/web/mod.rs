pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod tools;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_bearer;
pub use rest::{health_handler, ApiDoc};
pub use state::AppState;
pub use tools::{call_tool_handler, list_tools_handler};

/// Builds the full application router: public health check, bearer-protected
/// tool routes, and the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/tools", get(list_tools_handler))
        .route("/tools/call", post(call_tool_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_bearer,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
