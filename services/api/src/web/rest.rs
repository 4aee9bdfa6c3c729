//! services/api/src/web/rest.rs
//!
//! Contains the public REST handlers and the master definition for the OpenAPI
//! specification.

use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::web::protocol::{
    CancelReminderArgs, CheckAnswerArgs, DailyQuestionArgs, ErrorDetail, ErrorResponse,
    ExamInfoArgs, FormulasArgs, GenerateQuizArgs, NotesArgs, PredictCollegesArgs,
    SetReminderArgs, StudyPlanArgs, ToolCallRequest, ToolCallResponse, ToolDescription,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::tools::call_tool_handler,
        crate::web::tools::list_tools_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ToolCallRequest,
            ToolCallResponse,
            ToolDescription,
            ErrorResponse,
            ErrorDetail,
            ExamInfoArgs,
            StudyPlanArgs,
            PredictCollegesArgs,
            GenerateQuizArgs,
            DailyQuestionArgs,
            CheckAnswerArgs,
            NotesArgs,
            FormulasArgs,
            SetReminderArgs,
            CancelReminderArgs,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Exam Prep Tool Server", description = "Quiz, progress, reminder and reference tools for exam preparation.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the tool routes.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check. Does not require a bearer token.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
