use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::compliance::CustomerType;
use super::domain::{ApplicationDraft, ComplianceResult, LoanInputs, RulesEvaluation};
use super::duplicates::DuplicateWarning;
use super::service::{DecisionDeskService, DeskServiceError};
use crate::workflows::ensemble::ModelEnsemble;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceQuoteRequest {
    #[serde(flatten)]
    pub inputs: LoanInputs,
    #[serde(default)]
    pub customer_type: CustomerType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionCheckRequest {
    pub draft: ApplicationDraft,
    #[serde(default)]
    pub compliance: Option<ComplianceResult>,
    #[serde(default)]
    pub rules_evaluation: Option<RulesEvaluation>,
}

/// Router exposing the loan decision desk.
pub fn desk_router(service: Arc<DecisionDeskService>) -> Router {
    Router::new()
        .route("/api/v1/loans/affordability", post(affordability_handler))
        .route("/api/v1/loans/compliance", post(compliance_handler))
        .route("/api/v1/loans/validate", post(validate_handler))
        .route("/api/v1/loans/submission-check", post(submission_handler))
        .route("/api/v1/loans/duplicates", post(duplicates_handler))
        .route("/api/v1/ensembles/analyze", post(ensemble_handler))
        .with_state(service)
}

pub(crate) async fn affordability_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(inputs): axum::Json<LoanInputs>,
) -> Response {
    match service.affordability(&inputs) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn compliance_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(request): axum::Json<ComplianceQuoteRequest>,
) -> Response {
    match service.compliance_report(&request.inputs, request.customer_type) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn validate_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(draft): axum::Json<ApplicationDraft>,
) -> Response {
    match service.validate(&draft).await {
        Ok(results) => (StatusCode::OK, axum::Json(results)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submission_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(request): axum::Json<SubmissionCheckRequest>,
) -> Response {
    let decision = service.submission_check(
        &request.draft,
        request.compliance.as_ref(),
        request.rules_evaluation.as_ref(),
    );
    (StatusCode::OK, axum::Json(decision)).into_response()
}

pub(crate) async fn duplicates_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(draft): axum::Json<ApplicationDraft>,
) -> Response {
    let warning = service.duplicate_warning(&draft).await;
    (StatusCode::OK, axum::Json(DuplicateWarning { warning })).into_response()
}

pub(crate) async fn ensemble_handler(
    State(service): State<Arc<DecisionDeskService>>,
    axum::Json(ensemble): axum::Json<ModelEnsemble>,
) -> Response {
    match service.analyze_ensemble(&ensemble) {
        Ok(analysis) => (StatusCode::OK, axum::Json(analysis)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: DeskServiceError) -> Response {
    let kind = match &err {
        DeskServiceError::Input(_) => "invalid_input",
        DeskServiceError::Ensemble(_) => "invalid_ensemble",
    };
    let payload = json!({
        "error": err.to_string(),
        "kind": kind,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}
