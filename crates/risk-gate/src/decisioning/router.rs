use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::bureau::BureauClient;
use super::config::DecisionConfig;
use super::domain::{EvaluationId, EvaluationRequest};
use super::repository::{AlternateDataProvider, EvaluationRepository, RepositoryError};
use super::service::{EvaluationServiceError, RiskDecisionService};

/// Router builder exposing evaluation, lookup, explanation, and configuration endpoints.
pub fn evaluation_router<R, B, D>(service: Arc<RiskDecisionService<R, B, D>>) -> Router
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    Router::new()
        .route("/api/v1/evaluations", post(evaluate_handler::<R, B, D>))
        .route(
            "/api/v1/evaluations/:evaluation_id",
            get(record_handler::<R, B, D>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/explain",
            get(explain_handler::<R, B, D>),
        )
        .route(
            "/api/v1/decision-config",
            get(current_config_handler::<R, B, D>).put(replace_config_handler::<R, B, D>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<R, B, D>(
    State(service): State<Arc<RiskDecisionService<R, B, D>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    match service.evaluate(request).await {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error, None),
    }
}

pub(crate) async fn record_handler<R, B, D>(
    State(service): State<Arc<RiskDecisionService<R, B, D>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    let id = EvaluationId(evaluation_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error, Some(&id)),
    }
}

pub(crate) async fn explain_handler<R, B, D>(
    State(service): State<Arc<RiskDecisionService<R, B, D>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    let id = EvaluationId(evaluation_id);
    match service.explain(&id) {
        Ok(explanation) => (StatusCode::OK, axum::Json(explanation)).into_response(),
        Err(error) => error_response(error, Some(&id)),
    }
}

pub(crate) async fn current_config_handler<R, B, D>(
    State(service): State<Arc<RiskDecisionService<R, B, D>>>,
) -> Response
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    let config = service.config_store().current();
    (StatusCode::OK, axum::Json(config.as_ref().clone())).into_response()
}

pub(crate) async fn replace_config_handler<R, B, D>(
    State(service): State<Arc<RiskDecisionService<R, B, D>>>,
    axum::Json(config): axum::Json<DecisionConfig>,
) -> Response
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    match service.replace_config(config) {
        Ok(active) => {
            let payload = json!({
                "status": "active",
                "version": active.version,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error, None),
    }
}

fn error_response(error: EvaluationServiceError, id: Option<&EvaluationId>) -> Response {
    match error {
        EvaluationServiceError::Intake(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        EvaluationServiceError::Config(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        EvaluationServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "error": "evaluation not found",
                "evaluation_id": id.map(|id| id.0.clone()),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        EvaluationServiceError::Repository(RepositoryError::Conflict) => {
            let payload = json!({
                "error": "evaluation already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
