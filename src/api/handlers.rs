//! HTTP request handlers for the stamp duty API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::affordability::AffordabilitySolver;
use crate::calculation::DutyEngine;
use crate::error::EngineError;

use super::request::{DutyRequest, MaxPriceRequest};
use super::response::{ApiError, ApiErrorResponse, JurisdictionSummary};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/jurisdictions", get(jurisdictions_handler))
        .route("/duty", post(duty_handler))
        .route("/max-price", post(max_price_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}

fn engine_error_response(correlation_id: Uuid, error: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        error = %error,
        "Request failed"
    );
    let api_error: ApiErrorResponse = error.into();
    json_response(api_error.status, api_error.error)
}

/// Turns a JSON extraction failure into a 400 response.
fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's own description of the problem.
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for GET /jurisdictions.
///
/// Lists each loaded jurisdiction with its modes, regions and concession
/// mechanism.
async fn jurisdictions_handler(State(state): State<AppState>) -> Response {
    let summaries: Vec<JurisdictionSummary> = state
        .rules()
        .rule_sets()
        .map(JurisdictionSummary::from_rule_set)
        .collect();
    json_response(StatusCode::OK, summaries)
}

/// Handler for POST /duty.
///
/// Returns the duty assessment, audit trail included.
async fn duty_handler(
    State(state): State<AppState>,
    payload: Result<Json<DutyRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing duty request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    let engine = DutyEngine::new(state.rules());
    match request.into_profile().and_then(|profile| engine.assess(&profile)) {
        Ok(assessment) => {
            info!(
                correlation_id = %correlation_id,
                jurisdiction = %assessment.jurisdiction,
                price = %assessment.price,
                mode = %assessment.mode,
                duty = %assessment.duty,
                duration_us = start_time.elapsed().as_micros(),
                "Duty calculated successfully"
            );
            json_response(StatusCode::OK, assessment)
        }
        Err(err) => engine_error_response(correlation_id, err),
    }
}

/// Handler for POST /max-price.
///
/// Returns the maximum affordable price and its feasibility proof.
async fn max_price_handler(
    State(state): State<AppState>,
    payload: Result<Json<MaxPriceRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing max price request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    let solver = AffordabilitySolver::new(state.rules());
    match request.into_input().and_then(|input| solver.solve_max_price(&input)) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                max_price = %result.max_price,
                feasible = result.feasible,
                iterations = result.iterations,
                duration_us = start_time.elapsed().as_micros(),
                "Max price solved successfully"
            );
            json_response(StatusCode::OK, result)
        }
        Err(err) => engine_error_response(correlation_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let rules = ConfigLoader::load("./config").expect("Failed to load config");
        AppState::new(rules)
    }

    async fn post_json(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_duty_returns_200() {
        let (status, body) =
            post_json("/duty", r#"{"jurisdiction": "NSW", "price": "750000"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["duty"], "28279");
        assert_eq!(body["mode"], "established");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let (status, body) = post_json("/duty", "{ not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_price_returns_validation_error() {
        let (status, body) = post_json("/duty", r#"{"jurisdiction": "NSW"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_jurisdiction_returns_400() {
        let (status, body) =
            post_json("/duty", r#"{"jurisdiction": "XYZ", "price": "500000"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNSUPPORTED_JURISDICTION");
    }
}
