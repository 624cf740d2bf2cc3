//! Response types for the stamp duty API.
//!
//! This module defines the success bodies that are not plain domain types,
//! the error response structure and the mapping from engine errors to HTTP
//! status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::calculation::StatutoryConcession;
use crate::config::RuleSet;
use crate::error::EngineError;
use crate::models::Jurisdiction;

/// What kind of first home concession a jurisdiction offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcessionKind {
    /// A built-in statutory concession.
    Statutory,
    /// Concession rules declared in the rule set.
    Declarative,
    /// First home schedules only, selected as modes.
    ModeOnly,
    /// No first home concession.
    None,
}

/// Feature summary for one jurisdiction, returned by `GET /jurisdictions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionSummary {
    /// Jurisdiction code.
    pub code: Jurisdiction,
    /// Financial year of the figures.
    pub financial_year: String,
    /// `ready` or `draft`.
    pub status: String,
    /// Mode names, sorted.
    pub modes: Vec<String>,
    /// Regions with their own first home mode, plus the primary region.
    pub regions: Vec<String>,
    /// Whether owner occupiers get their own schedule.
    pub supports_owner_occupier_mode: bool,
    /// First home concession mechanism.
    pub first_home_concession: ConcessionKind,
}

impl JurisdictionSummary {
    /// Summarizes a rule set.
    pub fn from_rule_set(rule_set: &RuleSet) -> Self {
        let meta = rule_set.meta();
        let has_first_home_mode = rule_set.modes().any(|s| s.name.starts_with("fhb_"));
        let first_home_concession = if StatutoryConcession::for_jurisdiction(meta.jurisdiction).is_some() {
            ConcessionKind::Statutory
        } else if !rule_set.concessions().is_empty() {
            ConcessionKind::Declarative
        } else if has_first_home_mode {
            ConcessionKind::ModeOnly
        } else {
            ConcessionKind::None
        };

        Self {
            code: meta.jurisdiction,
            financial_year: meta.financial_year.clone(),
            status: meta.status.as_str().to_string(),
            modes: rule_set.modes().map(|s| s.name.clone()).collect(),
            regions: rule_set.regions(),
            supports_owner_occupier_mode: meta.supports_owner_occupier_mode,
            first_home_concession,
        }
    }
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::InvalidInput { field, .. } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_INPUT",
                    message,
                    format!("Check the '{}' field and resubmit", field),
                ),
            },
            EngineError::UnsupportedJurisdiction { code } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "UNSUPPORTED_JURISDICTION",
                    message,
                    format!("The jurisdiction code '{}' is not supported by this engine", code),
                ),
            },
            EngineError::RuleSetNotReady { .. } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::with_details(
                    "RULE_SET_NOT_READY",
                    message,
                    "Draft figures are never used for computation",
                ),
            },
            EngineError::ScheduleError { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("SCHEDULE_ERROR", "Duty schedule error", message),
            },
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::invalid_input("price", "must be positive"), StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            (
                EngineError::UnsupportedJurisdiction { code: "XYZ".to_string() },
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_JURISDICTION",
            ),
            (
                EngineError::RuleSetNotReady {
                    jurisdiction: "SA".to_string(),
                    status: "draft".to_string(),
                },
                StatusCode::CONFLICT,
                "RULE_SET_NOT_READY",
            ),
            (
                EngineError::schedule("NSW", "established", "gap"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "SCHEDULE_ERROR",
            ),
            (
                EngineError::ConfigNotFound { path: "x".to_string() },
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
            ),
        ];
        for (error, status, code) in cases {
            let response: ApiErrorResponse = error.into();
            assert_eq!(response.status, status);
            assert_eq!(response.error.code, code);
        }
    }

    #[test]
    fn test_summary_concession_kinds() {
        let rules = ConfigLoader::builtin().unwrap();
        let kind = |j| {
            JurisdictionSummary::from_rule_set(rules.rule_set(j).unwrap()).first_home_concession
        };
        assert_eq!(kind(Jurisdiction::Nsw), ConcessionKind::Statutory);
        assert_eq!(kind(Jurisdiction::Tas), ConcessionKind::Declarative);
        assert_eq!(kind(Jurisdiction::Sa), ConcessionKind::None);
    }

    #[test]
    fn test_summary_lists_regions_and_modes() {
        let rules = ConfigLoader::builtin().unwrap();
        let summary = JurisdictionSummary::from_rule_set(rules.rule_set(Jurisdiction::Wa).unwrap());
        assert!(summary.regions.contains(&"regional".to_string()));
        assert!(summary.modes.contains(&"fhb_home_metro".to_string()));
        assert_eq!(summary.status, "ready");
    }
}
