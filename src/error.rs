//! Error types for the stamp duty engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure a duty query or a purchasing power search can hit.

use thiserror::Error;

/// The main error type for the stamp duty engine.
///
/// Every error here is a deterministic function of the caller's input and
/// the static rule tables, so none of them is ever worth retrying. An
/// infeasible purchase is not an error: the solver reports it in its result.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::error::EngineError;
///
/// let error = EngineError::UnsupportedJurisdiction {
///     code: "XYZ".to_string(),
/// };
/// assert_eq!(error.to_string(), "Unsupported jurisdiction: XYZ");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller argument was missing, malformed, or out of range.
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// The offending field.
        field: String,
        /// A description of what was wrong with it.
        message: String,
    },

    /// The jurisdiction code is not one the engine implements.
    #[error("Unsupported jurisdiction: {code}")]
    UnsupportedJurisdiction {
        /// The code that was requested.
        code: String,
    },

    /// The jurisdiction's rule set exists but is not marked ready.
    #[error("Rule set for {jurisdiction} is not ready for use (status: {status})")]
    RuleSetNotReady {
        /// The jurisdiction code.
        jurisdiction: String,
        /// The status found in the rule set metadata.
        status: String,
    },

    /// A bracket schedule is internally inconsistent.
    #[error("Schedule error in {jurisdiction} mode '{mode}': {message}")]
    ScheduleError {
        /// The jurisdiction code.
        jurisdiction: String,
        /// The mode (schedule) name.
        mode: String,
        /// A description of the inconsistency.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`EngineError::ScheduleError`].
    pub fn schedule(
        jurisdiction: impl Into<String>,
        mode: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::ScheduleError {
            jurisdiction: jurisdiction.into(),
            mode: mode.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_displays_field_and_message() {
        let error = EngineError::invalid_input("price", "must be greater than zero");
        assert_eq!(
            error.to_string(),
            "Invalid input 'price': must be greater than zero"
        );
    }

    #[test]
    fn test_unsupported_jurisdiction_displays_code() {
        let error = EngineError::UnsupportedJurisdiction {
            code: "JBT".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported jurisdiction: JBT");
    }

    #[test]
    fn test_rule_set_not_ready_displays_status() {
        let error = EngineError::RuleSetNotReady {
            jurisdiction: "NSW".to_string(),
            status: "draft".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Rule set for NSW is not ready for use (status: draft)"
        );
    }

    #[test]
    fn test_schedule_error_displays_mode_and_message() {
        let error = EngineError::schedule("VIC", "established", "no open top tier");
        assert_eq!(
            error.to_string(),
            "Schedule error in VIC mode 'established': no open top tier"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/rules/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/rules/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::ConfigNotFound {
                path: "/test".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
