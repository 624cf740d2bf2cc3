//! Duty assessment models.
//!
//! This module contains the [`DutyAssessment`] returned by the duty engine
//! together with the audit trail recording how the figure was reached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Jurisdiction, PropertyType};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Where an applied concession came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcessionSource {
    /// A jurisdiction law built into the engine.
    Statutory,
    /// A rule from the rule set's `fhb` configuration.
    Declarative,
}

/// A concession that changed the duty payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedConcession {
    /// Statutory or declarative.
    pub source: ConcessionSource,
    /// Identifier of the rule, e.g. `nsw_first_home_taper`.
    pub rule_id: String,
    /// Duty removed by the concession (base duty minus final duty).
    pub reduction: Decimal,
}

/// The outcome of a duty query.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::models::{DutyAssessment, Jurisdiction, PropertyType};
/// use rust_decimal::Decimal;
///
/// let assessment = DutyAssessment {
///     jurisdiction: Jurisdiction::Sa,
///     price: Decimal::from(500_000),
///     property_type: PropertyType::Home,
///     mode: "established".to_string(),
///     base_duty: Decimal::from(21_330),
///     duty: Decimal::from(21_330),
///     concession: None,
///     audit_trace: vec![],
/// };
/// assert_eq!(assessment.concession_reduction(), Decimal::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyAssessment {
    /// Jurisdiction the duty was assessed under.
    pub jurisdiction: Jurisdiction,
    /// The dutiable value.
    pub price: Decimal,
    /// Home or land.
    pub property_type: PropertyType,
    /// The schedule (mode) the base duty came from.
    pub mode: String,
    /// Duty before any concession, whole dollars.
    pub base_duty: Decimal,
    /// Duty payable, whole dollars.
    pub duty: Decimal,
    /// The concession that applied, if any.
    pub concession: Option<AppliedConcession>,
    /// Every decision made, in order.
    pub audit_trace: Vec<AuditStep>,
}

impl DutyAssessment {
    /// Duty removed by a concession, zero when none applied.
    pub fn concession_reduction(&self) -> Decimal {
        self.concession
            .as_ref()
            .map(|c| c.reduction)
            .unwrap_or(Decimal::ZERO)
    }
}
