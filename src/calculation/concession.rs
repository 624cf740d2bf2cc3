//! First home concessions.
//!
//! Two kinds of concession rule exist. Statutory concessions are
//! jurisdiction laws built into the engine with their thresholds fixed in
//! code; declarative concessions come from a rule set's `fhb` section.
//! Statutory rules are consulted first, then declarative rules in order.
//! Both reduce to a [`TaperLaw`]: full exemption up to a threshold, then
//! duty phasing back in until a taper end price.

use rust_decimal::Decimal;
use serde_json::json;

use crate::config::{ConcessionRule, RuleSet, Schedule, TaperShape, ESTABLISHED_MODE};
use crate::error::{EngineError, EngineResult};
use crate::models::{ConcessionSource, Jurisdiction, PropertyType};

use super::evaluator::{evaluate_schedule, round_to_dollar};
use super::mode_selector::{ModeSelection, OWNER_OCCUPIER_MODE};

/// Jurisdiction concessions whose thresholds are fixed in law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatutoryConcession {
    /// NSW first home buyers: exempt to $800,000, tapering against the
    /// buyer's own duty to $1,000,000.
    NswFirstHome,
    /// VIC first home buyers: exempt to $600,000, tapering against the
    /// general schedule to $750,000.
    VicFirstHome,
    /// QLD first home concession: exempt to $700,000, then a rebate
    /// shrinking by $1,735 per $10,000 against the home concession rate,
    /// gone at $800,000. Owner occupiers only.
    QldFirstHome,
}

impl StatutoryConcession {
    /// Returns the statutory concession a jurisdiction has, if any.
    pub fn for_jurisdiction(jurisdiction: Jurisdiction) -> Option<Self> {
        match jurisdiction {
            Jurisdiction::Nsw => Some(StatutoryConcession::NswFirstHome),
            Jurisdiction::Vic => Some(StatutoryConcession::VicFirstHome),
            Jurisdiction::Qld => Some(StatutoryConcession::QldFirstHome),
            _ => None,
        }
    }

    fn rule_id(self) -> &'static str {
        match self {
            StatutoryConcession::NswFirstHome => "nsw_first_home_taper",
            StatutoryConcession::VicFirstHome => "vic_first_home_taper",
            StatutoryConcession::QldFirstHome => "qld_first_home_step_rebate",
        }
    }

    fn matches(self, property_type: PropertyType, is_owner_occupier: bool) -> bool {
        match self {
            StatutoryConcession::NswFirstHome | StatutoryConcession::VicFirstHome => {
                property_type == PropertyType::Home
            }
            StatutoryConcession::QldFirstHome => {
                property_type == PropertyType::Home && is_owner_occupier
            }
        }
    }

    fn law(self) -> TaperLaw<'static> {
        match self {
            StatutoryConcession::NswFirstHome => TaperLaw {
                exempt_up_to: Decimal::from(800_000),
                taper_end: Some(Decimal::from(1_000_000)),
                taper: Taper::LinearToFull,
                basis: Basis::SelectedMode,
            },
            StatutoryConcession::VicFirstHome => TaperLaw {
                exempt_up_to: Decimal::from(600_000),
                taper_end: Some(Decimal::from(750_000)),
                taper: Taper::LinearToFull,
                basis: Basis::Named(ESTABLISHED_MODE),
            },
            StatutoryConcession::QldFirstHome => TaperLaw {
                exempt_up_to: Decimal::from(700_000),
                taper_end: Some(Decimal::from(800_000)),
                taper: Taper::StepRebate {
                    step_amount: Decimal::from(1_735),
                    step_interval: Decimal::from(10_000),
                },
                basis: Basis::Named(OWNER_OCCUPIER_MODE),
            },
        }
    }
}

/// A concession rule of either kind.
#[derive(Debug, Clone, Copy)]
pub enum Concession<'a> {
    /// Built-in jurisdiction law.
    Statutory(StatutoryConcession),
    /// Rule from the rule set, with its position in the list.
    Declarative {
        /// Position of the rule in the rule set's `fhb` list.
        index: usize,
        /// The rule.
        rule: &'a ConcessionRule,
    },
}

impl<'a> Concession<'a> {
    /// Finds the concession for a purchase: statutory first, then the first
    /// matching declarative rule.
    pub fn find(
        rule_set: &'a RuleSet,
        property_type: PropertyType,
        is_owner_occupier: bool,
    ) -> Option<Self> {
        if let Some(statutory) = StatutoryConcession::for_jurisdiction(rule_set.jurisdiction())
            .filter(|s| s.matches(property_type, is_owner_occupier))
        {
            return Some(Concession::Statutory(statutory));
        }

        rule_set
            .concessions()
            .iter()
            .enumerate()
            .find(|(_, rule)| {
                rule.applies_when.property_type.covers(property_type)
                    && (!rule.applies_when.owner_occupier_required || is_owner_occupier)
            })
            .map(|(index, rule)| Concession::Declarative { index, rule })
    }

    /// Identifier used in audit output.
    pub fn rule_id(&self) -> String {
        match self {
            Concession::Statutory(s) => s.rule_id().to_string(),
            Concession::Declarative { index, .. } => format!("fhb_rule_{}", index),
        }
    }

    /// Statutory or declarative.
    pub fn source(&self) -> ConcessionSource {
        match self {
            Concession::Statutory(_) => ConcessionSource::Statutory,
            Concession::Declarative { .. } => ConcessionSource::Declarative,
        }
    }

    fn law(&self) -> TaperLaw<'a> {
        match self {
            Concession::Statutory(s) => s.law(),
            Concession::Declarative { rule, .. } => TaperLaw::from_rule(rule),
        }
    }
}

/// Which schedule a taper is measured against.
#[derive(Debug, Clone, Copy)]
enum Basis<'a> {
    SelectedMode,
    Named(&'a str),
}

#[derive(Debug, Clone, Copy)]
enum Taper {
    None,
    LinearToFull,
    LinearToCap {
        cap_price: Decimal,
    },
    StepRebate {
        step_amount: Decimal,
        step_interval: Decimal,
    },
}

/// Exemption threshold plus how duty phases back in above it.
#[derive(Debug, Clone, Copy)]
struct TaperLaw<'a> {
    exempt_up_to: Decimal,
    taper_end: Option<Decimal>,
    taper: Taper,
    basis: Basis<'a>,
}

impl<'a> TaperLaw<'a> {
    fn from_rule(rule: &'a ConcessionRule) -> Self {
        // Compiled rule sets guarantee the shape parameters are present.
        let taper = match (rule.taper_end_price, rule.taper_shape) {
            (None, _) | (_, None) => Taper::None,
            (Some(_), Some(TaperShape::LinearToFull)) => Taper::LinearToFull,
            (Some(_), Some(TaperShape::LinearToCap)) => Taper::LinearToCap {
                cap_price: rule.cap_price.unwrap_or_default(),
            },
            (Some(_), Some(TaperShape::StepRebate)) => Taper::StepRebate {
                step_amount: rule.step_amount.unwrap_or_default(),
                step_interval: rule.step_interval.unwrap_or(Decimal::ONE),
            },
        };
        Self {
            exempt_up_to: rule.full_exemption_up_to,
            taper_end: rule.taper_end_price,
            taper,
            basis: rule
                .basis_mode
                .as_deref()
                .map_or(Basis::SelectedMode, Basis::Named),
        }
    }
}

/// The duty after a concession, with its working.
#[derive(Debug, Clone)]
pub struct ConcessionOutcome {
    /// Identifier of the rule.
    pub rule_id: String,
    /// Statutory or declarative.
    pub source: ConcessionSource,
    /// Duty payable after the concession.
    pub duty: Decimal,
    /// Inputs and intermediate figures for the audit trail.
    pub detail: serde_json::Value,
    /// Human-readable explanation.
    pub reasoning: String,
}

/// Applies a concession to the base duty.
///
/// Returns `Ok(None)` when the price is at or above the taper end (or above
/// an untapered exemption), in which case the base duty stands. The result
/// never exceeds the base duty.
///
/// # Errors
///
/// Returns `ScheduleError` if a basis schedule the concession refers to is
/// missing or cannot price the purchase.
pub fn apply_concession(
    rule_set: &RuleSet,
    concession: &Concession<'_>,
    selection: &ModeSelection<'_>,
    price: Decimal,
    base_duty: Decimal,
) -> EngineResult<Option<ConcessionOutcome>> {
    let law = concession.law();
    let jurisdiction = rule_set.jurisdiction();
    let rule_id = concession.rule_id();

    let outcome = |duty: Decimal, detail: serde_json::Value, reasoning: String| ConcessionOutcome {
        rule_id: rule_id.clone(),
        source: concession.source(),
        // Never dearer than the buyer's own schedule.
        duty: duty.min(base_duty),
        detail,
        reasoning,
    };

    if price <= law.exempt_up_to {
        return Ok(Some(outcome(
            Decimal::ZERO,
            json!({ "exempt_up_to": law.exempt_up_to.to_string() }),
            format!(
                "Price ${} is at or below the ${} exemption threshold - no duty payable",
                price, law.exempt_up_to
            ),
        )));
    }

    let taper_end = match law.taper_end {
        Some(end) if price < end && !matches!(law.taper, Taper::None) => end,
        _ => return Ok(None),
    };

    let basis: &Schedule = match law.basis {
        Basis::SelectedMode => selection.schedule,
        Basis::Named(name) => rule_set.require_schedule(name)?,
    };
    let fraction = (price - law.exempt_up_to) / (taper_end - law.exempt_up_to);

    let (duty, detail, reasoning) = match law.taper {
        Taper::LinearToFull => {
            let target = evaluate_schedule(jurisdiction, basis, price)?;
            let duty = round_to_dollar(target * fraction);
            (
                duty,
                json!({
                    "basis_mode": basis.name,
                    "target_duty": target.to_string(),
                    "taper_fraction": fraction.round_dp(6).to_string(),
                }),
                format!(
                    "${} '{}' duty x {} of the way from ${} to ${} = ${}",
                    target,
                    basis.name,
                    fraction.round_dp(6),
                    law.exempt_up_to,
                    taper_end,
                    duty
                ),
            )
        }
        Taper::LinearToCap { cap_price } => {
            let target = evaluate_schedule(jurisdiction, basis, cap_price)?;
            let duty = round_to_dollar(target * fraction);
            (
                duty,
                json!({
                    "basis_mode": basis.name,
                    "cap_price": cap_price.to_string(),
                    "target_duty": target.to_string(),
                    "taper_fraction": fraction.round_dp(6).to_string(),
                }),
                format!(
                    "${} '{}' duty at the ${} cap x {} = ${}",
                    target,
                    basis.name,
                    cap_price,
                    fraction.round_dp(6),
                    duty
                ),
            )
        }
        Taper::StepRebate {
            step_amount,
            step_interval,
        } => {
            let target = evaluate_schedule(jurisdiction, basis, price)?;
            let max_rebate = evaluate_schedule(jurisdiction, basis, law.exempt_up_to)?;
            let steps = ((price - law.exempt_up_to) / step_interval).ceil();
            let rebate = (max_rebate - steps * step_amount).max(Decimal::ZERO);
            let duty = round_to_dollar((target - rebate).max(Decimal::ZERO));
            (
                duty,
                json!({
                    "basis_mode": basis.name,
                    "target_duty": target.to_string(),
                    "max_rebate": max_rebate.to_string(),
                    "steps": steps.to_string(),
                    "rebate": rebate.to_string(),
                }),
                format!(
                    "${} '{}' duty less rebate ${} (${} - {} steps x ${}) = ${}",
                    target, basis.name, rebate, max_rebate, steps, step_amount, duty
                ),
            )
        }
        Taper::None => {
            return Err(EngineError::schedule(
                jurisdiction.code(),
                rule_id.as_str(),
                "taper end declared without a taper shape",
            ));
        }
    };

    Ok(Some(outcome(duty, detail, reasoning)))
}
