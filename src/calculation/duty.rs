//! The duty resolution engine.
//!
//! [`DutyEngine`] is the single entry point for duty queries. It checks the
//! input, refuses draft rule sets, selects a mode, evaluates the base duty
//! and applies any first home concession, recording each decision as an
//! [`AuditStep`].

use rust_decimal::Decimal;
use serde_json::json;
use tracing::debug;

use crate::config::RuleBook;
use crate::error::{EngineError, EngineResult};
use crate::models::{AppliedConcession, AuditStep, BuyerFlags, BuyerProfile, DutyAssessment, Jurisdiction};

use super::concession::{apply_concession, Concession};
use super::evaluator::{evaluate_schedule, find_bracket};
use super::mode_selector::{select_mode, ModeKind};

/// Computes stamp duty against an immutable [`RuleBook`].
///
/// The engine holds no state of its own, so one instance (or many) can
/// serve concurrent queries.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::calculation::DutyEngine;
/// use stamp_duty_engine::config::ConfigLoader;
/// use stamp_duty_engine::models::{BuyerFlags, Jurisdiction};
/// use rust_decimal::Decimal;
///
/// let engine = DutyEngine::new(ConfigLoader::builtin()?);
/// let duty = engine.calc_duty(Jurisdiction::Sa, Decimal::from(500_000), &BuyerFlags::default())?;
/// assert_eq!(duty, Decimal::from(21_330));
/// # Ok::<(), stamp_duty_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DutyEngine<'a> {
    rules: &'a RuleBook,
}

impl<'a> DutyEngine<'a> {
    /// Creates an engine over a rule book.
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// The rule book the engine evaluates against.
    pub fn rules(&self) -> &'a RuleBook {
        self.rules
    }

    /// Returns the whole-dollar duty payable.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the price is not positive
    /// - `UnsupportedJurisdiction` if the rule book has no rule set for it
    /// - `RuleSetNotReady` if the rule set is a draft
    /// - `ScheduleError` if a schedule cannot price the purchase
    pub fn calc_duty(
        &self,
        jurisdiction: Jurisdiction,
        price: Decimal,
        flags: &BuyerFlags,
    ) -> EngineResult<Decimal> {
        self.evaluate(jurisdiction, price, flags).map(|a| a.duty)
    }

    /// Returns the full assessment for a purchase, including its audit trail.
    ///
    /// Fails under the same conditions as [`DutyEngine::calc_duty`].
    pub fn assess(&self, profile: &BuyerProfile) -> EngineResult<DutyAssessment> {
        self.evaluate(profile.jurisdiction, profile.price, &profile.flags)
    }

    fn evaluate(
        &self,
        jurisdiction: Jurisdiction,
        price: Decimal,
        flags: &BuyerFlags,
    ) -> EngineResult<DutyAssessment> {
        if price <= Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "price",
                format!("must be greater than zero, got {}", price),
            ));
        }

        let rule_set = self.rules.ready_rule_set(jurisdiction)?;
        let property_type = flags.property_type();
        let mut audit_trace = Vec::new();

        let selection = select_mode(rule_set, price, flags)?;
        audit_trace.push(AuditStep {
            step_number: 1,
            rule_id: "mode_selection".to_string(),
            rule_name: "Duty Mode Selection".to_string(),
            input: json!({
                "price": price.to_string(),
                "property_type": property_type.as_str(),
                "is_owner_occupier": flags.is_owner_occupier,
                "is_first_home_buyer": flags.is_first_home_buyer,
                "region": selection.region,
            }),
            output: json!({
                "mode": selection.schedule.name,
                "kind": selection.kind,
                "inherited_from": selection.schedule.inherited_from,
            }),
            reasoning: mode_reasoning(selection.kind, &selection.schedule.name, &selection.region),
        });

        let base_duty = evaluate_schedule(jurisdiction, selection.schedule, price)?;
        let base_step = if selection.kind == ModeKind::ClosedForm {
            AuditStep {
                step_number: 2,
                rule_id: "closed_form_duty".to_string(),
                rule_name: "Closed-Form Duty".to_string(),
                input: json!({ "price": price.to_string() }),
                output: json!({ "base_duty": base_duty.to_string() }),
                reasoning: format!("Polynomial duty on ${} = ${}", price, base_duty),
            }
        } else {
            let bracket = find_bracket(&selection.schedule.rows, price);
            AuditStep {
                step_number: 2,
                rule_id: "bracket_duty".to_string(),
                rule_name: "Bracket Duty".to_string(),
                input: json!({
                    "price": price.to_string(),
                    "lower_inclusive": bracket.map(|b| b.lower_inclusive.to_string()),
                    "upper_exclusive": bracket.and_then(|b| b.upper_exclusive).map(|u| u.to_string()),
                }),
                output: json!({ "base_duty": base_duty.to_string() }),
                reasoning: match bracket {
                    Some(b) => format!(
                        "${} + {} x (${} - ${}) = ${}",
                        b.base,
                        b.marginal_rate.normalize(),
                        price,
                        b.applies_above_threshold,
                        base_duty
                    ),
                    None => format!("Base duty ${}", base_duty),
                },
            }
        };
        audit_trace.push(base_step);

        let mut duty = base_duty;
        let mut concession = None;

        if !flags.is_first_home_buyer {
            debug!(%jurisdiction, %price, "Not a first home buyer, no concession");
        } else if selection.kind.is_first_home_schedule() {
            audit_trace.push(AuditStep {
                step_number: 3,
                rule_id: "concession".to_string(),
                rule_name: "First Home Concession".to_string(),
                input: json!({ "mode": selection.schedule.name }),
                output: json!({ "duty": duty.to_string() }),
                reasoning: format!(
                    "Mode '{}' already carries the first home concession",
                    selection.schedule.name
                ),
            });
        } else if let Some(rule) = Concession::find(rule_set, property_type, flags.is_owner_occupier) {
            let outcome = apply_concession(rule_set, &rule, &selection, price, base_duty)?;
            let step_number = audit_trace.len() as u32 + 1;
            match outcome {
                Some(outcome) => {
                    duty = outcome.duty;
                    audit_trace.push(AuditStep {
                        step_number,
                        rule_id: outcome.rule_id.clone(),
                        rule_name: "First Home Concession".to_string(),
                        input: outcome.detail,
                        output: json!({
                            "base_duty": base_duty.to_string(),
                            "duty": duty.to_string(),
                        }),
                        reasoning: outcome.reasoning,
                    });
                    concession = Some(AppliedConcession {
                        source: outcome.source,
                        rule_id: outcome.rule_id,
                        reduction: base_duty - duty,
                    });
                }
                None => audit_trace.push(AuditStep {
                    step_number,
                    rule_id: rule.rule_id(),
                    rule_name: "First Home Concession".to_string(),
                    input: json!({ "price": price.to_string() }),
                    output: json!({ "duty": duty.to_string() }),
                    reasoning: format!(
                        "Price ${} is beyond the concession range, full duty applies",
                        price
                    ),
                }),
            }
        }

        debug!(
            %jurisdiction,
            %price,
            mode = %selection.schedule.name,
            %base_duty,
            %duty,
            "Duty assessed"
        );

        Ok(DutyAssessment {
            jurisdiction,
            price,
            property_type,
            mode: selection.schedule.name.clone(),
            base_duty,
            duty,
            concession,
            audit_trace,
        })
    }
}

fn mode_reasoning(kind: ModeKind, mode: &str, region: &str) -> String {
    match kind {
        ModeKind::ClosedForm => "Price is within the closed-form formula's cutoff".to_string(),
        ModeKind::FirstHomeLand => format!("First home land purchase within the '{}' cap", mode),
        ModeKind::Land => format!("Vacant land uses the '{}' schedule", mode),
        ModeKind::OwnerOccupier => format!("Owner-occupier purchase within the '{}' cap", mode),
        ModeKind::FirstHomeRegional => {
            format!("First home purchase in region '{}' within the '{}' cap", region, mode)
        }
        ModeKind::Established => format!("No concessional mode applies, using '{}'", mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::ConcessionSource;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine() -> DutyEngine<'static> {
        DutyEngine::new(ConfigLoader::builtin().unwrap())
    }

    fn buyer(land: bool, owner: bool, first_home: bool) -> BuyerFlags {
        BuyerFlags {
            is_vacant_land: land,
            is_owner_occupier: owner,
            is_first_home_buyer: first_home,
            region: None,
        }
    }

    fn duty(jurisdiction: Jurisdiction, price: &str, flags: &BuyerFlags) -> Decimal {
        engine().calc_duty(jurisdiction, dec(price), flags).unwrap()
    }

    const FINANCING: (&str, &str) = (
        "financing.yaml",
        include_str!("../../config/financing.yaml"),
    );

    const DRAFT_SA: &str = r#"
meta:
  jurisdiction: SA
  financial_year: "2025-26"
  status: draft
  supports_owner_occupier_mode: false
modes:
  established:
    rows:
      - { upper_bound: null, base: 0, rate: "0.05" }
"#;

    #[test]
    fn test_general_duty() {
        assert_eq!(duty(Jurisdiction::Nsw, "750000", &BuyerFlags::default()), dec("28279"));
        assert_eq!(duty(Jurisdiction::Sa, "500000", &BuyerFlags::default()), dec("21330"));
    }

    #[test]
    fn test_first_home_exemption_boundary() {
        let first_home = buyer(false, false, true);
        assert_eq!(duty(Jurisdiction::Nsw, "800000", &first_home), Decimal::ZERO);
        assert!(duty(Jurisdiction::Nsw, "801000", &first_home) > Decimal::ZERO);
    }

    #[test]
    fn test_taper_midpoint_is_about_half() {
        let full = duty(Jurisdiction::Nsw, "900000", &BuyerFlags::default());
        let tapered = duty(Jurisdiction::Nsw, "900000", &buyer(false, false, true));
        assert!((tapered * Decimal::TWO - full).abs() <= Decimal::ONE);
    }

    #[test]
    fn test_land_above_cap_matches_established_buyer() {
        let land = duty(Jurisdiction::Nsw, "450001", &buyer(true, false, true));
        let established = duty(Jurisdiction::Nsw, "450001", &BuyerFlags::default());
        assert_eq!(land, established);

        let vic_land = duty(Jurisdiction::Vic, "350001", &buyer(true, false, true));
        let vic_established = duty(Jurisdiction::Vic, "350001", &BuyerFlags::default());
        assert_eq!(vic_land, vic_established);
    }

    #[test]
    fn test_step_rebate_band() {
        let flags = buyer(false, true, true);
        let mut previous = Decimal::ZERO;
        for step in 0..=20 {
            let price = Decimal::from(700_001 + step * 5_000);
            let current = engine().calc_duty(Jurisdiction::Qld, price, &flags).unwrap();
            assert!(current >= previous, "duty fell at {}", price);
            previous = current;
        }
        // Full home concession duty: 10,150 + 4.5% x 260,000.
        assert_eq!(duty(Jurisdiction::Qld, "800000", &flags), dec("21850"));
    }

    #[test]
    fn test_closed_form_and_rows_above_cutoff() {
        assert_eq!(duty(Jurisdiction::Nt, "500000", &BuyerFlags::default()), dec("23929"));
        // 4.95% of the whole value above the cutoff.
        assert_eq!(duty(Jurisdiction::Nt, "600000", &BuyerFlags::default()), dec("29700"));
    }

    #[test]
    fn test_owner_occupier_required_exemption() {
        let owner = buyer(false, true, true);
        assert_eq!(duty(Jurisdiction::Act, "1000000", &owner), Decimal::ZERO);
        // 34,270 + 6.4% x 1
        assert_eq!(duty(Jurisdiction::Act, "1000001", &owner), dec("34270"));
        // Without owner occupation there is no concession and no owner-occupier mode.
        assert_eq!(duty(Jurisdiction::Act, "1000000", &buyer(false, false, true)), dec("36950"));
    }

    #[test]
    fn test_assessment_records_concession() {
        let profile = BuyerProfile::new(Jurisdiction::Nsw, dec("900000"), buyer(false, false, true));
        let assessment = engine().assess(&profile).unwrap();

        assert_eq!(assessment.mode, "established");
        assert_eq!(assessment.base_duty, dec("35029"));
        assert_eq!(assessment.duty, dec("17515"));
        let concession = assessment.concession.as_ref().unwrap();
        assert_eq!(concession.source, ConcessionSource::Statutory);
        assert_eq!(concession.rule_id, "nsw_first_home_taper");
        assert_eq!(assessment.concession_reduction(), dec("17514"));

        let steps: Vec<u32> = assessment.audit_trace.iter().map(|s| s.step_number).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        assert_eq!(assessment.audit_trace[0].rule_id, "mode_selection");
        assert_eq!(assessment.audit_trace[1].rule_id, "bracket_duty");
    }

    #[test]
    fn test_first_home_mode_gets_no_second_concession() {
        let profile = BuyerProfile::new(Jurisdiction::Vic, dec("320000"), buyer(true, false, true));
        let assessment = engine().assess(&profile).unwrap();
        assert_eq!(assessment.mode, "fhb_land");
        // 32.14% x 20,000
        assert_eq!(assessment.duty, dec("6428"));
        assert!(assessment.concession.is_none());
        assert_eq!(assessment.audit_trace.len(), 3);
    }

    #[test]
    fn test_non_first_home_buyer_has_two_steps() {
        let profile = BuyerProfile::new(Jurisdiction::Wa, dec("500000"), BuyerFlags::default());
        let assessment = engine().assess(&profile).unwrap();
        assert_eq!(assessment.audit_trace.len(), 2);
        assert_eq!(assessment.duty, assessment.base_duty);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        for price in ["0", "-1"] {
            let result = engine().calc_duty(Jurisdiction::Nsw, dec(price), &BuyerFlags::default());
            match result {
                Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "price"),
                other => panic!("Expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_draft_rule_set_blocks_computation() {
        let rules = ConfigLoader::from_sources(&[("sa.yaml", DRAFT_SA)], FINANCING).unwrap();
        let result = DutyEngine::new(&rules).calc_duty(
            Jurisdiction::Sa,
            dec("500000"),
            &BuyerFlags::default(),
        );
        assert!(matches!(result, Err(EngineError::RuleSetNotReady { .. })));
    }

    #[test]
    fn test_missing_rule_set_is_unsupported() {
        let rules = ConfigLoader::from_sources(&[("sa.yaml", DRAFT_SA)], FINANCING).unwrap();
        let result = DutyEngine::new(&rules).calc_duty(
            Jurisdiction::Nsw,
            dec("500000"),
            &BuyerFlags::default(),
        );
        match result {
            Err(EngineError::UnsupportedJurisdiction { code }) => assert_eq!(code, "NSW"),
            other => panic!("Expected UnsupportedJurisdiction, got {:?}", other),
        }
    }

    #[test]
    fn test_duty_is_whole_dollars() {
        for price in ["1", "17001", "333333", "777777", "2500001"] {
            let result = duty(Jurisdiction::Vic, price, &buyer(false, true, true));
            assert_eq!(result, result.trunc(), "fractional duty at {}", price);
        }
    }
}
