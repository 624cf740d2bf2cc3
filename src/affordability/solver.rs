//! Purchasing power search.
//!
//! Finds the highest whole-dollar price a buyer can settle, given borrowing
//! power, cash and a financing policy. Each candidate price is checked by a
//! feasibility predicate that resolves the financing mode, duty and
//! insurance afresh; the search itself is a bounded integer bisection.

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculation::DutyEngine;
use crate::config::{AncillaryFees, RuleBook};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BuyerProfile, Constraint, FeasibilityProof, FinancingInput, FinancingMode, FinancingPolicy,
    SolveResult,
};

use super::insurance::{InsuranceQuote, MortgageInsurer};
use super::subsidy::SubsidyEligibility;

/// Upper bound on feasibility checks per search.
pub const MAX_ITERATIONS: u32 = 64;

/// Slack allowed on the leverage constraint.
pub const LEVERAGE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Lowest leverage the solver will use, whatever the target.
pub const MIN_LEVERAGE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Largest accepted sum of borrowing power and cash on hand, $10^15.
///
/// The search range is then below 2^64 dollars wide, so `MAX_ITERATIONS`
/// always narrows it to a single price.
pub const MAX_FUNDS: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// The search ceiling is this multiple of borrowing power plus cash.
const SEARCH_HEADROOM: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// Searches for the maximum affordable price.
///
/// The solver borrows its duty engine and collaborators; it keeps no state
/// between searches.
pub struct AffordabilitySolver<'a> {
    engine: DutyEngine<'a>,
    insurer: &'a dyn MortgageInsurer,
    subsidy: &'a dyn SubsidyEligibility,
    fees: &'a AncillaryFees,
}

impl<'a> AffordabilitySolver<'a> {
    /// Creates a solver using the rule book's own financing tables.
    pub fn new(rules: &'a RuleBook) -> Self {
        let financing = rules.financing();
        Self {
            engine: DutyEngine::new(rules),
            insurer: &financing.mortgage_insurance,
            subsidy: &financing.guarantee_scheme,
            fees: &financing.ancillary_fees,
        }
    }

    /// Creates a solver with caller-supplied collaborators.
    pub fn with_collaborators(
        engine: DutyEngine<'a>,
        insurer: &'a dyn MortgageInsurer,
        subsidy: &'a dyn SubsidyEligibility,
        fees: &'a AncillaryFees,
    ) -> Self {
        Self {
            engine,
            insurer,
            subsidy,
            fees,
        }
    }

    /// Finds the largest feasible whole-dollar price.
    ///
    /// An unaffordable purchase is not an error: the result has a zero
    /// `max_price` and explains the checks at a price of $1.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for non-positive borrowing power, negative cash,
    ///   funds above `MAX_FUNDS`, a target leverage outside (0, 1] or a
    ///   jurisdiction without rules
    /// - Any duty engine error, such as `RuleSetNotReady`
    pub fn solve_max_price(&self, input: &FinancingInput) -> EngineResult<SolveResult> {
        self.validate(input)?;

        let mut lo = Decimal::ONE;
        let mut hi = input
            .borrowing_power
            .checked_add(input.cash_on_hand)
            .and_then(|funds| funds.checked_mul(SEARCH_HEADROOM))
            .ok_or_else(|| {
                EngineError::invalid_input("borrowing_power", "borrowing power plus cash is too large")
            })?
            .floor();
        let mut iterations = 0;
        let mut best: Option<FeasibilityProof> = None;

        while lo <= hi && iterations < MAX_ITERATIONS {
            iterations += 1;
            let mid = ((lo + hi) / Decimal::TWO).floor();
            let proof = self.feasibility(input, mid)?;
            debug!(
                iteration = iterations,
                %lo,
                %hi,
                price = %mid,
                feasible = proof.feasible,
                mode = ?proof.financing_mode,
                "Purchasing power search step"
            );

            if proof.feasible {
                lo = mid + Decimal::ONE;
                best = Some(proof);
            } else {
                hi = mid - Decimal::ONE;
            }
        }

        match best {
            Some(explain) => Ok(SolveResult {
                max_price: explain.price,
                feasible: true,
                iterations,
                explain,
            }),
            None => {
                debug!(jurisdiction = %input.jurisdiction, "No feasible price found");
                Ok(SolveResult {
                    max_price: Decimal::ZERO,
                    feasible: false,
                    iterations,
                    explain: self.feasibility(input, Decimal::ONE)?,
                })
            }
        }
    }

    /// Checks every constraint at one candidate price.
    ///
    /// The financing mode is resolved from the price each time, since
    /// guarantee eligibility depends on it.
    ///
    /// # Errors
    ///
    /// Propagates duty engine and insurer errors.
    pub fn feasibility(&self, input: &FinancingInput, price: Decimal) -> EngineResult<FeasibilityProof> {
        let financing_mode = self.resolve_mode(input, price)?;
        let leverage_cap = financing_mode.leverage_cap();
        let leverage_used = input.target_leverage.clamp(MIN_LEVERAGE, leverage_cap);

        let profile = BuyerProfile::new(input.jurisdiction, price, input.flags.clone());
        let assessment = self.engine.assess(&profile)?;

        let base_loan = leverage_used * price;
        let deposit_portion = price - base_loan;

        let quote = if financing_mode.charges_insurance() {
            let quote = self.insurer.quote(base_loan, leverage_used)?;
            InsuranceQuote {
                capitalised: quote.capitalised && !input.pay_insurance_in_cash,
                ..quote
            }
        } else {
            InsuranceQuote::none()
        };
        let (premium_capitalised_amount, premium_cash_portion) = if quote.capitalised {
            (quote.premium, Decimal::ZERO)
        } else {
            (Decimal::ZERO, quote.premium)
        };

        let ancillary_fees = if input.include_ancillary_fees {
            self.fees.for_jurisdiction(input.jurisdiction)
        } else {
            Decimal::ZERO
        };

        let cash_required = deposit_portion + assessment.duty + ancillary_fees + premium_cash_portion;
        let total_loan = base_loan + premium_capitalised_amount;
        let effective_leverage = total_loan / price;

        let mut failed_constraints = Vec::new();
        if cash_required > input.cash_on_hand {
            failed_constraints.push(Constraint::Cash);
        }
        if total_loan > input.borrowing_power {
            failed_constraints.push(Constraint::Borrowing);
        }
        if effective_leverage > leverage_cap + LEVERAGE_TOLERANCE {
            failed_constraints.push(Constraint::Leverage);
        }

        Ok(FeasibilityProof {
            price,
            financing_mode,
            leverage_cap,
            leverage_used,
            duty: assessment.duty,
            duty_mode: assessment.mode,
            deposit_portion,
            base_loan,
            insurance_premium: quote.premium,
            premium_capitalised: quote.capitalised,
            premium_cash_portion,
            ancillary_fees,
            cash_required,
            total_loan,
            effective_leverage,
            feasible: failed_constraints.is_empty(),
            failed_constraints,
        })
    }

    fn resolve_mode(&self, input: &FinancingInput, price: Decimal) -> EngineResult<FinancingMode> {
        Ok(match input.financing_policy {
            FinancingPolicy::NoInsuranceCap => FinancingMode::NoInsuranceCap,
            FinancingPolicy::InsuranceAllowed => FinancingMode::InsuranceAllowed,
            FinancingPolicy::SubsidizedGuarantee => {
                let rule_set = self.engine.rules().rule_set(input.jurisdiction)?;
                let region = input
                    .flags
                    .region
                    .as_deref()
                    .unwrap_or_else(|| rule_set.primary_region());
                if self
                    .subsidy
                    .is_eligible(input.jurisdiction, region, price, input.contract_date)
                {
                    FinancingMode::SubsidizedGuarantee
                } else {
                    FinancingMode::InsuranceAllowed
                }
            }
        })
    }

    fn validate(&self, input: &FinancingInput) -> EngineResult<()> {
        if input.borrowing_power <= Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "borrowing_power",
                format!("must be greater than zero, got {}", input.borrowing_power),
            ));
        }
        if input.cash_on_hand < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "cash_on_hand",
                format!("must not be negative, got {}", input.cash_on_hand),
            ));
        }
        let funds = input.borrowing_power.checked_add(input.cash_on_hand);
        if funds.is_none_or(|funds| funds > MAX_FUNDS) {
            return Err(EngineError::invalid_input(
                "borrowing_power",
                format!("borrowing power plus cash must not exceed {}", MAX_FUNDS),
            ));
        }
        if input.target_leverage <= Decimal::ZERO || input.target_leverage > Decimal::ONE {
            return Err(EngineError::invalid_input(
                "target_leverage",
                format!("must be in (0, 1], got {}", input.target_leverage),
            ));
        }
        if !self.engine.rules().supports(input.jurisdiction) {
            return Err(EngineError::invalid_input(
                "jurisdiction",
                format!("no rule set is loaded for {}", input.jurisdiction),
            ));
        }
        Ok(())
    }
}

/// Finds the maximum affordable price using the rule book's own tables.
///
/// # Example
///
/// ```
/// use stamp_duty_engine::affordability::solve_max_price;
/// use stamp_duty_engine::config::ConfigLoader;
/// use stamp_duty_engine::models::{BuyerFlags, FinancingInput, FinancingPolicy, Jurisdiction};
/// use rust_decimal::Decimal;
///
/// let input = FinancingInput {
///     jurisdiction: Jurisdiction::Sa,
///     flags: BuyerFlags::default(),
///     borrowing_power: Decimal::from(400_000),
///     cash_on_hand: Decimal::from(150_000),
///     target_leverage: Decimal::new(80, 2),
///     financing_policy: FinancingPolicy::NoInsuranceCap,
///     include_ancillary_fees: false,
///     pay_insurance_in_cash: false,
///     contract_date: None,
/// };
/// let result = solve_max_price(ConfigLoader::builtin()?, &input)?;
/// assert_eq!(result.max_price, Decimal::from(500_000));
/// # Ok::<(), stamp_duty_engine::error::EngineError>(())
/// ```
pub fn solve_max_price(rules: &RuleBook, input: &FinancingInput) -> EngineResult<SolveResult> {
    AffordabilitySolver::new(rules).solve_max_price(input)
}
