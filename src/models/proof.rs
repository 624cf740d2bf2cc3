//! Feasibility proofs and solver results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::FinancingMode;

/// One of the three constraints a candidate price must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Cash covers deposit, duty, fees and any cash-paid premium.
    Cash,
    /// The loan, including a capitalised premium, fits borrowing power.
    Borrowing,
    /// The effective leverage stays under the policy cap.
    Leverage,
}

/// The working for one candidate price.
///
/// Computed for every price the search visits, but only returned for the
/// winning price, or for the floor price when nothing is affordable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityProof {
    /// The candidate price.
    pub price: Decimal,
    /// Financing mode in force at this price.
    pub financing_mode: FinancingMode,
    /// Leverage cap of that mode.
    pub leverage_cap: Decimal,
    /// Target leverage after clamping.
    pub leverage_used: Decimal,
    /// Transfer duty payable at this price.
    pub duty: Decimal,
    /// The duty schedule used.
    pub duty_mode: String,
    /// Price not covered by the base loan.
    pub deposit_portion: Decimal,
    /// Loan before any capitalised premium.
    pub base_loan: Decimal,
    /// Mortgage insurance premium (zero when not charged).
    pub insurance_premium: Decimal,
    /// Whether the premium is added to the loan.
    pub premium_capitalised: bool,
    /// Part of the premium paid from cash.
    pub premium_cash_portion: Decimal,
    /// Registration and settlement costs included.
    pub ancillary_fees: Decimal,
    /// Total cash needed to settle.
    pub cash_required: Decimal,
    /// Base loan plus any capitalised premium.
    pub total_loan: Decimal,
    /// Total loan divided by price.
    pub effective_leverage: Decimal,
    /// Constraints that failed; empty when feasible.
    pub failed_constraints: Vec<Constraint>,
    /// True when every constraint holds.
    pub feasible: bool,
}

/// Result of a purchasing power search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveResult {
    /// Largest feasible price, or zero when nothing is affordable.
    pub max_price: Decimal,
    /// Whether any price was feasible.
    pub feasible: bool,
    /// Number of feasibility checks made by the search.
    pub iterations: u32,
    /// Working at `max_price`, or at the floor price when infeasible.
    pub explain: FeasibilityProof,
}
