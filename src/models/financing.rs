//! Financing inputs for the purchasing power search.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BuyerFlags, Jurisdiction};

/// The financing policy the buyer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingPolicy {
    /// Borrow at most 80% of the price and never pay mortgage insurance.
    NoInsuranceCap,
    /// Borrow up to 95% and pay mortgage insurance above 80%.
    InsuranceAllowed,
    /// Use the government guarantee where the price qualifies, otherwise
    /// fall back to insurance.
    SubsidizedGuarantee,
}

/// The financing mode actually in force at one candidate price.
///
/// For [`FinancingPolicy::SubsidizedGuarantee`] this depends on the price,
/// which is why the solver resolves it afresh for every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingMode {
    /// 80% cap, no insurance.
    NoInsuranceCap,
    /// 95% cap with mortgage insurance.
    InsuranceAllowed,
    /// 95% cap under the guarantee, no insurance.
    SubsidizedGuarantee,
}

impl FinancingMode {
    /// The maximum leverage ratio allowed in this mode.
    pub fn leverage_cap(self) -> Decimal {
        match self {
            FinancingMode::NoInsuranceCap => Decimal::new(80, 2),
            FinancingMode::InsuranceAllowed | FinancingMode::SubsidizedGuarantee => {
                Decimal::new(95, 2)
            }
        }
    }

    /// Whether a mortgage insurance premium is charged in this mode.
    pub fn charges_insurance(self) -> bool {
        self == FinancingMode::InsuranceAllowed
    }
}

/// Everything the solver needs apart from the price it is searching for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingInput {
    /// Where the buyer is purchasing.
    pub jurisdiction: Jurisdiction,
    /// The buyer facts used for duty and guarantee eligibility.
    #[serde(flatten)]
    pub flags: BuyerFlags,
    /// Maximum loan the lender will advance.
    pub borrowing_power: Decimal,
    /// Cash available for deposit, duty and costs.
    pub cash_on_hand: Decimal,
    /// Desired loan-to-value ratio; clamped to [0.50, cap].
    pub target_leverage: Decimal,
    /// The requested financing policy.
    pub financing_policy: FinancingPolicy,
    /// Add registration and settlement costs to the cash requirement.
    #[serde(default)]
    pub include_ancillary_fees: bool,
    /// Pay the insurance premium from cash instead of adding it to the loan.
    #[serde(default)]
    pub pay_insurance_in_cash: bool,
    /// Contract date, checked against the guarantee scheme start date.
    #[serde(default)]
    pub contract_date: Option<NaiveDate>,
}
