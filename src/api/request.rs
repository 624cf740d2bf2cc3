//! Request types for the stamp duty API.
//!
//! Jurisdictions arrive as free text so that an unknown code is reported as
//! an engine error rather than a JSON data error.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{BuyerFlags, BuyerProfile, FinancingInput, FinancingPolicy, Jurisdiction};

/// Request body for `POST /duty`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRequest {
    /// Jurisdiction code, e.g. "NSW".
    pub jurisdiction: String,
    /// The dutiable value.
    pub price: Decimal,
    /// Buyer facts.
    #[serde(flatten)]
    pub flags: BuyerFlags,
}

impl DutyRequest {
    /// Converts the request into a buyer profile.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedJurisdiction` for an unknown code.
    pub fn into_profile(self) -> EngineResult<BuyerProfile> {
        let jurisdiction: Jurisdiction = self.jurisdiction.parse()?;
        Ok(BuyerProfile::new(jurisdiction, self.price, self.flags))
    }
}

fn default_target_leverage() -> Decimal {
    Decimal::new(80, 2)
}

/// Request body for `POST /max-price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxPriceRequest {
    /// Jurisdiction code, e.g. "VIC".
    pub jurisdiction: String,
    /// Buyer facts.
    #[serde(flatten)]
    pub flags: BuyerFlags,
    /// Maximum loan.
    pub borrowing_power: Decimal,
    /// Cash available.
    pub cash_on_hand: Decimal,
    /// Desired loan-to-value ratio. Defaults to 0.80.
    #[serde(default = "default_target_leverage")]
    pub target_leverage: Decimal,
    /// Requested financing policy.
    pub financing_policy: FinancingPolicy,
    /// Include registration and settlement costs.
    #[serde(default)]
    pub include_ancillary_fees: bool,
    /// Pay mortgage insurance from cash.
    #[serde(default)]
    pub pay_insurance_in_cash: bool,
    /// Contract date for guarantee eligibility.
    #[serde(default)]
    pub contract_date: Option<NaiveDate>,
}

impl MaxPriceRequest {
    /// Converts the request into solver input.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown jurisdiction code.
    pub fn into_input(self) -> EngineResult<FinancingInput> {
        let jurisdiction: Jurisdiction = self.jurisdiction.parse().map_err(|e: EngineError| {
            EngineError::invalid_input("jurisdiction", e.to_string())
        })?;
        Ok(FinancingInput {
            jurisdiction,
            flags: self.flags,
            borrowing_power: self.borrowing_power,
            cash_on_hand: self.cash_on_hand,
            target_leverage: self.target_leverage,
            financing_policy: self.financing_policy,
            include_ancillary_fees: self.include_ancillary_fees,
            pay_insurance_in_cash: self.pay_insurance_in_cash,
            contract_date: self.contract_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_request_parses_code_case_insensitively() {
        let json = r#"{"jurisdiction": "vic", "price": "600000", "is_first_home_buyer": true}"#;
        let request: DutyRequest = serde_json::from_str(json).unwrap();
        let profile = request.into_profile().unwrap();
        assert_eq!(profile.jurisdiction, Jurisdiction::Vic);
        assert!(profile.flags.is_first_home_buyer);
    }

    #[test]
    fn test_duty_request_unknown_code() {
        let json = r#"{"jurisdiction": "XYZ", "price": "600000"}"#;
        let request: DutyRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            request.into_profile(),
            Err(EngineError::UnsupportedJurisdiction { .. })
        ));
    }

    #[test]
    fn test_max_price_unknown_code_is_invalid_input() {
        let json = r#"{
            "jurisdiction": "XYZ",
            "borrowing_power": "500000",
            "cash_on_hand": "50000",
            "financing_policy": "no_insurance_cap"
        }"#;
        let request: MaxPriceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.target_leverage, Decimal::new(80, 2));
        match request.into_input() {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "jurisdiction"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }
}
