//! Guarantee scheme eligibility.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::GuaranteeScheme;
use crate::models::Jurisdiction;

/// Decides whether a purchase qualifies for a government guarantee.
pub trait SubsidyEligibility {
    /// Returns true when the purchase qualifies.
    ///
    /// A missing contract date skips the start date check.
    fn is_eligible(
        &self,
        jurisdiction: Jurisdiction,
        region: &str,
        price: Decimal,
        contract_date: Option<NaiveDate>,
    ) -> bool;
}

impl GuaranteeScheme {
    /// Price cap for a jurisdiction and region, if the scheme covers it.
    pub fn cap_for(&self, jurisdiction: Jurisdiction, region: &str) -> Option<Decimal> {
        self.caps
            .get(&jurisdiction)
            .and_then(|regions| regions.get(region))
            .copied()
    }
}

impl SubsidyEligibility for GuaranteeScheme {
    fn is_eligible(
        &self,
        jurisdiction: Jurisdiction,
        region: &str,
        price: Decimal,
        contract_date: Option<NaiveDate>,
    ) -> bool {
        if contract_date.is_some_and(|date| date < self.effective_from) {
            return false;
        }
        self.cap_for(jurisdiction, region)
            .is_some_and(|cap| price <= cap)
    }
}
