//! Lenders mortgage insurance estimation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::round_to_dollar;
use crate::config::{InsuranceBand, InsuranceTable, LeverageBracket};
use crate::error::{EngineError, EngineResult};

/// A premium quote for one loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceQuote {
    /// Premium in whole dollars.
    pub premium: Decimal,
    /// Whether the premium is added to the loan.
    pub capitalised: bool,
}

impl InsuranceQuote {
    /// A quote with nothing to pay.
    pub fn none() -> Self {
        Self {
            premium: Decimal::ZERO,
            capitalised: true,
        }
    }
}

/// Quotes mortgage insurance for a loan at a given leverage.
pub trait MortgageInsurer {
    /// Returns the premium for `loan` at loan-to-value ratio `leverage`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the leverage is above the insurable
    /// maximum or no band or bracket covers the loan.
    fn quote(&self, loan: Decimal, leverage: Decimal) -> EngineResult<InsuranceQuote>;
}

impl InsuranceTable {
    fn band_for(&self, loan: Decimal) -> Option<&InsuranceBand> {
        self.bands
            .iter()
            .find(|band| loan >= band.min_loan && band.max_loan.is_none_or(|max| loan < max))
    }

    fn bracket_for<'a>(&self, band: &'a InsuranceBand, leverage: Decimal) -> Option<&'a LeverageBracket> {
        band.brackets
            .iter()
            .find(|b| leverage >= b.min_leverage && leverage < b.max_leverage)
            .or_else(|| {
                // The absolute maximum itself is priced by the top bracket.
                band.brackets
                    .last()
                    .filter(|_| leverage == self.max_leverage)
            })
    }
}

impl MortgageInsurer for InsuranceTable {
    fn quote(&self, loan: Decimal, leverage: Decimal) -> EngineResult<InsuranceQuote> {
        if leverage <= self.no_premium_at_or_below {
            return Ok(InsuranceQuote::none());
        }
        if leverage > self.max_leverage {
            return Err(EngineError::invalid_input(
                "leverage",
                format!(
                    "{} is above the insurable maximum of {}",
                    leverage, self.max_leverage
                ),
            ));
        }

        let band = self.band_for(loan).ok_or_else(|| {
            EngineError::invalid_input("loan", format!("no insurance band covers a loan of {}", loan))
        })?;
        let bracket = self.bracket_for(band, leverage).ok_or_else(|| {
            EngineError::invalid_input(
                "leverage",
                format!("no insurance bracket covers leverage {}", leverage),
            )
        })?;

        Ok(InsuranceQuote {
            premium: round_to_dollar(loan * bracket.rate),
            capitalised: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn table() -> &'static InsuranceTable {
        &ConfigLoader::builtin().unwrap().financing().mortgage_insurance
    }

    #[test]
    fn test_no_premium_at_eighty_percent() {
        let quote = table().quote(dec("400000"), dec("0.80")).unwrap();
        assert_eq!(quote, InsuranceQuote::none());
    }

    #[test]
    fn test_premium_from_band_and_bracket() {
        // 450,000 falls in the 300k-500k band; 0.90 opens the top bracket.
        let quote = table().quote(dec("450000"), dec("0.90")).unwrap();
        assert_eq!(quote.premium, dec("14310"));
        assert!(quote.capitalised);

        let quote = table().quote(dec("450000"), dec("0.8999")).unwrap();
        assert_eq!(quote.premium, dec("7830"));
    }

    #[test]
    fn test_band_upper_bound_is_exclusive() {
        // 500,000 moves into the 500k-750k band at 1.04%.
        let quote = table().quote(dec("500000"), dec("0.82")).unwrap();
        assert_eq!(quote.premium, dec("5200"));
    }

    #[test]
    fn test_maximum_leverage_uses_top_bracket() {
        let quote = table().quote(dec("1200000"), dec("0.95")).unwrap();
        assert_eq!(quote.premium, dec("54240"));
    }

    #[test]
    fn test_leverage_above_maximum_is_invalid() {
        let result = table().quote(dec("400000"), dec("0.9501"));
        match result {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "leverage"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_premium_rounds_to_whole_dollars() {
        // 123,457 x 0.66% = 814.8162
        let quote = table().quote(dec("123457"), dec("0.81")).unwrap();
        assert_eq!(quote.premium, dec("815"));
    }
}
