//! Bracket evaluation.
//!
//! This module finds the bracket a price falls in and computes marginal-rate
//! duty from it, rounding once to whole dollars.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{BracketRow, Schedule};
use crate::error::{EngineError, EngineResult};
use crate::models::Jurisdiction;

use super::closed_form::closed_form_duty;

/// Rounds to whole dollars, halves upward.
///
/// # Examples
///
/// ```
/// use stamp_duty_engine::calculation::round_to_dollar;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_to_dollar(Decimal::from_str("10.5").unwrap()), Decimal::from(11));
/// assert_eq!(round_to_dollar(Decimal::from_str("10.49").unwrap()), Decimal::from(10));
/// ```
pub fn round_to_dollar(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the bracket a price falls in.
///
/// The first row whose upper bound is above the price wins; a price at or
/// above every finite upper bound falls in the open top tier.
pub fn find_bracket(rows: &[BracketRow], price: Decimal) -> Option<&BracketRow> {
    rows.iter()
        .find(|row| row.upper_exclusive.is_some_and(|upper| price < upper))
        .or_else(|| rows.iter().find(|row| row.upper_exclusive.is_none()))
}

/// Computes rounded duty from canonical rows, or `None` if no row matches.
pub fn evaluate_rows(rows: &[BracketRow], price: Decimal) -> Option<Decimal> {
    find_bracket(rows, price).map(|row| {
        round_to_dollar(row.base + row.marginal_rate * (price - row.applies_above_threshold))
    })
}

/// Computes rounded duty under a schedule.
///
/// A schedule carrying a closed-form formula uses it at or below the
/// formula's cutoff and its brackets above it.
///
/// # Errors
///
/// Returns `ScheduleError` if no bracket matches the price.
pub fn evaluate_schedule(
    jurisdiction: Jurisdiction,
    schedule: &Schedule,
    price: Decimal,
) -> EngineResult<Decimal> {
    if let Some(formula) = schedule.formula.as_ref().filter(|f| price <= f.max_applicable) {
        return Ok(closed_form_duty(formula, price));
    }

    evaluate_rows(&schedule.rows, price).ok_or_else(|| {
        EngineError::schedule(
            jurisdiction.code(),
            schedule.name.as_str(),
            format!("no bracket matches price {}", price),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(lower: &str, upper: Option<&str>, base: &str, rate: &str, above: &str) -> BracketRow {
        BracketRow {
            lower_inclusive: dec(lower),
            upper_exclusive: upper.map(dec),
            base: dec(base),
            marginal_rate: dec(rate),
            applies_above_threshold: dec(above),
        }
    }

    /// New South Wales general rates.
    fn nsw_rows() -> Vec<BracketRow> {
        vec![
            row("0", Some("17000"), "0", "0.0125", "0"),
            row("17000", Some("36000"), "212", "0.015", "17000"),
            row("36000", Some("97000"), "497", "0.0175", "36000"),
            row("97000", Some("364000"), "1564", "0.035", "97000"),
            row("364000", Some("1212000"), "10909", "0.045", "364000"),
            row("1212000", Some("3636000"), "49069", "0.055", "1212000"),
            row("3636000", None, "182389", "0.07", "3636000"),
        ]
    }

    fn schedule(rows: Vec<BracketRow>) -> Schedule {
        Schedule {
            name: "established".to_string(),
            rows,
            inherited_from: None,
            max_price: None,
            region: None,
            formula: None,
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_to_dollar(dec("0.5")), dec("1"));
        assert_eq!(round_to_dollar(dec("1234.4999")), dec("1234"));
        assert_eq!(round_to_dollar(dec("1234.5")), dec("1235"));
    }

    #[test]
    fn test_price_in_middle_bracket() {
        // 10,909 + 4.5% x (750,000 - 364,000) = 28,279
        assert_eq!(evaluate_rows(&nsw_rows(), dec("750000")), Some(dec("28279")));
    }

    #[test]
    fn test_upper_bound_is_exclusive() {
        let rows = nsw_rows();
        let bracket = find_bracket(&rows, dec("364000")).unwrap();
        assert_eq!(bracket.lower_inclusive, dec("364000"));
        assert_eq!(evaluate_rows(&rows, dec("364000")), Some(dec("10909")));
    }

    #[test]
    fn test_price_above_all_bounds_uses_open_tier() {
        // 182,389 + 7% x 1,364,000 = 277,869
        assert_eq!(evaluate_rows(&nsw_rows(), dec("5000000")), Some(dec("277869")));
    }

    #[test]
    fn test_lowest_bracket_rounds_once() {
        // 1.25% x 1,000 = 12.5 -> 13
        assert_eq!(evaluate_rows(&nsw_rows(), dec("1000")), Some(dec("13")));
    }

    #[test]
    fn test_rows_without_open_tier_can_miss() {
        let rows = vec![row("0", Some("100"), "0", "0.01", "0")];
        assert_eq!(evaluate_rows(&rows, dec("150")), None);
        let result = evaluate_schedule(Jurisdiction::Nsw, &schedule(rows), dec("150"));
        assert!(matches!(result, Err(EngineError::ScheduleError { .. })));
    }

    #[test]
    fn test_schedule_evaluation_matches_rows() {
        let result = evaluate_schedule(Jurisdiction::Nsw, &schedule(nsw_rows()), dec("750000"));
        assert_eq!(result.unwrap(), dec("28279"));
    }
}
