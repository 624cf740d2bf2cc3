//! Closed-form polynomial duty.
//!
//! The Northern Territory computes duty on lower-value properties with a
//! quadratic in thousands of dollars rather than with brackets.

use rust_decimal::Decimal;

use crate::config::{FormulaConfig, FormulaKind};

use super::evaluator::round_to_dollar;

/// Computes rounded duty from a closed-form formula.
///
/// The caller decides whether the price is within the formula's cutoff.
///
/// # Examples
///
/// ```
/// use stamp_duty_engine::calculation::closed_form_duty;
/// use stamp_duty_engine::config::{FormulaConfig, FormulaKind};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let formula = FormulaConfig {
///     kind: FormulaKind::ClosedFormPoly,
///     max_applicable: Decimal::from(525_000),
///     quadratic: Decimal::from_str("0.06571441").unwrap(),
///     linear: Decimal::from(15),
///     unit: Decimal::from(1000),
/// };
///
/// // V = 500: 0.06571441 x 250,000 + 15 x 500 = 23,928.6025
/// assert_eq!(closed_form_duty(&formula, Decimal::from(500_000)), Decimal::from(23_929));
/// ```
pub fn closed_form_duty(formula: &FormulaConfig, price: Decimal) -> Decimal {
    match formula.kind {
        FormulaKind::ClosedFormPoly => {
            let v = price / formula.unit;
            round_to_dollar(formula.quadratic * v * v + formula.linear * v)
        }
    }
}
