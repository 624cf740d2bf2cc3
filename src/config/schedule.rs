//! Canonical duty schedules and rule sets.
//!
//! Rule set files are compiled into [`RuleSet`]s once at load time: bracket
//! rows in either layout are normalized into [`BracketRow`]s, single-level
//! inheritance is resolved, and every schedule and concession rule is
//! checked so that evaluation never has to second-guess the data.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::models::Jurisdiction;

use super::types::{
    ConcessionRule, FormulaConfig, RawBracketRow, RawSchedule, RuleSetFile, RuleSetMeta,
    RuleSetStatus, TaperShape,
};

/// Name of the general schedule every rule set must declare.
pub const ESTABLISHED_MODE: &str = "established";

/// One progressive bracket in canonical form.
///
/// Duty for a price in the bracket is
/// `base + marginal_rate * (price - applies_above_threshold)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketRow {
    /// Lowest price in the bracket.
    pub lower_inclusive: Decimal,
    /// First price above the bracket; `None` for the open top tier.
    pub upper_exclusive: Option<Decimal>,
    /// Duty accrued below the threshold.
    pub base: Decimal,
    /// Rate applied to the excess over the threshold.
    pub marginal_rate: Decimal,
    /// Price the marginal rate is charged above.
    pub applies_above_threshold: Decimal,
}

/// A named bracket schedule (mode) within a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Mode name.
    pub name: String,
    /// Canonical rows, contiguous with a single open top tier.
    pub rows: Vec<BracketRow>,
    /// Mode the rows were copied from, if declared with `inherits`.
    pub inherited_from: Option<String>,
    /// Highest price at which the mode may be selected.
    pub max_price: Option<Decimal>,
    /// Region the mode is restricted to.
    pub region: Option<String>,
    /// Closed-form override below a cutoff.
    pub formula: Option<FormulaConfig>,
}

impl Schedule {
    /// Whether the mode may be selected at this price.
    pub fn admits(&self, price: Decimal) -> bool {
        self.max_price.is_none_or(|cap| price <= cap)
    }
}

/// One jurisdiction's complete, validated duty configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    meta: RuleSetMeta,
    modes: BTreeMap<String, Schedule>,
    concessions: Vec<ConcessionRule>,
}

impl RuleSet {
    /// Compiles a parsed rule set file.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` if any schedule is empty, non-contiguous,
    /// lacks (or has more than one) open top tier, inherits from a missing
    /// or inheriting mode, or if a concession rule is incomplete.
    pub fn compile(file: RuleSetFile) -> EngineResult<Self> {
        let jurisdiction = file.meta.jurisdiction;
        let mut modes = BTreeMap::new();

        for (name, raw) in &file.modes {
            let schedule = resolve_schedule(jurisdiction, name, raw, &file.modes)?;
            modes.insert(name.clone(), schedule);
        }

        if !modes.contains_key(ESTABLISHED_MODE) {
            return Err(EngineError::schedule(
                jurisdiction.code(),
                ESTABLISHED_MODE,
                "rule set has no established schedule",
            ));
        }

        let concessions = file.fhb.map(|c| c.rules).unwrap_or_default();
        for (index, rule) in concessions.iter().enumerate() {
            validate_concession(jurisdiction, index, rule, &modes)?;
        }

        Ok(Self {
            meta: file.meta,
            modes,
            concessions,
        })
    }

    /// Returns the rule set metadata.
    pub fn meta(&self) -> &RuleSetMeta {
        &self.meta
    }

    /// Returns the jurisdiction.
    pub fn jurisdiction(&self) -> Jurisdiction {
        self.meta.jurisdiction
    }

    /// Whether the rule set may be used for computation.
    pub fn is_ready(&self) -> bool {
        self.meta.status == RuleSetStatus::Ready
    }

    /// Looks up a mode by name.
    pub fn schedule(&self, name: &str) -> Option<&Schedule> {
        self.modes.get(name)
    }

    /// Looks up a mode that the configuration promises exists.
    pub fn require_schedule(&self, name: &str) -> EngineResult<&Schedule> {
        self.modes.get(name).ok_or_else(|| {
            EngineError::schedule(
                self.meta.jurisdiction.code(),
                name,
                "referenced schedule does not exist",
            )
        })
    }

    /// Returns the general schedule.
    pub fn established(&self) -> EngineResult<&Schedule> {
        self.require_schedule(ESTABLISHED_MODE)
    }

    /// Iterates the modes in name order.
    pub fn modes(&self) -> impl Iterator<Item = &Schedule> {
        self.modes.values()
    }

    /// Returns the declarative first home concession rules in priority order.
    pub fn concessions(&self) -> &[ConcessionRule] {
        &self.concessions
    }

    /// Region to use when the buyer gives none.
    pub fn primary_region(&self) -> &str {
        &self.meta.primary_region
    }

    /// Every region named by the rule set, primary first.
    pub fn regions(&self) -> Vec<String> {
        let mut regions = vec![self.meta.primary_region.clone()];
        for region in self.modes.values().filter_map(|s| s.region.as_ref()) {
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
        regions
    }
}

/// Normalizes raw rows of either layout into canonical bracket rows.
///
/// Upper-bound rows take their lower bound from a running cursor that
/// starts at zero and advances to each row's upper bound. The result is
/// checked for contiguity and a single open top tier.
///
/// # Errors
///
/// Returns `ScheduleError` if there are no rows or the rows do not form a
/// contiguous schedule.
pub fn normalize_rows(
    jurisdiction: Jurisdiction,
    mode: &str,
    raw: &[RawBracketRow],
) -> EngineResult<Vec<BracketRow>> {
    let mut lower = Decimal::ZERO;
    let mut rows = Vec::with_capacity(raw.len());

    for row in raw {
        let canonical = match row {
            RawBracketRow::Explicit(row) => BracketRow {
                lower_inclusive: row.lower_inclusive,
                upper_exclusive: row.upper_exclusive,
                base: row.base,
                marginal_rate: row.marginal_rate,
                applies_above_threshold: row
                    .applies_above_threshold
                    .unwrap_or(row.lower_inclusive),
            },
            RawBracketRow::UpperBound(row) => BracketRow {
                lower_inclusive: lower,
                upper_exclusive: row.upper_bound,
                base: row.base,
                marginal_rate: row.rate,
                applies_above_threshold: row.applies_above.unwrap_or(lower),
            },
        };
        if let Some(upper) = canonical.upper_exclusive {
            lower = upper;
        }
        rows.push(canonical);
    }

    if rows.is_empty() {
        return Err(EngineError::schedule(
            jurisdiction.code(),
            mode,
            "schedule has no bracket rows",
        ));
    }

    validate_rows(jurisdiction, mode, &rows)?;
    Ok(rows)
}

fn validate_rows(jurisdiction: Jurisdiction, mode: &str, rows: &[BracketRow]) -> EngineResult<()> {
    let fail = |message: String| EngineError::schedule(jurisdiction.code(), mode, message);

    if let Some(first) = rows.first().filter(|r| !r.lower_inclusive.is_zero()) {
        return Err(fail(format!(
            "first row starts at {} instead of 0",
            first.lower_inclusive
        )));
    }

    for (i, row) in rows.iter().enumerate() {
        if row.lower_inclusive < Decimal::ZERO {
            return Err(fail(format!("row {} has a negative lower bound", i)));
        }
        if row.applies_above_threshold > row.lower_inclusive {
            return Err(fail(format!(
                "row {} applies its rate above {}, past its lower bound {}",
                i, row.applies_above_threshold, row.lower_inclusive
            )));
        }
        if row.base < Decimal::ZERO || row.marginal_rate < Decimal::ZERO {
            return Err(fail(format!("row {} has a negative base or rate", i)));
        }
        if let Some(upper) = row.upper_exclusive {
            if upper <= row.lower_inclusive {
                return Err(fail(format!(
                    "row {} upper bound {} is not above its lower bound {}",
                    i, upper, row.lower_inclusive
                )));
            }
        }
    }

    for (i, pair) in rows.windows(2).enumerate() {
        match pair[0].upper_exclusive {
            Some(upper) if upper == pair[1].lower_inclusive => {}
            Some(upper) => {
                return Err(fail(format!(
                    "row {} ends at {} but row {} starts at {}",
                    i,
                    upper,
                    i + 1,
                    pair[1].lower_inclusive
                )));
            }
            None => {
                return Err(fail(format!("row {} is open-topped but is not the last row", i)));
            }
        }
    }

    if rows.iter().all(|r| r.upper_exclusive.is_some()) {
        return Err(fail("schedule has no open top tier".to_string()));
    }

    Ok(())
}

fn resolve_schedule(
    jurisdiction: Jurisdiction,
    name: &str,
    raw: &RawSchedule,
    all: &BTreeMap<String, RawSchedule>,
) -> EngineResult<Schedule> {
    let fail = |message: String| EngineError::schedule(jurisdiction.code(), name, message);

    let (rows, formula, inherited_from) = match (&raw.rows, &raw.inherits) {
        (Some(_), Some(_)) => {
            return Err(fail("declares both rows and inherits".to_string()));
        }
        (None, None) => {
            return Err(fail("schedule has no bracket rows".to_string()));
        }
        (Some(rows), None) => (
            normalize_rows(jurisdiction, name, rows)?,
            raw.formula.clone(),
            None,
        ),
        (None, Some(parent_name)) => {
            let parent = all
                .get(parent_name)
                .ok_or_else(|| fail(format!("inherits unknown mode '{}'", parent_name)))?;
            if parent.inherits.is_some() {
                return Err(fail(format!(
                    "inherits '{}' which itself inherits; only one level is allowed",
                    parent_name
                )));
            }
            let parent_rows = parent
                .rows
                .as_ref()
                .ok_or_else(|| fail(format!("parent mode '{}' has no rows", parent_name)))?;
            (
                normalize_rows(jurisdiction, parent_name, parent_rows)?,
                raw.formula.clone().or_else(|| parent.formula.clone()),
                Some(parent_name.clone()),
            )
        }
    };

    if let Some(formula) = &formula {
        if formula.max_applicable <= Decimal::ZERO || formula.unit <= Decimal::ZERO {
            return Err(fail("formula cutoff and unit must be positive".to_string()));
        }
    }

    Ok(Schedule {
        name: name.to_string(),
        rows,
        inherited_from,
        max_price: raw.max_price,
        region: raw.region.clone(),
        formula,
    })
}

fn validate_concession(
    jurisdiction: Jurisdiction,
    index: usize,
    rule: &ConcessionRule,
    modes: &BTreeMap<String, Schedule>,
) -> EngineResult<()> {
    let label = format!("fhb rule {}", index);
    let fail = |message: &str| EngineError::schedule(jurisdiction.code(), label.as_str(), message);

    if let Some(basis) = &rule.basis_mode {
        if !modes.contains_key(basis) {
            return Err(fail("basis_mode names an unknown schedule"));
        }
    }

    let Some(taper_end) = rule.taper_end_price else {
        return Ok(());
    };
    if taper_end <= rule.full_exemption_up_to {
        return Err(fail("taper_end_price must be above full_exemption_up_to"));
    }
    match rule.taper_shape {
        None => Err(fail("taper_end_price requires a taper_shape")),
        Some(TaperShape::LinearToFull) => Ok(()),
        Some(TaperShape::LinearToCap) => match rule.cap_price {
            Some(_) => Ok(()),
            None => Err(fail("linear_to_cap requires cap_price")),
        },
        Some(TaperShape::StepRebate) => match (rule.step_amount, rule.step_interval) {
            (Some(amount), Some(interval))
                if amount >= Decimal::ZERO && interval > Decimal::ZERO =>
            {
                Ok(())
            }
            _ => Err(fail(
                "step_rebate requires a non-negative step_amount and a positive step_interval",
            )),
        },
    }
}
