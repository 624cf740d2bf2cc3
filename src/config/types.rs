//! Configuration types for duty rule sets and financing tables.
//!
//! This module contains the strongly-typed structures deserialized from
//! the YAML files under `config/`. Bracket rows arrive in two layouts and
//! are normalized once at load time into canonical [`BracketRow`](super::BracketRow)s.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Jurisdiction, PropertyType};

/// Whether a rule set may be used for computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetStatus {
    /// Verified figures.
    Ready,
    /// Work in progress; must never be used.
    Draft,
}

impl RuleSetStatus {
    /// Returns the status as written in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            RuleSetStatus::Ready => "ready",
            RuleSetStatus::Draft => "draft",
        }
    }
}

/// Metadata about a rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetMeta {
    /// The jurisdiction the rule set belongs to.
    pub jurisdiction: Jurisdiction,
    /// Financial year the figures apply to (e.g. "2024-25").
    pub financial_year: String,
    /// Ready or draft.
    pub status: RuleSetStatus,
    /// Whether an owner-occupier schedule may be selected.
    #[serde(default)]
    pub supports_owner_occupier_mode: bool,
    /// Region assumed when a buyer does not give one.
    #[serde(default = "default_primary_region")]
    pub primary_region: String,
}

fn default_primary_region() -> String {
    "metro".to_string()
}

/// A bracket row with explicit bounds and threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitRow {
    /// Lowest price in the bracket.
    pub lower_inclusive: Decimal,
    /// First price above the bracket; `None` for the open top tier.
    #[serde(default)]
    pub upper_exclusive: Option<Decimal>,
    /// Duty accrued below the threshold.
    pub base: Decimal,
    /// Rate applied to the excess over the threshold.
    pub marginal_rate: Decimal,
    /// Price the marginal rate is charged above; defaults to the lower bound.
    #[serde(default)]
    pub applies_above_threshold: Option<Decimal>,
}

/// A bracket row giving only its upper bound. The lower bound is the
/// previous row's upper bound, or zero for the first row.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpperBoundRow {
    /// First price above the bracket; `None` for the open top tier.
    #[serde(default)]
    pub upper_bound: Option<Decimal>,
    /// Duty accrued below the threshold.
    pub base: Decimal,
    /// Rate applied to the excess over the threshold.
    pub rate: Decimal,
    /// Price the rate is charged above; defaults to the lower bound.
    #[serde(default)]
    pub applies_above: Option<Decimal>,
}

/// A bracket row as written in a rule set file, in either layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawBracketRow {
    /// Explicit bounds.
    Explicit(ExplicitRow),
    /// Upper bound only.
    UpperBound(UpperBoundRow),
}

/// The only closed-form duty formula currently in law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    /// `quadratic * V^2 + linear * V` with `V = price / unit`.
    ClosedFormPoly,
}

/// A closed-form duty formula that replaces bracket evaluation below a cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaConfig {
    /// Formula type.
    #[serde(rename = "type")]
    pub kind: FormulaKind,
    /// Highest price the formula applies to.
    pub max_applicable: Decimal,
    /// Coefficient of `V^2`.
    #[serde(default = "default_quadratic")]
    pub quadratic: Decimal,
    /// Coefficient of `V`.
    #[serde(default = "default_linear")]
    pub linear: Decimal,
    /// Divisor turning the price into `V`.
    #[serde(default = "default_unit")]
    pub unit: Decimal,
}

fn default_quadratic() -> Decimal {
    Decimal::new(6_571_441, 8)
}

fn default_linear() -> Decimal {
    Decimal::from(15)
}

fn default_unit() -> Decimal {
    Decimal::from(1000)
}

/// A mode as written in a rule set file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchedule {
    /// Bracket rows in either layout.
    #[serde(default)]
    pub rows: Option<Vec<RawBracketRow>>,
    /// Name of another mode whose rows this one reuses.
    #[serde(default)]
    pub inherits: Option<String>,
    /// Highest price at which the mode may be selected.
    #[serde(default)]
    pub max_price: Option<Decimal>,
    /// Region the mode is restricted to.
    #[serde(default)]
    pub region: Option<String>,
    /// Closed-form override below a cutoff.
    #[serde(default)]
    pub formula: Option<FormulaConfig>,
}

/// Which property types a concession rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyScope {
    /// Homes only.
    Home,
    /// Vacant land only.
    Land,
    /// Both.
    Any,
}

impl PropertyScope {
    /// Whether the scope covers the given property type.
    pub fn covers(self, property_type: PropertyType) -> bool {
        match self {
            PropertyScope::Any => true,
            PropertyScope::Home => property_type == PropertyType::Home,
            PropertyScope::Land => property_type == PropertyType::Land,
        }
    }
}

/// Buyer conditions a concession rule requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliesWhen {
    /// Property types covered.
    pub property_type: PropertyScope,
    /// The buyer must live in the property.
    #[serde(default)]
    pub owner_occupier_required: bool,
}

/// How duty phases back in between the exemption cap and the taper end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaperShape {
    /// Fraction of the basis duty at the purchase price.
    LinearToFull,
    /// Fraction of the basis duty at a fixed cap price.
    LinearToCap,
    /// Basis duty less a rebate that shrinks per price step.
    StepRebate,
}

/// A first home concession declared in a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcessionRule {
    /// Buyer conditions.
    pub applies_when: AppliesWhen,
    /// Prices at or below this pay no duty.
    pub full_exemption_up_to: Decimal,
    /// Prices at or above this get no concession. `None` means no taper.
    #[serde(default)]
    pub taper_end_price: Option<Decimal>,
    /// Required when a taper end is declared.
    #[serde(default)]
    pub taper_shape: Option<TaperShape>,
    /// Schedule the taper is measured against; defaults to the selected mode.
    #[serde(default)]
    pub basis_mode: Option<String>,
    /// Price the basis duty is evaluated at for `linear_to_cap`.
    #[serde(default)]
    pub cap_price: Option<Decimal>,
    /// Rebate lost per step for `step_rebate`.
    #[serde(default)]
    pub step_amount: Option<Decimal>,
    /// Price width of one step for `step_rebate`.
    #[serde(default)]
    pub step_interval: Option<Decimal>,
}

/// Ordered first home concession rules. First match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcessionConfig {
    /// The rules, in priority order.
    #[serde(default)]
    pub rules: Vec<ConcessionRule>,
}

/// A rule set file as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSetFile {
    /// Rule set metadata.
    pub meta: RuleSetMeta,
    /// Mode name to schedule.
    pub modes: BTreeMap<String, RawSchedule>,
    /// First home buyer concessions.
    #[serde(default)]
    pub fhb: Option<ConcessionConfig>,
}

/// One leverage bracket within an insurance band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageBracket {
    /// Lowest leverage in the bracket (inclusive).
    pub min_leverage: Decimal,
    /// Top of the bracket (exclusive).
    pub max_leverage: Decimal,
    /// Premium as a fraction of the loan.
    pub rate: Decimal,
}

/// Premium rates for one range of loan amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceBand {
    /// Smallest loan in the band (inclusive).
    pub min_loan: Decimal,
    /// Top of the band (exclusive); `None` for the open top band.
    #[serde(default)]
    pub max_loan: Option<Decimal>,
    /// Leverage brackets in ascending order.
    pub brackets: Vec<LeverageBracket>,
}

/// Lenders mortgage insurance premium table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceTable {
    /// No premium is charged at or below this leverage.
    pub no_premium_at_or_below: Decimal,
    /// Leverage above this cannot be insured.
    pub max_leverage: Decimal,
    /// Loan bands in ascending order.
    pub bands: Vec<InsuranceBand>,
}

/// Guarantee scheme start date and price caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuaranteeScheme {
    /// Scheme name.
    pub name: String,
    /// Contracts on or after this date qualify.
    pub effective_from: NaiveDate,
    /// Price cap by jurisdiction and region.
    pub caps: BTreeMap<Jurisdiction, BTreeMap<String, Decimal>>,
}

/// Registration and settlement costs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncillaryFees {
    /// Amount used when a jurisdiction has no entry.
    pub default: Decimal,
    /// Per-jurisdiction amounts.
    #[serde(default)]
    pub by_jurisdiction: BTreeMap<Jurisdiction, Decimal>,
}

impl AncillaryFees {
    /// Returns the fees for a jurisdiction.
    pub fn for_jurisdiction(&self, jurisdiction: Jurisdiction) -> Decimal {
        self.by_jurisdiction
            .get(&jurisdiction)
            .copied()
            .unwrap_or(self.default)
    }
}

/// Financing collaborator tables from `financing.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingConfig {
    /// Mortgage insurance premiums.
    pub mortgage_insurance: InsuranceTable,
    /// Guarantee scheme caps.
    pub guarantee_scheme: GuaranteeScheme,
    /// Ancillary costs.
    #[serde(default)]
    pub ancillary_fees: AncillaryFees,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_explicit_row_deserializes() {
        let yaml = "{ lower_inclusive: 0, upper_exclusive: 17000, base: 0, marginal_rate: \"0.0125\" }";
        let row: RawBracketRow = serde_yaml::from_str(yaml).unwrap();
        match row {
            RawBracketRow::Explicit(row) => {
                assert_eq!(row.upper_exclusive, Some(dec("17000")));
                assert_eq!(row.marginal_rate, dec("0.0125"));
                assert_eq!(row.applies_above_threshold, None);
            }
            other => panic!("Expected explicit row, got {:?}", other),
        }
    }

    #[test]
    fn test_upper_bound_row_deserializes() {
        let yaml = "{ upper_bound: null, base: 21330, rate: \"0.055\" }";
        let row: RawBracketRow = serde_yaml::from_str(yaml).unwrap();
        match row {
            RawBracketRow::UpperBound(row) => {
                assert_eq!(row.upper_bound, None);
                assert_eq!(row.rate, dec("0.055"));
            }
            other => panic!("Expected upper-bound row, got {:?}", other),
        }
    }

    #[test]
    fn test_row_with_mixed_fields_is_rejected() {
        let yaml = "{ lower_inclusive: 0, upper_bound: 100, base: 0, rate: \"0.01\" }";
        assert!(serde_yaml::from_str::<RawBracketRow>(yaml).is_err());
    }

    #[test]
    fn test_formula_defaults_to_territory_coefficients() {
        let yaml = "{ type: closed_form_poly, max_applicable: 525000 }";
        let formula: FormulaConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(formula.kind, FormulaKind::ClosedFormPoly);
        assert_eq!(formula.quadratic, dec("0.06571441"));
        assert_eq!(formula.linear, dec("15"));
        assert_eq!(formula.unit, dec("1000"));
    }

    #[test]
    fn test_property_scope_covers() {
        assert!(PropertyScope::Any.covers(PropertyType::Land));
        assert!(PropertyScope::Home.covers(PropertyType::Home));
        assert!(!PropertyScope::Home.covers(PropertyType::Land));
        assert!(!PropertyScope::Land.covers(PropertyType::Home));
    }

    #[test]
    fn test_ancillary_fees_fall_back_to_default() {
        let mut by_jurisdiction = BTreeMap::new();
        by_jurisdiction.insert(Jurisdiction::Nsw, dec("2800"));
        let fees = AncillaryFees {
            default: dec("2500"),
            by_jurisdiction,
        };
        assert_eq!(fees.for_jurisdiction(Jurisdiction::Nsw), dec("2800"));
        assert_eq!(fees.for_jurisdiction(Jurisdiction::Nt), dec("2500"));
    }
}
