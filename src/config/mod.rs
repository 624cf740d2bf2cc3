//! Configuration loading and management for the stamp duty engine.
//!
//! This module loads jurisdiction rule sets and the financing collaborator
//! tables from YAML, normalizes bracket schedules into one canonical row
//! format and resolves mode inheritance, producing an immutable [`RuleBook`].
//!
//! # Example
//!
//! ```no_run
//! use stamp_duty_engine::config::ConfigLoader;
//!
//! let rules = ConfigLoader::load("./config").unwrap();
//! for rule_set in rules.rule_sets() {
//!     println!("{} {}", rule_set.jurisdiction(), rule_set.meta().financial_year);
//! }
//! ```

mod loader;
mod schedule;
mod types;

pub use loader::{ConfigLoader, RuleBook};
pub use schedule::{normalize_rows, BracketRow, RuleSet, Schedule, ESTABLISHED_MODE};
pub use types::{
    AncillaryFees, AppliesWhen, ConcessionConfig, ConcessionRule, ExplicitRow, FinancingConfig,
    FormulaConfig, FormulaKind, GuaranteeScheme, InsuranceBand, InsuranceTable, LeverageBracket,
    PropertyScope, RawBracketRow, RawSchedule, RuleSetFile, RuleSetMeta, RuleSetStatus,
    TaperShape, UpperBoundRow,
};
