//! Mode selection.
//!
//! Picks which named schedule of a rule set applies to a purchase. The
//! checks run in a fixed priority order and the first match wins:
//!
//! 1. A closed-form formula on the established schedule, below its cutoff
//! 2. Vacant land: first home land mode within its cap, else the land mode,
//!    else the established schedule
//! 3. Owner-occupier mode, where the jurisdiction has one valid at the price
//! 4. First home mode for the buyer's region, within the region's cap
//! 5. The established schedule

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::{RuleSet, Schedule};
use crate::error::EngineResult;
use crate::models::BuyerFlags;

/// Mode name for first home vacant land.
pub const FIRST_HOME_LAND_MODE: &str = "fhb_land";
/// Mode name for vacant land.
pub const LAND_MODE: &str = "land";
/// Mode name for owner-occupied homes.
pub const OWNER_OCCUPIER_MODE: &str = "owner_occupier";
/// Mode name prefix for first home modes; regional modes append `_<region>`.
pub const FIRST_HOME_MODE: &str = "fhb_home";

/// Why a mode was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// Closed-form formula below its cutoff.
    ClosedForm,
    /// First home vacant land schedule.
    FirstHomeLand,
    /// Vacant land schedule.
    Land,
    /// Owner-occupier schedule.
    OwnerOccupier,
    /// First home schedule for the buyer's region.
    FirstHomeRegional,
    /// The general schedule.
    Established,
}

impl ModeKind {
    /// Whether the schedule already embodies a first home concession, in
    /// which case no further concession is applied on top of it.
    pub fn is_first_home_schedule(self) -> bool {
        matches!(self, ModeKind::FirstHomeLand | ModeKind::FirstHomeRegional)
    }
}

/// The outcome of mode selection.
#[derive(Debug, Clone)]
pub struct ModeSelection<'a> {
    /// The selected schedule.
    pub schedule: &'a Schedule,
    /// Which priority rule picked it.
    pub kind: ModeKind,
    /// The region the buyer was treated as purchasing in.
    pub region: String,
}

/// Selects the schedule for a purchase.
///
/// # Errors
///
/// Returns `ScheduleError` only if the rule set has no established schedule,
/// which compiled rule sets never lack.
pub fn select_mode<'a>(
    rule_set: &'a RuleSet,
    price: Decimal,
    flags: &BuyerFlags,
) -> EngineResult<ModeSelection<'a>> {
    let established = rule_set.established()?;
    let region = flags
        .region
        .clone()
        .unwrap_or_else(|| rule_set.primary_region().to_string());

    let (schedule, kind) = pick(rule_set, established, price, flags, &region);
    debug!(
        jurisdiction = %rule_set.jurisdiction(),
        %price,
        mode = %schedule.name,
        ?kind,
        "Selected duty mode"
    );

    Ok(ModeSelection {
        schedule,
        kind,
        region,
    })
}

fn pick<'a>(
    rule_set: &'a RuleSet,
    established: &'a Schedule,
    price: Decimal,
    flags: &BuyerFlags,
    region: &str,
) -> (&'a Schedule, ModeKind) {
    if established
        .formula
        .as_ref()
        .is_some_and(|f| price <= f.max_applicable)
    {
        return (established, ModeKind::ClosedForm);
    }

    if flags.is_vacant_land {
        if flags.is_first_home_buyer {
            if let Some(land) = admitted(rule_set, FIRST_HOME_LAND_MODE, price) {
                return (land, ModeKind::FirstHomeLand);
            }
        }
        return match rule_set.schedule(LAND_MODE) {
            Some(land) => (land, ModeKind::Land),
            None => (established, ModeKind::Established),
        };
    }

    if flags.is_owner_occupier && rule_set.meta().supports_owner_occupier_mode {
        if let Some(owner) = admitted(rule_set, OWNER_OCCUPIER_MODE, price) {
            return (owner, ModeKind::OwnerOccupier);
        }
    }

    if flags.is_first_home_buyer {
        let regional = format!("{}_{}", FIRST_HOME_MODE, region);
        for name in [regional.as_str(), FIRST_HOME_MODE] {
            let found = admitted(rule_set, name, price)
                .filter(|s| s.region.as_deref().is_none_or(|r| r == region));
            if let Some(schedule) = found {
                return (schedule, ModeKind::FirstHomeRegional);
            }
        }
    }

    (established, ModeKind::Established)
}

fn admitted<'a>(rule_set: &'a RuleSet, name: &str, price: Decimal) -> Option<&'a Schedule> {
    rule_set.schedule(name).filter(|s| s.admits(price))
}
