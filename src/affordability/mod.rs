//! Purchasing power: how much a buyer can afford once duty, deposit and
//! mortgage insurance are accounted for.
//!
//! The solver depends on two collaborators behind traits, a
//! [`MortgageInsurer`] and a [`SubsidyEligibility`] check. The table-backed
//! implementations come from `financing.yaml`.

mod insurance;
mod solver;
mod subsidy;

pub use insurance::{InsuranceQuote, MortgageInsurer};
pub use solver::{
    solve_max_price, AffordabilitySolver, LEVERAGE_TOLERANCE, MAX_FUNDS, MAX_ITERATIONS,
    MIN_LEVERAGE,
};
pub use subsidy::SubsidyEligibility;
