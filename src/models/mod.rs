//! Core data models for the stamp duty engine.
//!
//! This module contains the transient query and result types used by the
//! duty engine and the purchasing power solver.

mod assessment;
mod buyer;
mod financing;
mod jurisdiction;
mod proof;

pub use assessment::{AppliedConcession, AuditStep, ConcessionSource, DutyAssessment};
pub use buyer::{BuyerFlags, BuyerProfile, PropertyType};
pub use financing::{FinancingInput, FinancingMode, FinancingPolicy};
pub use jurisdiction::Jurisdiction;
pub use proof::{Constraint, FeasibilityProof, SolveResult};
