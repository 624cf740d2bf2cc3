//! Calculation logic for the stamp duty engine.
//!
//! This module contains the bracket evaluator, the closed-form polynomial
//! used below a jurisdiction's cutoff, mode selection, the first home
//! concession applier and the [`DutyEngine`] that ties them together.

mod closed_form;
mod concession;
mod duty;
mod evaluator;
mod mode_selector;

pub use closed_form::closed_form_duty;
pub use concession::{apply_concession, Concession, ConcessionOutcome, StatutoryConcession};
pub use duty::DutyEngine;
pub use evaluator::{evaluate_rows, evaluate_schedule, find_bracket, round_to_dollar};
pub use mode_selector::{
    select_mode, ModeKind, ModeSelection, FIRST_HOME_LAND_MODE, FIRST_HOME_MODE, LAND_MODE,
    OWNER_OCCUPIER_MODE,
};
