//! Transfer duty engine for Australian property purchases.
//!
//! This crate computes stamp duty for every state and territory from
//! declarative rule sets, applies first home buyer concessions, and
//! searches for the highest price a buyer can afford once duty, deposit
//! and mortgage insurance are paid for.

#![warn(missing_docs)]

pub mod affordability;
pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
