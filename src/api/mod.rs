//! HTTP API module for the stamp duty engine.
//!
//! This module provides the REST API endpoints for jurisdiction discovery,
//! duty assessment and the purchasing power search.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{DutyRequest, MaxPriceRequest};
pub use response::{ApiError, ConcessionKind, JurisdictionSummary};
pub use state::AppState;
