//! Application state for the stamp duty API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::RuleBook;

/// Shared application state.
///
/// Holds the immutable rule book every handler computes against.
#[derive(Clone)]
pub struct AppState {
    rules: Arc<RuleBook>,
}

impl AppState {
    /// Creates a new application state over a rule book.
    pub fn new(rules: RuleBook) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Returns the rule book.
    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }
}
