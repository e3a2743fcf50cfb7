//! Framer configuration types
//!
//! The defaults reproduce the plain framing behaviour: a re-asserted select silently
//! discards the open window, and windows may grow without bound.

use serde::{Deserialize, Serialize};

/// Configuration for the transaction framer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramerConfig {
    /// Emit a `TransactionError` when `Enable` arrives while a window is still open
    #[serde(default)]
    pub report_abandoned: bool,

    /// Optional: per-direction byte limit for a single window
    #[serde(default)]
    pub max_transaction_bytes: Option<usize>,
}

impl FramerConfig {
    /// Create a new framer configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: report windows abandoned by a re-asserted select
    pub fn with_report_abandoned(mut self, enabled: bool) -> Self {
        self.report_abandoned = enabled;
        self
    }

    /// Builder method: cap the bytes accumulated per direction in one window
    pub fn with_max_transaction_bytes(mut self, limit: usize) -> Self {
        self.max_transaction_bytes = Some(limit);
        self
    }

    /// Check whether a window holding `len` bytes in one direction is within limits
    pub fn fits(&self, len: usize) -> bool {
        match self.max_transaction_bytes {
            Some(limit) => len <= limit,
            None => true,
        }
    }
}
