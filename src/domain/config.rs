// ============================================================================
// Order Book Configuration
// ============================================================================

use crate::domain::instrument::{ExchangeId, Instrument};
use crate::error::{BookError, BookResult};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of secondary (stop-triggered) orders one top-level `add`
/// may replay before the cascade is treated as runaway.
pub const DEFAULT_MAX_CASCADE: usize = 1024;

/// Configuration for creating an order book
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookConfig {
    /// The instrument traded on this book
    pub instrument: Arc<Instrument>,

    /// Venue the book mirrors or runs
    pub exchange: ExchangeId,

    /// Maximum number of secondary orders replayed per top-level `add`
    pub max_cascade: usize,

    /// Optional: cap on the depth returned by snapshot queries.
    /// None means unlimited depth
    pub max_depth: Option<usize>,
}

impl OrderBookConfig {
    pub fn new(instrument: Arc<Instrument>, exchange: ExchangeId) -> Self {
        Self {
            instrument,
            exchange,
            max_cascade: DEFAULT_MAX_CASCADE,
            max_depth: None,
        }
    }

    /// Builder method: Set the secondary order cascade cap
    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade;
        self
    }

    /// Builder method: Set maximum snapshot depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> BookResult<()> {
        if self.instrument.name.is_empty() {
            return Err(BookError::InvalidConfig(
                "Instrument cannot be empty".to_string(),
            ));
        }

        if self.max_depth == Some(0) {
            return Err(BookError::InvalidConfig(
                "Max depth must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
