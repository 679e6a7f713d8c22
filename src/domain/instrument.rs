// ============================================================================
// Instrument and Exchange Identity
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InstrumentType {
    Equity,
    Future,
    Option,
    Pair,
    Spread,
}

/// A tradable instrument. Books compare instruments by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instrument {
    pub name: String,
    pub instrument_type: InstrumentType,
}

impl Instrument {
    pub fn new(name: impl Into<String>, instrument_type: InstrumentType) -> Self {
        Self {
            name: name.into(),
            instrument_type,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.name, self.instrument_type)
    }
}

/// Venue an order or book belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExchangeId(Arc<str>);

impl ExchangeId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicating instrument store, passed explicitly to whatever constructs
/// instruments (market data ingestion, strategies).
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    instruments: HashMap<(String, InstrumentType), Arc<Instrument>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registered instrument for `(name, type)`, creating it on first use.
    pub fn get_or_register(&mut self, name: &str, instrument_type: InstrumentType) -> Arc<Instrument> {
        Arc::clone(
            self.instruments
                .entry((name.to_string(), instrument_type))
                .or_insert_with(|| Arc::new(Instrument::new(name, instrument_type))),
        )
    }

    pub fn get(&self, name: &str, instrument_type: InstrumentType) -> Option<Arc<Instrument>> {
        self.instruments
            .get(&(name.to_string(), instrument_type))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
